// tests/integration/chat_test.rs

//! End-to-end relay of chat lines between real TCP clients.

use super::test_helpers::{LineClient, start_server, test_config};
use std::time::Duration;

#[tokio::test]
async fn test_join_is_announced_to_everyone() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let bob = LineClient::connect(server.local_addr()).await;

    alice
        .expect_line(&format!("[official notify] {} joined", bob.identity))
        .await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_chat_is_relayed_to_all_sessions() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    alice.skip_until(&format!("[official notify] {} joined", bob.identity)).await;

    alice.send_line("hello").await;

    let expected = format!("{}> hello", alice.identity);
    bob.expect_line(&expected).await;
    alice.expect_line(&expected).await;
    bob.expect_silence(Duration::from_millis(200)).await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_messages_arrive_in_order() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;

    for i in 0..20 {
        alice.send_line(&format!("message {i}")).await;
    }
    for i in 0..20 {
        bob.expect_line(&format!("{}> message {i}", alice.identity)).await;
    }
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_crlf_and_empty_lines() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;

    alice.send_raw(b"\n\r\n\nfirst\r\n").await;
    bob.expect_line(&format!("{}> first", alice.identity)).await;
    bob.expect_silence(Duration::from_millis(200)).await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_line_split_across_writes() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;

    alice.send_raw(b"hel").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    alice.send_raw(b"lo there\n").await;

    bob.expect_line(&format!("{}> hello there", alice.identity)).await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_oversized_line_is_discarded_with_reply() {
    let mut config = test_config();
    config.max_line_length = 16;
    let server = start_server(config).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    alice.skip_until(&format!("[official notify] {} joined", bob.identity)).await;

    alice.send_line(&"x".repeat(64)).await;
    alice
        .expect_line("[!] line too long (max 16 bytes), discarded")
        .await;

    alice.send_line("short").await;
    bob.expect_line(&format!("{}> short", alice.identity)).await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_is_announced() {
    let server = start_server(test_config()).await;
    let alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    let alice_identity = alice.identity.clone();

    drop(alice);

    bob.expect_line(&format!("[official notify] {alice_identity} went offline"))
        .await;
    assert!(server.state().registry.lookup(&alice_identity).is_none());
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unterminated_fragment_at_close_is_not_relayed() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    let alice_identity = alice.identity.clone();

    alice.send_raw(b"no terminator").await;
    drop(alice);

    bob.expect_line(&format!("[official notify] {alice_identity} went offline"))
        .await;
    server.shutdown().await.unwrap();
}
