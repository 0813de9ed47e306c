// tests/integration/commands_test.rs

//! The inline commands, driven over real TCP connections.

use super::test_helpers::{LineClient, start_server, test_config};
use std::time::Duration;

const USAGE: [&str; 3] = [
    "[!] invalid command, usage:",
    "- shell online",
    "- shell rename <name>",
];

#[tokio::test]
async fn test_online_lists_everyone() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let bob = LineClient::connect(server.local_addr()).await;
    alice.skip_until(&format!("[official notify] {} joined", bob.identity)).await;

    alice.send_line("shell online").await;

    let mut names = vec![alice.identity.clone(), bob.identity.clone()];
    names.sort();
    alice.expect_line("[official notify] online users (2):").await;
    for name in names {
        alice.expect_line(&format!("- {name}")).await;
    }
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_online_reply_is_not_broadcast() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    alice.skip_until(&format!("[official notify] {} joined", bob.identity)).await;

    alice.send_line("shell online").await;
    alice.expect_line("[official notify] online users (2):").await;
    bob.expect_silence(Duration::from_millis(200)).await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rename_to_free_name() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    alice.skip_until(&format!("[official notify] {} joined", bob.identity)).await;

    alice.send_line("shell rename alice").await;

    let notice = format!("[official notify] {} renamed to alice", alice.identity);
    alice.expect_line(&notice).await;
    bob.expect_line(&notice).await;

    bob.send_line("shell online").await;
    bob.expect_line("[official notify] online users (2):").await;
    let listed = [bob.read_line().await.unwrap(), bob.read_line().await.unwrap()];
    assert!(listed.contains(&"- alice".to_string()));
    assert!(!listed.contains(&format!("- {}", alice.identity)));

    alice.send_line("hi").await;
    bob.expect_line("alice> hi").await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rename_to_taken_name() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    alice.skip_until(&format!("[official notify] {} joined", bob.identity)).await;

    alice.send_line("shell rename alice").await;
    alice.skip_until(&format!("[official notify] {} renamed to alice", alice.identity)).await;
    bob.skip_until(&format!("[official notify] {} renamed to alice", alice.identity)).await;

    bob.send_line("shell rename alice").await;
    bob.expect_line("[!] name already taken: alice").await;
    alice.expect_silence(Duration::from_millis(200)).await;

    let registry = &server.state().registry;
    assert!(registry.lookup(&bob.identity).is_some());
    assert_eq!(registry.len(), 2);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rename_without_argument_replies_usage() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;

    alice.send_line("shell rename").await;
    for line in USAGE {
        alice.expect_line(line).await;
    }
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_command_replies_usage_without_broadcast() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;
    let mut bob = LineClient::connect(server.local_addr()).await;
    alice.skip_until(&format!("[official notify] {} joined", bob.identity)).await;

    alice.send_line("shell foo").await;
    for line in USAGE {
        alice.expect_line(line).await;
    }
    bob.expect_silence(Duration::from_millis(200)).await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_custom_prefix() {
    let mut config = test_config();
    config.command_prefix = "/cmd".to_string();
    let server = start_server(config).await;
    let mut alice = LineClient::connect(server.local_addr()).await;

    alice.send_line("/cmd online").await;
    alice.expect_line("[official notify] online users (1):").await;
    alice.expect_line(&format!("- {}", alice.identity)).await;

    alice.send_line("shell online").await;
    alice
        .expect_line(&format!("{}> shell online", alice.identity))
        .await;
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_prefix_must_be_a_whole_token() {
    let server = start_server(test_config()).await;
    let mut alice = LineClient::connect(server.local_addr()).await;

    alice.send_line("shellfish online").await;
    alice
        .expect_line(&format!("{}> shellfish online", alice.identity))
        .await;
    server.shutdown().await.unwrap();
}
