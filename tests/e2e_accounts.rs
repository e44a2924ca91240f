//! E2E tests for account registration and the follow graph

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_register_account_returns_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(&server.url("/api/v1/accounts"))
        .json(&serde_json::json!({
            "username": "alyosha",
            "display_name": "Alyosha K."
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["account"]["username"], "alyosha");
    assert_eq!(json["account"]["display_name"], "Alyosha K.");
    assert!(!json["access_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let server = TestServer::new().await;
    server.register("grusha").await;

    let response = server
        .client
        .post(&server.url("/api/v1/accounts"))
        .json(&serde_json::json!({ "username": "grusha" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_register_rejects_invalid_username() {
    let server = TestServer::new().await;

    for bad in ["", "   ", "has spaces", "emoji🎈"] {
        let response = server
            .client
            .post(&server.url("/api/v1/accounts"))
            .json(&serde_json::json!({ "username": bad }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400, "username {:?} must be rejected", bad);
    }
}

#[tokio::test]
async fn test_verify_credentials_requires_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/api/v1/accounts/verify_credentials"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_verify_credentials_with_token() {
    let server = TestServer::new().await;
    let account = server.register("mitya").await;

    let response = server
        .client
        .get(&server.url("/api/v1/accounts/verify_credentials"))
        .bearer_auth(&account.token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["id"], account.id.as_str());
    assert_eq!(json["username"], "mitya");
}

#[tokio::test]
async fn test_get_nonexistent_account() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/api/v1/accounts/nonexistent"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_follow_builds_relationship() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;

    // No edges yet
    let response = server
        .client
        .get(&server.url(&format!("/api/v1/accounts/{}/relationship", bob.id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["relationship"], "none");

    // alice -> bob
    server.follow(&alice, &bob).await;
    let response = server
        .client
        .get(&server.url(&format!("/api/v1/accounts/{}/relationship", bob.id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["relationship"], "following");

    // Seen from bob's side the same edge reads as follower
    let response = server
        .client
        .get(&server.url(&format!("/api/v1/accounts/{}/relationship", alice.id)))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["relationship"], "follower");

    // bob -> alice completes the mutual
    server.follow(&bob, &alice).await;
    let response = server
        .client
        .get(&server.url(&format!("/api/v1/accounts/{}/relationship", bob.id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["relationship"], "mutual");
}

#[tokio::test]
async fn test_follow_is_idempotent() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;

    server.follow(&alice, &bob).await;
    server.follow(&alice, &bob).await;

    let response = server
        .client
        .get(&server.url(&format!("/api/v1/accounts/{}/relationship", bob.id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["relationship"], "following");
}

#[tokio::test]
async fn test_unfollow_clears_edge() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    server.follow(&alice, &bob).await;

    let response = server
        .client
        .post(&server.url(&format!("/api/v1/accounts/{}/unfollow", bob.id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["relationship"], "none");
}

#[tokio::test]
async fn test_cannot_follow_self() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;

    let response = server
        .client
        .post(&server.url(&format!("/api/v1/accounts/{}/follow", alice.id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_messaging_settings_default_and_update() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;

    let response = server
        .client
        .get(&server.url("/api/v1/messaging_settings"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["policy"], "everyone");

    server.set_policy(&alice, "mutual").await;

    let response = server
        .client
        .get(&server.url("/api/v1/messaging_settings"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["policy"], "mutual");
}

#[tokio::test]
async fn test_messaging_settings_reject_unknown_policy() {
    let server = TestServer::new().await;
    let alice = server.register("alice").await;

    let response = server
        .client
        .put(&server.url("/api/v1/messaging_settings"))
        .bearer_auth(&alice.token)
        .json(&serde_json::json!({ "policy": "friends-only" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}
