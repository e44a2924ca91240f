//! Common test utilities for E2E tests

use comrade_dm::{config, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Registered test account with its access token
pub struct TestAccount {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig { token_bytes: 32 },
            messaging: config::MessagingConfig {
                default_page_size: 20,
                max_page_size: 40,
                max_message_length: 5000,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = comrade_dm::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register an account through the API and keep its access token
    pub async fn register(&self, username: &str) -> TestAccount {
        let response = self
            .client
            .post(&self.url("/api/v1/accounts"))
            .json(&serde_json::json!({ "username": username }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 201, "registration must succeed");
        let json: Value = response.json().await.unwrap();

        TestAccount {
            id: json["account"]["id"].as_str().unwrap().to_string(),
            username: json["account"]["username"].as_str().unwrap().to_string(),
            token: json["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Make `follower` follow `target` through the API
    pub async fn follow(&self, follower: &TestAccount, target: &TestAccount) {
        let response = self
            .client
            .post(&self.url(&format!("/api/v1/accounts/{}/follow", target.id)))
            .bearer_auth(&follower.token)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "follow must succeed");
    }

    /// Set the messaging policy for an account through the API
    pub async fn set_policy(&self, account: &TestAccount, policy: &str) {
        let response = self
            .client
            .put(&self.url("/api/v1/messaging_settings"))
            .bearer_auth(&account.token)
            .json(&serde_json::json!({ "policy": policy }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "policy update must succeed");
    }

    /// Open a DM from `sender` to `recipient`, returning (status, body)
    pub async fn open_dm(
        &self,
        sender: &TestAccount,
        recipient: &TestAccount,
    ) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .post(&self.url("/api/v1/conversations"))
            .bearer_auth(&sender.token)
            .json(&serde_json::json!({ "recipient_id": recipient.id }))
            .send()
            .await
            .unwrap();

        let status = response.status();
        let json: Value = response.json().await.unwrap();
        (status, json)
    }

    /// Send a message into a conversation, returning (status, body)
    pub async fn send_message(
        &self,
        sender: &TestAccount,
        conversation_id: &str,
        content: &str,
    ) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .post(&self.url(&format!(
                "/api/v1/conversations/{}/messages",
                conversation_id
            )))
            .bearer_auth(&sender.token)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .unwrap();

        let status = response.status();
        let json: Value = response.json().await.unwrap();
        (status, json)
    }
}
