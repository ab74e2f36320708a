use std::path::{Path, PathBuf};
use std::sync::Arc;

use orgpulse::server::{AppState, create_router};
use orgpulse::store::{SqliteStore, Store};
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Questions written to `questions_standard.json` in every test server.
pub const STANDARD_QUESTIONS: &str = r#"{"questions": [{"id": 1, "text": "How well do you know the codebase?"}]}"#;

pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");

        let question_sets_dir = temp_dir.path().join("question_sets");
        std::fs::create_dir_all(&question_sets_dir).expect("create question set dir");
        std::fs::write(
            question_sets_dir.join("questions_standard.json"),
            STANDARD_QUESTIONS,
        )
        .expect("write question set");

        let store = SqliteStore::new(temp_dir.path().join("orgpulse.db")).expect("open store");
        store.initialize().expect("initialize store");

        let state = Arc::new(AppState::new(Arc::new(store), question_sets_dir));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let base_url = format!("http://127.0.0.1:{}", port);
        let client = reqwest::Client::new();
        Self::wait_for_ready(&client, &base_url).await;

        Self {
            temp_dir,
            base_url,
            client,
            handle,
        }
    }

    async fn wait_for_ready(client: &reqwest::Client, base_url: &str) {
        for _ in 0..50 {
            if client
                .get(format!("{}/health", base_url))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready");
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    #[allow(dead_code)]
    pub fn question_sets_dir(&self) -> PathBuf {
        self.temp_dir.path().join("question_sets")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Sends a request and returns the status with the parsed body (`Null` when empty).
    pub async fn send(&self, request: reqwest::RequestBuilder) -> (u16, Value) {
        let resp = request.send().await.expect("send request");
        let status = resp.status().as_u16();
        let text = resp.text().await.expect("read body");
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).expect("parse json body")
        };
        (status, body)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        self.send(self.client.get(self.url(path))).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(self.client.post(self.url(path)).json(&body)).await
    }

    #[allow(dead_code)]
    pub async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(self.client.put(self.url(path)).json(&body)).await
    }

    #[allow(dead_code)]
    pub async fn patch(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(self.client.patch(self.url(path)).json(&body)).await
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        self.send(self.client.delete(self.url(path))).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
