//! Shared test utilities for workflow integration tests.
//!
//! Provides `TestEnv` - an isolated client environment backed by a mockito
//! server standing in for the Servio backend, with a throwaway state file
//! cleaned up via `TempDir`.

use anyhow::Result;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use servio::api::ApiClient;
use servio::config::{Config, ReferralConfig};
use servio::session::SessionStore;
use servio::utils::ExternalBrowser;

/// A complete isolated client environment.
#[allow(dead_code)]
pub struct TestEnv {
    temp_dir: TempDir,
    pub server: ServerGuard,
    pub state_path: PathBuf,
}

#[allow(dead_code)]
impl TestEnv {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let state_path = temp_dir.path().join("state.json");
        let server = Server::new_async().await;
        Ok(Self {
            temp_dir,
            server,
            state_path,
        })
    }

    /// Config pointing at the mock server.
    pub fn config(&self) -> Config {
        Config {
            api_base_url: self.server.url(),
            ..Config::default()
        }
    }

    /// A fresh client against the mock server, with no token set.
    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.server.url(), None).expect("client builds")
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::load(&self.state_path).expect("state file loads")
    }

    /// Write a file under the temp dir and return its path.
    pub fn write_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, bytes).expect("write test file");
        path
    }

    // ==================== Mock Helpers ====================

    /// Mock an endpoint answering with a success envelope around `data`.
    pub async fn ok(&mut self, method: &str, path: impl Into<Matcher>, data: Value) -> Mock {
        self.server
            .mock(method, path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope(data).to_string())
            .create_async()
            .await
    }

    /// Mock an endpoint answering with an HTTP error and an envelope message.
    pub async fn fail(
        &mut self,
        method: &str,
        path: impl Into<Matcher>,
        status: usize,
        message: &str,
    ) -> Mock {
        self.server
            .mock(method, path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "success": false, "message": message }).to_string())
            .create_async()
            .await
    }
}

/// Success envelope as the backend sends it.
pub fn envelope(data: Value) -> Value {
    json!({ "success": true, "data": data, "message": "OK" })
}

/// Auth payload for `email` with the given role.
pub fn auth_payload(token: &str, email: &str, role: &str) -> Value {
    json!({
        "token": token,
        "user": {
            "_id": "u-1",
            "email": email,
            "fullName": "Ada Obi",
            "role": role,
        }
    })
}

/// Lookups run without waiting in tests.
pub fn referral_config() -> ReferralConfig {
    ReferralConfig {
        min_length: 4,
        debounce_ms: 0,
    }
}

/// Browser that records the URLs it was asked to open.
#[derive(Default, Clone)]
pub struct RecordingBrowser {
    pub opened: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingBrowser {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("lock").clone()
    }
}

impl ExternalBrowser for RecordingBrowser {
    fn open(&self, url: &str) -> Result<()> {
        self.opened.lock().expect("lock").push(url.to_string());
        Ok(())
    }
}
