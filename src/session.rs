//! Persisted local state: first-run flag, auth token and user record.
//!
//! Stored as a flat JSON object (`hasLaunched`, `token`, `user`) where `user`
//! is itself serialized JSON, so older or foreign records survive untouched.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api::models::{AuthPayload, User, UserType};

const KEY_HAS_LAUNCHED: &str = "hasLaunched";
const KEY_TOKEN: &str = "token";
const KEY_USER: &str = "user";

/// A signed-in user and the bearer token issued for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn user_type(&self) -> UserType {
        self.user.kind()
    }
}

impl From<AuthPayload> for Session {
    fn from(payload: AuthPayload) -> Self {
        Self {
            token: payload.token,
            user: payload.user,
        }
    }
}

/// String key-value file, the desktop stand-in for the device's async storage.
#[derive(Debug, Default)]
struct LocalStore {
    values: BTreeMap<String, String>,
}

impl LocalStore {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let values = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {:?}", path))?;
        Ok(Self { values })
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
        }
        let content =
            serde_json::to_string_pretty(&self.values).context("Failed to serialize state")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {:?}", path))?;

        // 600: holds the bearer token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)
                .with_context(|| format!("Failed to get file metadata: {:?}", path))?
                .permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)
                .with_context(|| format!("Failed to set file permissions: {:?}", path))?;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Owns the persisted session. Every mutation is written through to disk.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    store: LocalStore,
    session: Option<Session>,
}

impl SessionStore {
    pub fn load(path: &Path) -> Result<Self> {
        let store = LocalStore::load(path)?;
        let session = Self::read_session(&store);
        debug!(
            "Loaded local state from {:?} (signed in: {})",
            path,
            session.is_some()
        );
        Ok(Self {
            path: path.to_path_buf(),
            store,
            session,
        })
    }

    /// A token without a readable user record counts as signed out.
    fn read_session(store: &LocalStore) -> Option<Session> {
        let token = store.get(KEY_TOKEN).filter(|t| !t.is_empty())?;
        let raw_user = store.get(KEY_USER)?;
        match serde_json::from_str::<User>(raw_user) {
            Ok(user) => Some(Session {
                token: token.to_string(),
                user,
            }),
            Err(e) => {
                warn!("Ignoring unreadable stored user record: {}", e);
                None
            }
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn has_launched(&self) -> bool {
        matches!(self.store.get(KEY_HAS_LAUNCHED), Some("true"))
    }

    pub fn mark_launched(&mut self) -> Result<()> {
        if self.has_launched() {
            return Ok(());
        }
        self.store.set(KEY_HAS_LAUNCHED, "true".to_string());
        self.store.save(&self.path)
    }

    /// Persist a new session (login, signup, or registration step 1).
    pub fn save(&mut self, session: Session) -> Result<()> {
        let user = serde_json::to_string(&session.user).context("Failed to serialize user")?;
        self.store.set(KEY_TOKEN, session.token.clone());
        self.store.set(KEY_USER, user);
        self.store.save(&self.path)?;
        info!("Signed in as {}", session.user.email);
        self.session = Some(session);
        Ok(())
    }

    /// Drop the session; the first-run flag stays.
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(KEY_TOKEN);
        self.store.remove(KEY_USER);
        self.store.save(&self.path)?;
        self.session = None;
        info!("Signed out");
        Ok(())
    }

    /// The stored user record as raw JSON, for `whoami`.
    pub fn user_json(&self) -> Option<Value> {
        self.store
            .get(KEY_USER)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
