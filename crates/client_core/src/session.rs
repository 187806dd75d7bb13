use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use shared::protocol::RegisteredUser;
use tracing::{info, warn};

use crate::{
    error::{require_text, ClientError, ClientResult},
    gateway::KanbanApi,
};

pub const TOKEN_STORAGE_KEY: &str = "taskflow_token";

pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let storage = Self::default();
        if let Ok(mut values) = storage.values.lock() {
            values.insert(TOKEN_STORAGE_KEY.to_string(), token.to_string());
        }
        storage
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session storage lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session storage lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session storage lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}

/// JSON object on disk, one entry per key.
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt session file '{}'", self.path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read session file '{}'", self.path.display())),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create session directory '{}'",
                    parent.display()
                )
            })?;
        }
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write session file '{}'", self.path.display()))
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

pub struct SessionStore {
    api: Arc<dyn KanbanApi>,
    storage: Arc<dyn SessionStorage>,
    launch_token: Option<String>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn KanbanApi>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            api,
            storage,
            launch_token: None,
        }
    }

    pub fn with_launch_token(mut self, token: Option<String>) -> Self {
        self.launch_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_STORAGE_KEY) {
            Ok(Some(token)) if !token.is_empty() => return Some(token),
            Ok(_) => {}
            Err(err) => warn!("session: failed to read stored token: {err:#}"),
        }
        self.launch_token.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<String> {
        let response = self.api.login(email, password).await?;
        if response.access_token.is_empty() {
            return Err(ClientError::Auth {
                status: 200,
                message: "login response did not include an access token".into(),
            });
        }
        self.storage
            .set(TOKEN_STORAGE_KEY, &response.access_token)
            .map_err(ClientError::Storage)?;
        info!(email, "session: signed in");
        Ok(response.access_token)
    }

    pub async fn register(&self, email: &str, password: &str) -> ClientResult<RegisteredUser> {
        require_text(email, "email")?;
        require_text(password, "password")?;
        let user = self.api.register(email, password).await?;
        info!(email, user_id = user.id.0, "session: registered");
        Ok(user)
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        self.launch_token = None;
        self.storage
            .remove(TOKEN_STORAGE_KEY)
            .map_err(ClientError::Storage)?;
        info!("session: signed out");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
