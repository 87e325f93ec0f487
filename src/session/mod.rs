pub mod token;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::api::model::User;
use crate::common::paths;

/// Persisted session state: the bearer token plus the last-known user and
/// directory listing. Injected into everything that needs it instead of
/// being read from ambient global storage.
pub trait SessionRepository {
    fn save_token(&mut self, token: &str) -> Result<()>;
    fn token(&self) -> Result<Option<String>>;

    fn cache_user(&mut self, user: &User) -> Result<()>;
    fn cached_user(&self) -> Result<Option<User>>;

    fn cache_user_list(&mut self, users: &[User]) -> Result<()>;
    fn cached_user_list(&self) -> Result<Option<Vec<User>>>;

    /// Remove token, user and list entries. Safe to call when nothing is
    /// stored.
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    users: Option<Vec<User>>,
}

/// Session repository backed by a single JSON file, surviving across
/// process runs the way browser localStorage survives reloads.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn open_default() -> Result<Self> {
        Ok(Self {
            path: paths::session_file()?,
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<SessionSnapshot> {
        if !self.path.exists() {
            return Ok(SessionSnapshot::default());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading session file {}", self.path.display()))?;
        serde_json::from_str(&contents).context("parsing session file")
    }

    fn write(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating session directory {}", parent.display()))?;
        }
        let contents = serde_json::to_string(snapshot).context("serializing session")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("writing session file {}", self.path.display()))?;
        Ok(())
    }
}

impl SessionRepository for FileSessionStore {
    fn save_token(&mut self, token: &str) -> Result<()> {
        let mut snapshot = self.read()?;
        snapshot.token = Some(token.to_string());
        self.write(&snapshot)
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(self.read()?.token)
    }

    fn cache_user(&mut self, user: &User) -> Result<()> {
        let mut snapshot = self.read()?;
        snapshot.user = Some(user.clone());
        self.write(&snapshot)
    }

    fn cached_user(&self) -> Result<Option<User>> {
        Ok(self.read()?.user)
    }

    fn cache_user_list(&mut self, users: &[User]) -> Result<()> {
        let mut snapshot = self.read()?;
        snapshot.users = Some(users.to_vec());
        self.write(&snapshot)
    }

    fn cached_user_list(&self) -> Result<Option<Vec<User>>> {
        Ok(self.read()?.users)
    }

    fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("removing session file {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// In-memory session repository for tests and one-shot invocations
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    snapshot: SessionSnapshot,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemorySessionStore {
    fn save_token(&mut self, token: &str) -> Result<()> {
        self.snapshot.token = Some(token.to_string());
        Ok(())
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(self.snapshot.token.clone())
    }

    fn cache_user(&mut self, user: &User) -> Result<()> {
        self.snapshot.user = Some(user.clone());
        Ok(())
    }

    fn cached_user(&self) -> Result<Option<User>> {
        Ok(self.snapshot.user.clone())
    }

    fn cache_user_list(&mut self, users: &[User]) -> Result<()> {
        self.snapshot.users = Some(users.to_vec());
        Ok(())
    }

    fn cached_user_list(&self) -> Result<Option<Vec<User>>> {
        Ok(self.snapshot.users.clone())
    }

    fn clear(&mut self) -> Result<()> {
        self.snapshot = SessionSnapshot::default();
        Ok(())
    }
}
