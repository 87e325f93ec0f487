use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tempfile::TempDir;

use uadm::api::model::{Role, User};
use uadm::session::FileSessionStore;

pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    /// Session store isolated inside the test's temp directory
    pub fn session_store(&self) -> FileSessionStore {
        FileSessionStore::at(self.temp_dir.path().join("session.json"))
    }
}

/// Unsigned bearer token with the given subject and expiry, shaped the way
/// the backend issues them
pub fn bearer_token(sub: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{sub}","exp":{exp}}}"#).as_bytes());
    format!("{header}.{payload}.sig")
}

/// Expiry far enough out that tests never race it
pub const FAR_FUTURE: i64 = 4_102_444_800; // 2100-01-01

pub fn directory_user(first: &str, last: &str, username: &str, role: Role) -> User {
    User {
        first_name: first.to_string(),
        last_name: last.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        enabled: true,
        not_locked: true,
        role,
        ..Default::default()
    }
}
