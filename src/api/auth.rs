use anyhow::Result;
use reqwest::Client;
use serde::Serialize;

use super::model::User;
use super::{ApiError, USERS_API, build_client, error_from_response};
use crate::session::SessionRepository;
use crate::session::token::decode_claims;

/// Response header carrying the bearer token on a successful login
pub const TOKEN_HEADER: &str = "Jwt-Token";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Thin wrapper around the authentication endpoints. Failures are not
/// retried; network and application errors surface identically.
pub struct AuthGateway {
    client: Client,
    host: String,
}

impl AuthGateway {
    pub fn new(host: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client()?,
            host: host.into(),
        })
    }

    /// Submit credentials. The token arrives out-of-band in the
    /// `Jwt-Token` response header; the body carries the user record.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, ApiError> {
        let url = format!("{}{}/login", self.host, USERS_API);

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let status = response.status().as_u16();
        let token = response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(ApiError::Http {
                status,
                body: "login response carried no token header".to_string(),
            })?;

        let user = response
            .json::<User>()
            .await
            .map_err(|e| ApiError::Json(e.to_string()))?;

        Ok(LoginOutcome { token, user })
    }

    pub async fn register(&self, new_user: &User) -> Result<User, ApiError> {
        let url = format!("{}{}/register", self.host, USERS_API);

        let response = self
            .client
            .post(&url)
            .json(new_user)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<User>()
            .await
            .map_err(|e| ApiError::Json(e.to_string()))
    }
}

/// Derive login state from the persisted token. A token that is absent,
/// empty, subject-less or expired counts as logged out, and checking it
/// clears the repository so stale sessions are purged automatically.
/// Callers depend on that side effect.
pub fn is_logged_in(store: &mut dyn SessionRepository) -> Result<bool> {
    let Some(token) = store.token()? else {
        store.clear()?;
        return Ok(false);
    };

    if token.is_empty() {
        store.clear()?;
        return Ok(false);
    }

    match decode_claims(&token) {
        Ok(claims) if claims.subject().is_some() && !claims.is_expired() => Ok(true),
        _ => {
            store.clear()?;
            Ok(false)
        }
    }
}

pub fn log_out(store: &mut dyn SessionRepository) -> Result<()> {
    store.clear()
}
