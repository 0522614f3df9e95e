//! Chat-user to game-identity resolution.
//!
//! Backed by a whitelister service: log in once with configured
//! credentials, reuse the session token as a cookie on lookups. Retry
//! and backoff are the collaborator's concern; this client only signals
//! distinct failure modes.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{ChatUserId, PlayerId};

/// Errors from identity resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The service rejected our credentials or session token.
    #[error("whitelister rejected the configured credentials")]
    AuthFailed,

    /// The user exists but has no linked game identity.
    #[error("chat user {0} has no linked game identity")]
    NotLinked(ChatUserId),

    /// Network failure, bad status, or unparseable response.
    #[error("whitelister unavailable: {0}")]
    Unavailable(String),
}

/// Maps a chat-platform user to an in-game identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, user: &ChatUserId) -> Result<PlayerId, ResolveError>;
}

/// Whitelister connection settings.
#[derive(Debug, Clone)]
pub struct WhitelisterConfig {
    pub base_url: Url,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

/// Session-token client against the whitelister API.
pub struct WhitelisterClient {
    client: Client,
    config: WhitelisterConfig,
    token: Mutex<Option<String>>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: String,
    #[serde(rename = "userDt")]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    token: String,
}

#[derive(Debug, Deserialize)]
struct PlayerLookupResponse {
    steamid64: Option<String>,
}

impl WhitelisterClient {
    pub fn new(config: WhitelisterConfig) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ResolveError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| ResolveError::Unavailable(format!("bad endpoint {}: {}", path, e)))
    }

    /// Authenticate and cache the session token.
    pub async fn login(&self) -> Result<(), ResolveError> {
        let url = self.endpoint("api/login")?;
        debug!("Signing in to whitelister at {}", url);

        let response = self
            .client
            .post(url)
            .json(&LoginRequest {
                username: &self.config.username,
                password: &self.config.password,
            })
            .send()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ResolveError::Unavailable(format!(
                "login returned {}",
                response.status()
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;

        if body.status != "login_ok" {
            warn!("Whitelister login rejected: {}", body.status);
            return Err(ResolveError::AuthFailed);
        }

        let token = body.user.ok_or(ResolveError::AuthFailed)?.token;
        *self.token.lock().expect("token lock poisoned") = Some(token);
        info!("Signed in to whitelister");
        Ok(())
    }

    /// Cached token, logging in first if the session was never opened.
    async fn session_token(&self) -> Result<String, ResolveError> {
        let cached = self.token.lock().expect("token lock poisoned").clone();
        if let Some(token) = cached {
            return Ok(token);
        }
        self.login().await?;
        self.token
            .lock()
            .expect("token lock poisoned")
            .clone()
            .ok_or(ResolveError::AuthFailed)
    }
}

#[async_trait]
impl IdentityResolver for WhitelisterClient {
    async fn resolve(&self, user: &ChatUserId) -> Result<PlayerId, ResolveError> {
        let token = self.session_token().await?;
        let url = self.endpoint(&format!(
            "api/players/read/from/discordUserId/{}",
            user.as_str()
        ))?;

        debug!("Looking up game identity for chat user {}", user);

        let response = self
            .client
            .get(url)
            .header("Cookie", format!("stok={}", token))
            .send()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            // Stale session; the caller decides whether to re-login.
            return Err(ResolveError::AuthFailed);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotLinked(user.clone()));
        }
        if !status.is_success() {
            return Err(ResolveError::Unavailable(format!(
                "lookup returned {}",
                status
            )));
        }

        let body: PlayerLookupResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;

        let raw = body
            .steamid64
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ResolveError::NotLinked(user.clone()))?;

        PlayerId::parse(&raw)
            .map_err(|e| ResolveError::Unavailable(format!("bad id from whitelister: {}", e)))
    }
}
