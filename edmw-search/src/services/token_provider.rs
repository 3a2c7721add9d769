//! OAuth bearer token provider
//!
//! All search workers read the current token through `TokenProvider`. The
//! token is held as an `Arc` behind a lock and replaced whole, so a reader
//! sees either the previous token or the new one, never a half-written one.
//! A single mutex serialises refreshes.

use crate::error::TokenError;
use async_trait::async_trait;
use edmw_common::config::PasConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: u64 = 7200;

/// Refresh this long before expiry, capped at half the token's lifetime
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Shortest pause between background refreshes
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Retry delay for the background task after a failed refresh
const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Bearer token with its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
    refresh_at: Instant,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        let now = Instant::now();
        let margin = REFRESH_MARGIN.min(lifetime / 2);
        Self {
            value: value.into(),
            expires_at: now + lifetime,
            refresh_at: now + (lifetime - margin),
        }
    }

    /// Past the refresh point (expired, or within the margin of expiring)
    pub fn needs_refresh(&self) -> bool {
        Instant::now() >= self.refresh_at
    }

    /// Time until the token should be refreshed
    pub fn refresh_in(&self) -> Duration {
        self.refresh_at.saturating_duration_since(Instant::now())
    }
}

/// Source of the current bearer token
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current valid token, obtaining a new one if none is held or it is
    /// about to expire
    async fn current_token(&self) -> Result<Arc<AccessToken>, TokenError>;

    /// Drop the held token (e.g. after a 401) so the next read refreshes
    async fn invalidate(&self);
}

/// One token exchange with the authorization server
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn fetch(&self) -> Result<AccessToken, TokenError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// OAuth2 client-credentials exchange
pub struct OAuthTokenSource {
    http_client: reqwest::Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl OAuthTokenSource {
    pub fn new(config: &PasConfig) -> Result<Self, TokenError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TokenError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone().unwrap_or_default(),
            client_secret: config.client_secret.clone().unwrap_or_default(),
            scope: config.scope.clone(),
        })
    }
}

#[async_trait]
impl TokenExchange for OAuthTokenSource {
    async fn fetch(&self) -> Result<AccessToken, TokenError> {
        tracing::debug!(auth_url = %self.auth_url, "Requesting access token");

        let response = self
            .http_client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Rejected(status.as_u16(), body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Parse(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(TokenError::Parse("empty access_token".to_string()));
        }

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));
        tracing::info!(expires_in_secs = lifetime.as_secs(), "Access token obtained");
        Ok(AccessToken::new(token.access_token, lifetime))
    }
}

/// Cached token shared by every worker
pub struct SharedToken {
    exchange: Arc<dyn TokenExchange>,
    current: RwLock<Option<Arc<AccessToken>>>,
    refresh_lock: Mutex<()>,
}

impl SharedToken {
    pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            exchange,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Exchange for a new token and swap it in
    pub async fn refresh(&self) -> Result<Arc<AccessToken>, TokenError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Arc<AccessToken>, TokenError> {
        let token = Arc::new(self.exchange.fetch().await?);
        *self.current.write().await = Some(Arc::clone(&token));
        Ok(token)
    }

    async fn valid_cached(&self) -> Option<Arc<AccessToken>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|t| !t.needs_refresh())
            .cloned()
    }

    /// Keep the token fresh in the background until `cancel` fires
    pub fn spawn_refresh_task(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let wait = match self.current_token().await {
                    Ok(token) => token.refresh_in().max(MIN_REFRESH_INTERVAL),
                    Err(e) => {
                        tracing::warn!(error = %e, "Background token refresh failed");
                        REFRESH_RETRY_DELAY
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Token refresh task stopped");
                        return;
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        })
    }
}

#[async_trait]
impl TokenProvider for SharedToken {
    async fn current_token(&self) -> Result<Arc<AccessToken>, TokenError> {
        if let Some(token) = self.valid_cached().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        if let Some(token) = self.valid_cached().await {
            return Ok(token);
        }
        self.refresh_locked().await
    }

    async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}

/// Fixed, pre-issued token
pub struct StaticToken {
    token: Arc<AccessToken>,
}

impl StaticToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            token: Arc::new(AccessToken::new(value, Duration::from_secs(DEFAULT_EXPIRES_IN_SECS))),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn current_token(&self) -> Result<Arc<AccessToken>, TokenError> {
        Ok(Arc::clone(&self.token))
    }

    async fn invalidate(&self) {}
}
