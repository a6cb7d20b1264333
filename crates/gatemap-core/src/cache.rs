//! Shared credential cache with single-flight refresh
//!
//! Each cache key owns a slot guarded by an async mutex. The caller that
//! finds a slot empty or expired performs the refresh while holding the lock;
//! every concurrent caller for the same key waits on that lock and then reads
//! the freshly stored token, so one expiry causes exactly one refresh.
//! A failed refresh is shared the same way: callers that queued behind it
//! receive its error instead of calling the token endpoint again. Callers
//! that arrive after the failure try again.
//!
//! Waiting and refreshing both race the caller's cancellation signal. A
//! cancelled refresh is dropped before anything is written to the slot.

use crate::cancel::CancellationSignal;
use crate::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Refresh this long before the advertised expiry by default
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// A credential handed out by a [`TokenSource`]
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub token_type: String,
    /// `None` means the token never expires
    pub expires_in: Option<Duration>,
}

impl AccessToken {
    pub fn bearer(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            token_type: "Bearer".to_string(),
            expires_in: None,
        }
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// Value for an `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Something that can mint a fresh token for a cache key
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<AccessToken>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: AccessToken,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn new(token: AccessToken) -> Self {
        let expires_at = token.expires_in.map(|ttl| Instant::now() + ttl);
        Self { token, expires_at }
    }

    fn is_fresh(&self, skew: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + skew < expires_at,
            None => true,
        }
    }
}

/// Outcome of the most recent failed refresh of a slot
#[derive(Debug, Clone)]
struct RefreshFailure {
    /// Value of the slot's completion counter when the refresh failed
    attempt: u64,
    message: String,
    status_code: Option<u16>,
    http: bool,
}

impl RefreshFailure {
    fn new(attempt: u64, error: &Error) -> Self {
        let (status_code, http) = match error {
            Error::Http { status_code, .. } => (*status_code, true),
            _ => (None, false),
        };
        Self {
            attempt,
            message: error.to_string(),
            status_code,
            http,
        }
    }

    fn to_error(&self, key: &str) -> Error {
        let message = format!("token refresh for '{}' failed: {}", key, self.message);
        if self.http {
            Error::Http {
                message,
                status_code: self.status_code,
                source: None,
            }
        } else {
            Error::behavior("token refresh", message)
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    cached: Option<CachedToken>,
    failure: Option<RefreshFailure>,
}

#[derive(Debug, Default)]
struct SlotEntry {
    state: Mutex<SlotState>,
    /// Finished refresh attempts, successful or not
    completed: AtomicU64,
}

type Slot = Arc<SlotEntry>;

/// Process-wide token cache shared by every request
pub struct TokenCache {
    slots: Mutex<HashMap<String, Slot>>,
    skew: Duration,
    refreshes: AtomicU64,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            skew: DEFAULT_EXPIRY_SKEW,
            refreshes: AtomicU64::new(0),
        }
    }

    /// Refresh tokens this long before they expire
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Return the cached token for `key`, refreshing it through `source` when
    /// missing or about to expire
    pub async fn get(
        &self,
        key: &str,
        source: &dyn TokenSource,
        cancellation: &CancellationSignal,
    ) -> Result<AccessToken> {
        cancellation.check("token refresh")?;
        let slot = self.slot(key).await;
        let seen = slot.completed.load(Ordering::SeqCst);

        let acquire = async {
            let mut state = slot.state.lock().await;
            if let Some(cached) = state.cached.as_ref().filter(|cached| cached.is_fresh(self.skew)) {
                debug!(key, "Token cache hit");
                return Ok(cached.token.clone());
            }
            if let Some(failure) = state.failure.as_ref().filter(|failure| failure.attempt > seen) {
                debug!(key, "Reusing the refresh failure this caller waited on");
                return Err(failure.to_error(key));
            }

            debug!(key, "Refreshing token");
            let fetched = source.fetch(key).await;
            let attempt = slot.completed.fetch_add(1, Ordering::SeqCst) + 1;
            match fetched {
                Ok(token) => {
                    let count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(key, refreshes = count, expires_in = ?token.expires_in, "Token refreshed");
                    state.cached = Some(CachedToken::new(token.clone()));
                    state.failure = None;
                    Ok(token)
                }
                Err(error) => {
                    warn!(key, error = %error, "Token refresh failed");
                    state.failure = Some(RefreshFailure::new(attempt, &error));
                    Err(error)
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(Error::cancelled("token refresh")),
            result = acquire => result,
        }
    }

    /// Forget the token for `key` so the next caller refreshes
    pub async fn invalidate(&self, key: &str) {
        let slot = self.slots.lock().await.get(key).cloned();
        if let Some(slot) = slot {
            slot.state.lock().await.cached = None;
        }
    }

    /// Total number of successful refreshes
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    async fn slot(&self, key: &str) -> Slot {
        self.slots
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("skew", &self.skew)
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

/// Expand `${ENV:NAME}` references from the process environment
pub fn expand_env_vars(value: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"\$\{ENV:([^}]+)\}").expect("Valid regex pattern"));

    let mut expanded = value.to_string();
    for captures in pattern.captures_iter(value) {
        let name = &captures[1];
        let resolved = std::env::var(name).map_err(|_| {
            Error::configuration(format!("Environment variable {} not found", name))
        })?;
        expanded = expanded.replace(&captures[0], &resolved);
    }
    Ok(expanded)
}

/// OAuth2 client-credentials grant against a token endpoint
#[derive(Clone)]
pub struct HttpTokenSource {
    client: reqwest::Client,
    token_url: url::Url,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl HttpTokenSource {
    /// Credentials may use `${ENV:NAME}` references
    pub fn new(token_url: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        let token_url = url::Url::parse(token_url).map_err(|e| Error::Configuration {
            message: format!("Invalid token URL '{}'", token_url),
            source: Some(e.into()),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            token_url,
            client_id: expand_env_vars(client_id)?,
            client_secret: expand_env_vars(client_secret)?,
            scope: None,
        })
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl fmt::Debug for HttpTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTokenSource")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch(&self, _key: &str) -> Result<AccessToken> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http {
                message: format!("Token request to {} failed", self.token_url),
                status_code: e.status().map(|s| s.as_u16()),
                source: Some(e.into()),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                message: format!("Token endpoint returned {}", status),
                status_code: Some(status.as_u16()),
                source: None,
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| Error::Http {
            message: "Token endpoint returned an unreadable body".to_string(),
            status_code: Some(status.as_u16()),
            source: Some(e.into()),
        })?;

        Ok(AccessToken {
            value: body.access_token,
            token_type: body.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: body.expires_in.map(Duration::from_secs),
        })
    }
}
