//! Downstream credential acquisition

use crate::cache::{TokenCache, TokenSource};
use crate::engine::MappingContext;
use crate::pipeline::PreRunBehavior;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Property key holding the raw token
pub const AUTH_TOKEN: &str = "auth.token";
/// Property key holding outbound headers as a JSON object
pub const HEADERS: &str = "headers";

/// Acquires a token for the downstream system and exposes it to later
/// behaviors and the dispatcher.
///
/// Tokens come from a shared [`TokenCache`]: the one given to
/// [`with_cache`](Self::with_cache), or else the one registered in the
/// context's services.
pub struct AuthenticationBehavior {
    key: String,
    source: Arc<dyn TokenSource>,
    cache: Option<Arc<TokenCache>>,
    order: i32,
}

impl AuthenticationBehavior {
    pub fn new(key: impl Into<String>, source: Arc<dyn TokenSource>) -> Self {
        Self {
            key: key.into(),
            source,
            cache: None,
            order: 0,
        }
    }

    pub fn with_cache(mut self, cache: Arc<TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl fmt::Debug for AuthenticationBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationBehavior")
            .field("key", &self.key)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PreRunBehavior for AuthenticationBehavior {
    fn name(&self) -> &str {
        "authentication"
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn execute(&self, ctx: &mut MappingContext) -> Result<()> {
        let cache = match (&self.cache, ctx.services.get::<TokenCache>()) {
            (Some(cache), _) => cache.clone(),
            (None, Some(cache)) => cache,
            (None, None) => {
                return Err(Error::configuration(
                    "Authentication requires a token cache, none was configured",
                ))
            }
        };

        let token = cache
            .get(&self.key, self.source.as_ref(), &ctx.cancellation)
            .await
            .map_err(|err| match err {
                Error::Cancelled { .. } => err,
                other => Error::Behavior {
                    behavior: self.name().to_string(),
                    message: format!("Could not acquire a token for '{}'", self.key),
                    source: Some(other.into()),
                },
            })?;

        ctx.properties
            .insert(AUTH_TOKEN.to_string(), Value::String(token.value.clone()));
        let headers = ctx
            .properties
            .entry(HEADERS.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !headers.is_object() {
            *headers = Value::Object(Map::new());
        }
        if let Value::Object(headers) = headers {
            headers.insert("Authorization".to_string(), Value::String(token.authorization()));
        }

        debug!(request_id = %ctx.request_id, key = %self.key, "Authorization attached");
        Ok(())
    }
}
