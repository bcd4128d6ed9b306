//! Refresh-once-and-retry around authenticated calls.
//!
//! Google reports an expired access token with a 401 whose body looks like
//! `{"error":{"errors":[{"reason":"authError","message":"Invalid Credentials"}]}}`.
//! [`TokenRefresher::call`] recognizes that body, swaps in a fresh access
//! token and repeats the call once. The retry is never repeated, so a
//! misbehaving token endpoint cannot cause a loop.

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credential::CredentialStore;
use crate::error::ApiResult;
use crate::http::{BoxFuture, RawResponse};

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid Credentials";
const AUTH_ERROR_REASON: &str = "authError";

/// Exchanges a refresh token for a new access token.
pub trait AccessTokenRefresher: Send + Sync {
    fn refresh_access_token<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ApiResult<String>>;
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    message: Option<String>,
    reason: Option<String>,
}

/// Returns true if `body` is Google's "invalid credentials" error.
///
/// Looks at `error.errors[0]` only. Anything that does not parse, or lacks
/// that path, counts as not expired.
pub fn is_access_token_expired(body: &str) -> bool {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return false;
    };
    envelope.error.errors.first().is_some_and(|item| {
        item.message.as_deref() == Some(INVALID_CREDENTIALS_MESSAGE)
            || item.reason.as_deref() == Some(AUTH_ERROR_REASON)
    })
}

/// Wraps remote calls with a single refresh-and-retry on expired tokens.
///
/// Refreshes are single-flight: concurrent calls that all see the same
/// expired token share one trip to the token endpoint.
#[derive(Clone)]
pub struct TokenRefresher {
    credentials: CredentialStore,
    refresher: Arc<dyn AccessTokenRefresher>,
    refresh_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl TokenRefresher {
    pub fn new(credentials: CredentialStore, refresher: Arc<dyn AccessTokenRefresher>) -> Self {
        Self {
            credentials,
            refresher,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Runs `attempt` with the current access token, refreshing and retrying
    /// once if the token turned out to be expired.
    ///
    /// The retry only happens when all of these hold: `force_access_token`
    /// is set, the first response is not a success, its body is the
    /// invalid-credentials error, and a refresh token is held. It also needs
    /// the refresh to produce a non-empty token different from the one just
    /// used. In every other case the first response is returned unchanged.
    ///
    /// Transport errors from `attempt` are returned as they are.
    pub async fn call<F, Fut>(&self, force_access_token: bool, mut attempt: F) -> ApiResult<RawResponse>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ApiResult<RawResponse>>,
    {
        let used_token = self.credentials.access_token();
        let result = attempt(used_token.clone()).await?;

        if !force_access_token
            || result.is_success()
            || !is_access_token_expired(&result.body)
            || self.credentials.refresh_token().is_none()
        {
            return Ok(result);
        }

        debug!(status = result.status, "access token rejected, refreshing");
        let fresh = self.refresh_after(&used_token).await;
        if fresh.is_empty() || fresh == used_token {
            debug!("no new access token, returning original response");
            return Ok(result);
        }

        attempt(fresh).await
    }

    /// Returns an access token newer than `stale`, or an empty string.
    ///
    /// Holds the refresh lock for the whole exchange. A caller that gets the
    /// lock after someone else already replaced `stale` reuses that token.
    /// A failed refresh leaves the credential untouched.
    async fn refresh_after(&self, stale: &str) -> String {
        let _guard = self.refresh_lock.lock().await;

        let current = self.credentials.access_token();
        if current != stale && !current.is_empty() {
            debug!("access token already refreshed by a concurrent call");
            return current;
        }

        let Some(refresh_token) = self.credentials.refresh_token() else {
            return String::new();
        };

        match self.refresher.refresh_access_token(&refresh_token).await {
            Ok(token) if !token.is_empty() => {
                self.credentials.set_access_token(token.clone());
                info!("access token refreshed");
                token
            }
            Ok(_) => {
                warn!("token endpoint returned an empty access token");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "access token refresh failed");
                String::new()
            }
        }
    }
}
