//! In-memory OAuth credential shared by the OAuth and Calendar clients.
//!
//! The credential is an observable value: writers go through
//! [`CredentialStore`], and anyone interested in new tokens (for example to
//! persist them) holds a [`watch::Receiver`] from [`CredentialStore::subscribe`].
//! Subscribers are woken only when a value actually changes.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// An access token and, optionally, the refresh token that mints new ones.
///
/// No expiry is tracked; an expired token is detected from a failed call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl AccessCredential {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Returns the refresh token if one is held and non-empty.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredential")
            .field("has_access_token", &!self.access_token.is_empty())
            .field("has_refresh_token", &self.usable_refresh_token().is_some())
            .finish()
    }
}

/// The token endpoint's JSON answer, as far as the credential cares.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Shared, observable holder of the session's [`AccessCredential`].
///
/// Clones share the same credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    sender: Arc<watch::Sender<AccessCredential>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(AccessCredential::default())
    }
}

impl CredentialStore {
    pub fn new(initial: AccessCredential) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns a copy of the current credential.
    pub fn snapshot(&self) -> AccessCredential {
        self.sender.borrow().clone()
    }

    pub fn access_token(&self) -> String {
        self.sender.borrow().access_token.clone()
    }

    /// Returns the refresh token if one is held and non-empty.
    pub fn refresh_token(&self) -> Option<String> {
        self.sender.borrow().usable_refresh_token().map(str::to_owned)
    }

    /// Replaces the access token. Returns true if it changed.
    pub fn set_access_token(&self, token: impl Into<String>) -> bool {
        let token = token.into();
        self.sender.send_if_modified(|current| {
            if current.access_token == token {
                return false;
            }
            current.access_token = token;
            true
        })
    }

    /// Replaces the refresh token. Returns true if it changed.
    pub fn set_refresh_token(&self, token: Option<String>) -> bool {
        self.sender.send_if_modified(|current| {
            if current.refresh_token == token {
                return false;
            }
            current.refresh_token = token;
            true
        })
    }

    /// Replaces the whole credential. Returns true if it changed.
    pub fn replace(&self, credential: AccessCredential) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == credential {
                return false;
            }
            *current = credential;
            true
        })
    }

    /// Applies a token endpoint response body.
    ///
    /// The access token is always replaced. The refresh token is replaced
    /// only when the response carries one, since refresh grants usually
    /// omit it.
    pub fn apply_token_response(&self, body: &str) -> ApiResult<()> {
        let response: TokenResponse = serde_json::from_str(body).map_err(|e| {
            ApiError::invalid_response(format!("invalid token response: {}", e)).with_source(e)
        })?;

        self.sender.send_if_modified(|current| {
            let mut changed = false;
            if current.access_token != response.access_token {
                current.access_token = response.access_token;
                changed = true;
            }
            if let Some(refresh) = response.refresh_token
                && current.refresh_token.as_deref() != Some(refresh.as_str())
            {
                current.refresh_token = Some(refresh);
                changed = true;
            }
            changed
        });
        debug!("applied token response to credential");
        Ok(())
    }

    /// Subscribes to credential changes.
    ///
    /// The receiver starts with the current value marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<AccessCredential> {
        self.sender.subscribe()
    }
}
