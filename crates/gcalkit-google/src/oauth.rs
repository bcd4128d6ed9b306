//! Google OAuth 2.0 authorization-code flow.
//!
//! # Flow Overview
//!
//! 1. Build the authorization URL and open it in a browser tab
//! 2. User picks an account and grants permission; Google redirects to the
//!    configured redirect URL with a `code` parameter
//! 3. Exchange the code for access and refresh tokens
//! 4. Later, exchange the refresh token for fresh access tokens
//!
//! Receiving the redirect is the caller's business: web apps already have a
//! route for it, desktop apps can run a loopback listener.

use std::sync::Arc;

use gcalkit_core::{CredentialField, PromptType, Scope};
use serde::Deserialize;
use tracing::{debug, info};

use crate::browser::BrowserBridge;
use crate::config::{Endpoints, GoogleConfig, OAuthCredentials};
use crate::credential::CredentialStore;
use crate::error::{ApiError, ApiResult};
use crate::http::{BoxFuture, HttpRequest, HttpTransport, RawResponse, ReqwestTransport};
use crate::query::get_with_query_strings;
use crate::refresh::{self, AccessTokenRefresher};

/// Google's account-chooser flow name.
const FLOW_NAME: &str = "GeneralOAuthFlow";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
}

/// OAuth client for Google APIs.
///
/// Cheap to clone; clones share the HTTP transport.
#[derive(Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    endpoints: Endpoints,
    scopes: Vec<Scope>,
    prompt: PromptType,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.endpoints)
            .field("scopes", &self.scopes)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    /// Creates a client with a reqwest transport built from `config`.
    ///
    /// The configured scopes and prompt become the client's defaults.
    pub fn new(config: &GoogleConfig) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(config.timeout, &config.user_agent)?;
        Ok(Self::with_transport(
            config.credentials.clone(),
            config.endpoints.clone(),
            Arc::new(transport),
        )
        .with_scopes(config.scopes.clone())
        .with_prompt(config.prompt))
    }

    /// Creates a client over an existing transport.
    ///
    /// Default scopes are `[Scope::Calendar]` with the default prompt.
    pub fn with_transport(
        credentials: OAuthCredentials,
        endpoints: Endpoints,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            credentials,
            endpoints,
            scopes: vec![Scope::Calendar],
            prompt: PromptType::default(),
            transport,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<Scope>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptType) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn prompt(&self) -> PromptType {
        self.prompt
    }

    /// Authorization URL for the client's own scopes and prompt.
    pub fn default_authorization_url(&self) -> Option<String> {
        self.authorization_url(&self.scopes, self.prompt)
    }

    /// Opens the authorization page for the client's own scopes and prompt.
    pub fn open_authorization_page(&self, browser: &dyn BrowserBridge) -> ApiResult<()> {
        self.request_authorization_code(browser, &self.scopes, self.prompt)
    }

    /// Builds the account-chooser authorization URL.
    ///
    /// Returns `None` when `scopes` is empty. Scopes are joined with `+`,
    /// the redirect URL is form-encoded and offline access is always asked
    /// for, so the first exchange yields a refresh token.
    pub fn authorization_url(&self, scopes: &[Scope], prompt: PromptType) -> Option<String> {
        if scopes.is_empty() {
            return None;
        }

        let scope = scopes
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join("+");
        let redirect_uri: String =
            url::form_urlencoded::byte_serialize(self.credentials.redirect_url.as_bytes()).collect();

        Some(format!(
            "{}?response_type=code&client_id={}&scope={}&redirect_uri={}&\
            flowName={}&access_type=offline&prompt={}",
            self.endpoints.authorize,
            self.credentials.client_id,
            scope,
            redirect_uri,
            FLOW_NAME,
            prompt.as_str(),
        ))
    }

    /// Opens the authorization page in a new browser tab.
    ///
    /// Does nothing when `scopes` is empty.
    pub fn request_authorization_code(
        &self,
        browser: &dyn BrowserBridge,
        scopes: &[Scope],
        prompt: PromptType,
    ) -> ApiResult<()> {
        let Some(url) = self.authorization_url(scopes, prompt) else {
            debug!("no scopes requested, not opening the authorization page");
            return Ok(());
        };

        info!("opening Google authorization page");
        browser.open_tab(&url)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// Returns the token endpoint's JSON body as is; pick values out of it
    /// with [`OAuthClient::credential_value`] or feed it to
    /// [`CredentialStore::apply_token_response`].
    pub async fn exchange_code(&self, code: &str) -> ApiResult<String> {
        let request = HttpRequest::post(&self.endpoints.token).with_form([
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", self.credentials.redirect_url.as_str()),
            ("scope", ""),
            ("grant_type", "authorization_code"),
        ]);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(token_error("token exchange", &response));
        }

        info!("successfully obtained tokens");
        Ok(response.body)
    }

    /// Exchanges an authorization code and stores the resulting tokens.
    pub async fn authorize_credential(&self, code: &str, store: &CredentialStore) -> ApiResult<()> {
        let body = self.exchange_code(code).await?;
        store.apply_token_response(&body)
    }

    /// Mints a new access token from a refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ApiResult<String> {
        let request = HttpRequest::post(&self.endpoints.token).with_form([
            ("refresh_token", refresh_token),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", self.credentials.redirect_url.as_str()),
            ("scope", ""),
            ("grant_type", "refresh_token"),
        ]);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(token_error("token refresh", &response));
        }

        let parsed: RefreshResponse = serde_json::from_str(&response.body).map_err(|e| {
            ApiError::invalid_response(format!("invalid token response: {}", e)).with_source(e)
        })?;

        info!("successfully refreshed access token");
        Ok(parsed.access_token)
    }

    /// Returns the e-mail address of the user the token belongs to.
    pub async fn user_email(&self, access_token: &str) -> ApiResult<String> {
        let request = HttpRequest::get(&self.endpoints.user_info).with_bearer(access_token);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ApiError::authentication(format!(
                "user info request failed ({}): {}",
                response.status, response.body
            )));
        }

        let info: UserInfo = serde_json::from_str(&response.body).map_err(|e| {
            ApiError::invalid_response(format!("invalid user info response: {}", e)).with_source(e)
        })?;
        Ok(info.email)
    }

    /// Returns Google's token-info JSON (scope, expiry, audience, ...) for
    /// an access token, whatever the status.
    pub async fn access_token_details(&self, access_token: &str) -> ApiResult<String> {
        let response = get_with_query_strings(
            self.transport.as_ref(),
            &self.endpoints.token_info,
            &[Some("access_token"), Some(access_token)],
            None,
        )
        .await?;
        Ok(response.body)
    }

    /// Reads one field out of a token endpoint response.
    ///
    /// Strings come back without quotes; numbers such as `expires_in` come
    /// back as their JSON text.
    pub fn credential_value(credential: &str, field: CredentialField) -> ApiResult<String> {
        let json: serde_json::Value = serde_json::from_str(credential).map_err(|e| {
            ApiError::invalid_response(format!("invalid credential JSON: {}", e)).with_source(e)
        })?;

        match json.get(field.as_str()) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(ApiError::invalid_response(format!(
                "credential has no {} field",
                field
            ))),
        }
    }

    /// Returns true if `body` is Google's expired-token error.
    pub fn is_access_token_expired(body: &str) -> bool {
        refresh::is_access_token_expired(body)
    }
}

impl AccessTokenRefresher for OAuthClient {
    fn refresh_access_token<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ApiResult<String>> {
        Box::pin(OAuthClient::refresh_access_token(self, refresh_token))
    }
}

fn token_error(what: &str, response: &RawResponse) -> ApiError {
    ApiError::authentication(format!(
        "{} failed ({}): {}",
        what, response.status, response.body
    ))
}
