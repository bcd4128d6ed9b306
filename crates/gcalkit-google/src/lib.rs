//! Google OAuth 2.0 and Calendar v3 client.
//!
//! - [`OAuthClient`] - Authorization URL, code exchange, token refresh
//! - [`CalendarClient`] - Calendar and event operations
//! - [`TokenRefresher`] - Refresh-once-and-retry around authenticated calls
//! - [`CredentialStore`] - Observable access/refresh token pair
//! - [`get_with_query_strings`] - Validated query-string GETs
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐        ┌──────────────────┐
//! │  CalendarClient  │        │   OAuthClient    │
//! └────────┬─────────┘        └────────┬─────────┘
//!          │                           │ AccessTokenRefresher
//!          ▼                           │
//! ┌──────────────────┐                 │
//! │  TokenRefresher  │◀────────────────┘
//! └────────┬─────────┘
//!          │ reads / updates
//!          ▼
//! ┌──────────────────┐     watch      ┌─────────────┐
//! │ CredentialStore  │───────────────▶│ subscribers │
//! └──────────────────┘                └─────────────┘
//!          │
//!          ▼ every request
//! ┌──────────────────┐
//! │  HttpTransport   │  (ReqwestTransport)
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gcalkit_google::{CalendarClient, CredentialStore, GoogleConfig, OAuthClient, SystemBrowser};
//!
//! let config = GoogleConfig::from_lookup(&settings, "GoogleClient")?;
//! let oauth = OAuthClient::new(&config)?;
//! oauth.open_authorization_page(&SystemBrowser)?;
//!
//! // ...the redirect handler receives `code`...
//! let store = CredentialStore::default();
//! oauth.authorize_credential(&code, &store).await?;
//!
//! let calendar = CalendarClient::new(&config, store)?;
//! let calendars = calendar.list_calendars(250, true).await?;
//! ```

pub mod browser;
pub mod calendar;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod oauth;
pub mod query;
pub mod refresh;

pub use browser::{BrowserBridge, SystemBrowser};
pub use calendar::{ApiReply, CalendarClient, EventQuery};
pub use config::{
    ConfigLookup, DEFAULT_SETTINGS_ROOT, Endpoints, GoogleConfig, OAuthCredentials, TomlSettings,
};
pub use credential::{AccessCredential, CredentialStore};
pub use error::{ApiError, ApiResult, ErrorCode, QueryError};
pub use http::{BoxFuture, HttpMethod, HttpRequest, HttpTransport, RawResponse, ReqwestTransport, RequestBody};
pub use oauth::OAuthClient;
pub use query::{QueryUri, build_query_uri, get_with_query_strings};
pub use refresh::{AccessTokenRefresher, TokenRefresher, is_access_token_expired};
