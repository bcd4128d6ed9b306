//! Error types for OAuth and Calendar operations.
//!
//! Only two kinds of failure are raised as errors: caller-input validation
//! (checked before any request leaves the process) and transport-level
//! failures. A non-2xx answer from Google is not an error here; it comes
//! back as an unsuccessful [`RawResponse`](crate::http::RawResponse).

use std::fmt;
use thiserror::Error;

/// The category of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Query parameters were required but none were given.
    MissingParameters,
    /// Query parameters did not come in key/value pairs.
    OddParameterCount,
    /// A query parameter key was absent.
    NullKey,
    /// The request URI was empty or malformed.
    InvalidRequestUri,
    /// Connection failed, timed out, or the body could not be read.
    Network,
    /// A response body did not have the expected shape.
    InvalidResponse,
    /// The token endpoint rejected a code or refresh token.
    Authentication,
    /// Missing or invalid configuration.
    Configuration,
    /// The authorization page could not be opened.
    Browser,
    /// Unexpected internal state.
    Internal,
}

impl ErrorCode {
    /// Returns true for caller-input errors raised before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingParameters
                | Self::OddParameterCount
                | Self::NullKey
                | Self::InvalidRequestUri
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingParameters => "missing_parameters",
            Self::OddParameterCount => "odd_parameter_count",
            Self::NullKey => "null_key",
            Self::InvalidRequestUri => "invalid_request_uri",
            Self::Network => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::Authentication => "authentication_failed",
            Self::Configuration => "configuration_error",
            Self::Browser => "browser_error",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validation failures of the query-string builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query parameters are required")]
    MissingParameters,

    #[error(
        "query parameters must be key/value pairs, got an odd number of strings ({count})"
    )]
    OddParameterCount { count: usize },

    #[error("query parameter key at position {index} is required")]
    NullKey { index: usize },

    #[error("request URI is required")]
    EmptyRequestUri,
}

impl QueryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingParameters => ErrorCode::MissingParameters,
            Self::OddParameterCount { .. } => ErrorCode::OddParameterCount,
            Self::NullKey { .. } => ErrorCode::NullKey,
            Self::EmptyRequestUri => ErrorCode::InvalidRequestUri,
        }
    }
}

/// An error raised by an OAuth or Calendar operation.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Authentication, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Configuration, message)
    }

    pub fn browser(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Browser, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true for caller-input errors raised before any network call.
    pub fn is_validation(&self) -> bool {
        self.code.is_validation()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::new(err.code(), err.to_string()).with_source(err)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else if err.is_builder() {
            return Self::new(ErrorCode::InvalidRequestUri, format!("invalid request: {}", err))
                .with_source(err);
        } else {
            format!("request failed: {}", err)
        };
        Self::network(message).with_source(err)
    }
}

/// Result alias for OAuth and Calendar operations.
pub type ApiResult<T> = Result<T, ApiError>;
