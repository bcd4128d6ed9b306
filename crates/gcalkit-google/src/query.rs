//! Query-string construction for list-style GET requests.
//!
//! Parameters come in as a flat sequence read as alternating key/value
//! pairs, so optional values can sit inline with required ones:
//!
//! ```ignore
//! let response = get_with_query_strings(&transport, &uri, &[
//!     Some("timeMin"), Some(time_min.as_str()),
//!     Some("timeMax"), Some(time_max.as_str()),
//!     Some("timeZone"), time_zone,   // skipped when None
//! ], Some(token)).await?;
//! ```

use crate::error::{ApiResult, QueryError};
use crate::http::{HttpRequest, HttpTransport, RawResponse};

/// A request URI that query parameters are appended to in place.
///
/// Validation happens pair by pair. If a later pair fails, the pairs already
/// appended stay on the URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryUri {
    uri: String,
}

impl QueryUri {
    /// Starts from a base URI, which may already carry a query string.
    pub fn new(base: impl Into<String>) -> Result<Self, QueryError> {
        let uri = base.into();
        if uri.is_empty() {
            return Err(QueryError::EmptyRequestUri);
        }
        Ok(Self { uri })
    }

    /// Appends every pair of `params` whose value is present.
    ///
    /// Values are percent-encoded; keys are appended as given.
    pub fn append_pairs<S: AsRef<str>>(&mut self, params: &[Option<S>]) -> Result<(), QueryError> {
        if params.is_empty() {
            return Err(QueryError::MissingParameters);
        }
        if params.len() % 2 != 0 {
            return Err(QueryError::OddParameterCount {
                count: params.len(),
            });
        }

        for (pair, chunk) in params.chunks_exact(2).enumerate() {
            let Some(key) = chunk[0].as_ref() else {
                return Err(QueryError::NullKey { index: pair * 2 });
            };
            let Some(value) = chunk[1].as_ref() else {
                continue;
            };
            self.push(key.as_ref(), value.as_ref());
        }
        Ok(())
    }

    fn push(&mut self, key: &str, value: &str) {
        let separator = if self.uri.contains('?') { '&' } else { '?' };
        self.uri.push(separator);
        self.uri.push_str(key);
        self.uri.push('=');
        self.uri.push_str(&urlencoding::encode(value));
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn into_string(self) -> String {
        self.uri
    }
}

impl std::fmt::Display for QueryUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Builds `base` plus the query pairs in `params`.
pub fn build_query_uri<S: AsRef<str>>(base: &str, params: &[Option<S>]) -> Result<String, QueryError> {
    let mut uri = QueryUri::new(base)?;
    uri.append_pairs(params)?;
    Ok(uri.into_string())
}

/// Appends `params` to `base` and performs a GET.
///
/// Validation errors are returned before anything is sent. The response is
/// returned as-is, whatever its status.
pub async fn get_with_query_strings<S: AsRef<str>>(
    transport: &dyn HttpTransport,
    base: &str,
    params: &[Option<S>],
    bearer: Option<&str>,
) -> ApiResult<RawResponse> {
    let uri = build_query_uri(base, params)?;
    let mut request = HttpRequest::get(uri);
    if let Some(token) = bearer {
        request = request.with_bearer(token);
    }
    transport.send(request).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::ErrorCode;
    use crate::http::BoxFuture;

    const BASE: &str = "https://x.test/a";

    /// Records every request and answers 200 with a fixed body.
    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl HttpTransport for RecordingTransport {
        fn send(&self, request: HttpRequest) -> BoxFuture<'_, ApiResult<RawResponse>> {
            self.requests.lock().unwrap().push(request);
            Box::pin(async { Ok(RawResponse::new(200, "hello_world")) })
        }
    }

    #[test]
    fn builds_pairs_in_order() {
        let uri = build_query_uri(
            BASE,
            &[Some("fruit"), Some("apple"), Some("size"), Some("large")],
        )
        .unwrap();
        assert_eq!(uri, "https://x.test/a?fruit=apple&size=large");
    }

    #[test]
    fn continues_existing_query_with_ampersand() {
        let uri = build_query_uri("https://x.test/a?maxResults=10", &[Some("k"), Some("v")]).unwrap();
        assert_eq!(uri, "https://x.test/a?maxResults=10&k=v");
    }

    #[test]
    fn encodes_values_but_not_keys() {
        let uri = build_query_uri(
            BASE,
            &[Some("time.Min"), Some("2024-03-15T10:00:00Z"), Some("q"), Some("a b&c/d~e")],
        )
        .unwrap();
        assert_eq!(
            uri,
            "https://x.test/a?time.Min=2024-03-15T10%3A00%3A00Z&q=a%20b%26c%2Fd~e"
        );
    }

    #[test]
    fn empty_value_is_kept() {
        let uri = build_query_uri(BASE, &[Some("scope"), Some("")]).unwrap();
        assert_eq!(uri, "https://x.test/a?scope=");
    }

    #[test]
    fn absent_value_skips_only_that_pair() {
        let uri = build_query_uri(
            BASE,
            &[Some("a"), Some("1"), Some("timeZone"), None, Some("b"), Some("2")],
        )
        .unwrap();
        assert_eq!(uri, "https://x.test/a?a=1&b=2");
    }

    #[test]
    fn first_pair_absent_still_uses_question_mark_for_next() {
        let uri = build_query_uri(BASE, &[Some("a"), None, Some("b"), Some("2")]).unwrap();
        assert_eq!(uri, "https://x.test/a?b=2");
    }

    #[test]
    fn all_values_absent_leaves_uri_unchanged() {
        let uri = build_query_uri(BASE, &[Some("a"), None::<&str>]).unwrap();
        assert_eq!(uri, BASE);
    }

    #[test]
    fn empty_sequence_is_missing_parameters() {
        let params: [Option<&str>; 0] = [];
        assert_eq!(
            build_query_uri(BASE, &params),
            Err(QueryError::MissingParameters)
        );
    }

    #[test]
    fn odd_sequence_is_rejected() {
        assert_eq!(
            build_query_uri(BASE, &[Some(""), Some(""), Some("")]),
            Err(QueryError::OddParameterCount { count: 3 })
        );
    }

    #[test]
    fn absent_key_is_rejected_at_any_position() {
        assert_eq!(
            build_query_uri(BASE, &[None, Some("something")]),
            Err(QueryError::NullKey { index: 0 })
        );
        assert_eq!(
            build_query_uri(BASE, &[Some("a"), Some("1"), None, Some("x")]),
            Err(QueryError::NullKey { index: 2 })
        );
    }

    #[test]
    fn absent_key_with_absent_value_is_still_rejected() {
        assert_eq!(
            build_query_uri(BASE, &[Some("a"), Some("1"), None, None::<&str>]),
            Err(QueryError::NullKey { index: 2 })
        );
    }

    #[test]
    fn pairs_before_a_bad_key_stay_appended() {
        let mut uri = QueryUri::new(BASE).unwrap();
        let err = uri
            .append_pairs(&[Some("a"), Some("1"), None, Some("x"), Some("b"), Some("2")])
            .unwrap_err();

        assert_eq!(err, QueryError::NullKey { index: 2 });
        assert_eq!(uri.as_str(), "https://x.test/a?a=1");
    }

    #[test]
    fn count_checks_run_before_any_append() {
        let mut uri = QueryUri::new(BASE).unwrap();
        assert!(uri.append_pairs(&[Some("a"), Some("1"), Some("b")]).is_err());
        assert_eq!(uri.as_str(), BASE);
    }

    #[test]
    fn empty_base_is_rejected() {
        assert_eq!(
            build_query_uri("", &[Some("a"), Some("1")]),
            Err(QueryError::EmptyRequestUri)
        );
    }

    #[test]
    fn accepts_owned_strings() {
        let max = 250.to_string();
        let params = vec![Some("maxResults".to_string()), Some(max)];
        assert_eq!(
            build_query_uri(BASE, &params).unwrap(),
            "https://x.test/a?maxResults=250"
        );
    }

    #[tokio::test]
    async fn get_sends_built_uri() {
        let transport = RecordingTransport::default();
        let response = get_with_query_strings(
            &transport,
            BASE,
            &[Some("fruit"), Some("apple"), Some("size"), Some("large")],
            Some("tok"),
        )
        .await
        .unwrap();

        assert_eq!(response, RawResponse::new(200, "hello_world"));
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://x.test/a?fruit=apple&size=large");
        assert_eq!(requests[0].bearer.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn validation_failure_sends_nothing() {
        let transport = RecordingTransport::default();
        let err = get_with_query_strings(&transport, BASE, &[Some("a")], None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::OddParameterCount);
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
