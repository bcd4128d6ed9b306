//! Client configuration and settings lookup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gcalkit_core::{PromptType, Scope};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Settings section that holds the OAuth client by default.
pub const DEFAULT_SETTINGS_ROOT: &str = "GoogleClient";

/// OAuth 2.0 client registration for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
    /// The Cloud project the client belongs to, if known.
    pub project_id: Option<String>,
    /// Where Google sends the user back with the authorization code.
    pub redirect_url: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports the Cloud Console download (an `installed` or `web` section)
/// and a flat layout with the fields at the root.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<CredentialsSection>,
    web: Option<CredentialsSection>,
    #[serde(flatten)]
    flat: FlatCredentials,
}

#[derive(Debug, Deserialize)]
struct CredentialsSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FlatCredentials {
    client_id: Option<String>,
    client_secret: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
}

impl OAuthCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            project_id: None,
            redirect_url: redirect_url.into(),
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = redirect_url.into();
        self
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ApiError::configuration(format!("failed to read credentials file: {}", e))
                .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from a Google credentials JSON string.
    ///
    /// Supports multiple formats:
    /// 1. Cloud Console: `{"installed": {"client_id": "...", "client_secret": "...", "redirect_uris": [...]}}`
    /// 2. Flat: `{"client_id": "...", "client_secret": "..."}`
    ///
    /// The redirect URL is the first of `redirect_uris` when present, and
    /// empty otherwise.
    pub fn from_json(json: &str) -> ApiResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ApiError::configuration(format!("failed to parse credentials JSON: {}", e))
                .with_source(e)
        })?;

        if let Some(section) = file.installed.or(file.web) {
            let redirect_url = section.redirect_uris.into_iter().next().unwrap_or_default();
            return Ok(Self {
                client_id: section.client_id,
                client_secret: section.client_secret,
                project_id: section.project_id,
                redirect_url,
            });
        }

        if let (Some(client_id), Some(client_secret)) = (file.flat.client_id, file.flat.client_secret) {
            return Ok(Self {
                client_id,
                client_secret,
                project_id: file.flat.project_id,
                redirect_url: String::new(),
            });
        }

        Err(ApiError::configuration(
            "credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Reads `client_id`, `client_secret`, `project_id` and `redirect_url`
    /// from the `root` section of a settings source.
    ///
    /// `client_id` and `client_secret` are required.
    pub fn from_lookup(lookup: &dyn ConfigLookup, root: &str) -> ApiResult<Self> {
        let required = |key: &str| {
            lookup
                .value(&[root, key])
                .ok_or_else(|| ApiError::configuration(format!("missing setting {}.{}", root, key)))
        };

        Ok(Self {
            client_id: required("client_id")?,
            client_secret: required("client_secret")?,
            project_id: lookup.value(&[root, "project_id"]),
            redirect_url: lookup.value(&[root, "redirect_url"]).unwrap_or_default(),
        })
    }

    /// Checks that the credentials look usable.
    ///
    /// The client ID must end with `.apps.googleusercontent.com`, the secret
    /// must be non-empty and the redirect URL must be an absolute URL.
    pub fn validate(&self) -> ApiResult<()> {
        if self.client_id.is_empty() {
            return Err(ApiError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(ApiError::configuration(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.is_empty() {
            return Err(ApiError::configuration("client_secret is required"));
        }
        if self.redirect_url.is_empty() {
            return Err(ApiError::configuration("redirect_url is required"));
        }
        url::Url::parse(&self.redirect_url).map_err(|e| {
            ApiError::configuration(format!("invalid redirect_url: {}", e)).with_source(e)
        })?;
        Ok(())
    }
}

/// Google endpoints the clients talk to.
///
/// Only tests normally change these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub user_info: String,
    pub token_info: String,
    /// Calendar v3 base, without a trailing slash.
    pub calendar: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize: "https://accounts.google.com/o/oauth2/auth/oauthchooseaccount".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            user_info: "https://www.googleapis.com/userinfo/v2/me".to_string(),
            token_info: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            calendar: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at one server, keeping Google's paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize: format!("{base}/o/oauth2/auth/oauthchooseaccount"),
            token: format!("{base}/token"),
            user_info: format!("{base}/userinfo/v2/me"),
            token_info: format!("{base}/tokeninfo"),
            calendar: format!("{base}/calendar/v3"),
        }
    }

    fn validate(&self) -> ApiResult<()> {
        for (name, value) in [
            ("authorize", &self.authorize),
            ("token", &self.token),
            ("user_info", &self.user_info),
            ("token_info", &self.token_info),
            ("calendar", &self.calendar),
        ] {
            url::Url::parse(value).map_err(|e| {
                ApiError::configuration(format!("invalid {} endpoint: {}", name, e)).with_source(e)
            })?;
        }
        Ok(())
    }
}

/// Configuration for the OAuth and Calendar clients.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client registration.
    pub credentials: OAuthCredentials,

    /// Scopes requested by the authorization URL.
    ///
    /// Defaults to `[Scope::Calendar]`.
    pub scopes: Vec<Scope>,

    /// Consent behavior of the authorization page.
    pub prompt: PromptType,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    pub endpoints: Endpoints,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            scopes: vec![Scope::Calendar],
            prompt: PromptType::default(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("gcalkit/{}", env!("CARGO_PKG_VERSION")),
            endpoints: Endpoints::default(),
        }
    }

    /// Builds a configuration from the `root` section of a settings source.
    ///
    /// Besides the credentials, `scopes` (a list of scope URLs), `prompt`
    /// and `timeout_secs` are read when present.
    pub fn from_lookup(lookup: &dyn ConfigLookup, root: &str) -> ApiResult<Self> {
        let mut config = Self::new(OAuthCredentials::from_lookup(lookup, root)?);

        if let Some(scopes) = lookup.values(&[root, "scopes"]) {
            config.scopes = scopes
                .iter()
                .map(|s| {
                    s.parse::<Scope>()
                        .map_err(|e| ApiError::configuration(e.to_string()).with_source(e))
                })
                .collect::<ApiResult<_>>()?;
        }
        if let Some(prompt) = lookup.value(&[root, "prompt"]) {
            config.prompt = prompt
                .parse()
                .map_err(|e: gcalkit_core::UnknownVariant| {
                    ApiError::configuration(e.to_string()).with_source(e)
                })?;
        }
        if let Some(secs) = lookup.value(&[root, "timeout_secs"]) {
            let secs: u64 = secs.parse().map_err(|e| {
                ApiError::configuration(format!("invalid {}.timeout_secs: {}", root, e))
                    .with_source(e)
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        debug!(root, scopes = config.scopes.len(), "loaded Google client settings");
        Ok(config)
    }

    pub fn with_scopes(mut self, scopes: Vec<Scope>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptType) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ApiResult<()> {
        self.credentials.validate()?;

        if self.scopes.is_empty() {
            return Err(ApiError::configuration("at least one OAuth scope is required"));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::configuration("timeout must be greater than zero"));
        }

        self.endpoints.validate()
    }
}

/// Read-only access to string settings by nested key path.
pub trait ConfigLookup: Send + Sync {
    /// Returns the scalar at `path`, rendered as a string.
    fn value(&self, path: &[&str]) -> Option<String>;

    /// Returns the list of scalars at `path`.
    fn values(&self, path: &[&str]) -> Option<Vec<String>>;
}

/// Settings read from a TOML document.
///
/// ```toml
/// [GoogleClient]
/// client_id = "1234.apps.googleusercontent.com"
/// client_secret = "..."
/// project_id = "my-project"
/// redirect_url = "http://localhost:8080/callback"
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlSettings {
    root: toml::Table,
}

impl TomlSettings {
    /// Returns `~/.config/gcalkit/config.toml`, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gcalkit").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> ApiResult<Self> {
        let root = content.parse::<toml::Table>().map_err(|e| {
            ApiError::configuration(format!("failed to parse settings: {}", e)).with_source(e)
        })?;
        Ok(Self { root })
    }

    pub fn load(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiError::configuration(format!(
                "failed to read settings file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        debug!(path = %path.display(), "loading settings");
        Self::from_toml(&content)
    }

    fn lookup(&self, path: &[&str]) -> Option<&toml::Value> {
        let (last, sections) = path.split_last()?;
        let mut table = &self.root;
        for key in sections {
            table = table.get(*key)?.as_table()?;
        }
        table.get(*last)
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

impl ConfigLookup for TomlSettings {
    fn value(&self, path: &[&str]) -> Option<String> {
        self.lookup(path).and_then(scalar_to_string)
    }

    fn values(&self, path: &[&str]) -> Option<Vec<String>> {
        self.lookup(path)?
            .as_array()?
            .iter()
            .map(scalar_to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
            "http://localhost:8080/callback",
        )
    }

    const SETTINGS: &str = r#"
        [GoogleClient]
        client_id = "settings-id.apps.googleusercontent.com"
        client_secret = "settings-secret"
        project_id = "settings-project"
        redirect_url = "https://app.test/oauth"

        [Work]
        client_id = "work.apps.googleusercontent.com"
        client_secret = "work-secret"
        scopes = [
            "https://www.googleapis.com/auth/calendar.readonly",
            "https://www.googleapis.com/auth/userinfo.email",
        ]
        prompt = "select_account"
        timeout_secs = 5

        [Nested.Deeper]
        port = 8080
    "#;

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());

        let empty_id = OAuthCredentials::new("", "secret", "http://localhost");
        assert!(empty_id.validate().is_err());

        let bad_id = OAuthCredentials::new("bad-id", "secret", "http://localhost");
        assert!(bad_id.validate().is_err());

        let empty_secret =
            OAuthCredentials::new("test.apps.googleusercontent.com", "", "http://localhost");
        assert!(empty_secret.validate().is_err());

        let no_redirect = test_credentials().with_redirect_url("");
        assert!(no_redirect.validate().is_err());

        let relative_redirect = test_credentials().with_redirect_url("/callback");
        let err = relative_redirect.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
    }

    #[test]
    fn debug_hides_client_secret() {
        let printed = format!("{:?}", test_credentials());
        assert!(!printed.contains("test-secret"));
        assert!(printed.contains("test-client.apps.googleusercontent.com"));
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(config.scopes, vec![Scope::Calendar]);
        assert_eq!(config.prompt, PromptType::Consent);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("gcalkit/"));
        assert_eq!(config.endpoints, Endpoints::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder_methods() {
        let config = GoogleConfig::new(test_credentials())
            .with_scopes(vec![Scope::CalendarReadonly, Scope::OAuth2Email])
            .with_prompt(PromptType::SelectAccount)
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("custom/1.0")
            .with_endpoints(Endpoints::with_base("http://127.0.0.1:9999/"));

        assert_eq!(config.scopes, vec![Scope::CalendarReadonly, Scope::OAuth2Email]);
        assert_eq!(config.prompt, PromptType::SelectAccount);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.endpoints.token, "http://127.0.0.1:9999/token");
        assert_eq!(config.endpoints.calendar, "http://127.0.0.1:9999/calendar/v3");
    }

    #[test]
    fn config_validation() {
        let no_scopes = GoogleConfig::new(test_credentials()).with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let zero_timeout = GoogleConfig::new(test_credentials()).with_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());

        let mut bad_endpoint = GoogleConfig::new(test_credentials());
        bad_endpoint.endpoints.token = "not a url".to_string();
        let err = bad_endpoint.validate().unwrap_err();
        assert!(err.message().contains("token endpoint"));
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project",
                "redirect_uris": ["http://localhost", "urn:ietf:wg:oauth:2.0:oob"]
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
        assert_eq!(creds.project_id.as_deref(), Some("my-project"));
        assert_eq!(creds.redirect_url, "http://localhost");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "web-secret");
        assert!(creds.project_id.is_none());
        assert_eq!(creds.redirect_url, "");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret",
            "refresh_token": "some-refresh-token"
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "flat-secret");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let err = OAuthCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn credentials_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"installed":{{"client_id":"f.apps.googleusercontent.com","client_secret":"s"}}}}"#
        )
        .unwrap();

        let creds = OAuthCredentials::from_file(file.path()).unwrap();
        assert_eq!(creds.client_id, "f.apps.googleusercontent.com");

        let missing = OAuthCredentials::from_file("/nonexistent/credentials.json");
        assert!(missing.is_err());
    }

    #[test]
    fn toml_nested_lookup() {
        let settings = TomlSettings::from_toml(SETTINGS).unwrap();
        assert_eq!(
            settings.value(&["GoogleClient", "project_id"]).as_deref(),
            Some("settings-project")
        );
        assert_eq!(
            settings.value(&["Nested", "Deeper", "port"]).as_deref(),
            Some("8080")
        );
        assert!(settings.value(&["GoogleClient", "missing"]).is_none());
        assert!(settings.value(&["Missing", "client_id"]).is_none());
        assert!(settings.value(&["GoogleClient"]).is_none());
        assert!(settings.value(&[]).is_none());
    }

    #[test]
    fn toml_list_lookup() {
        let settings = TomlSettings::from_toml(SETTINGS).unwrap();
        let scopes = settings.values(&["Work", "scopes"]).unwrap();
        assert_eq!(scopes.len(), 2);
        assert!(settings.values(&["Work", "prompt"]).is_none());
    }

    #[test]
    fn credentials_from_default_root() {
        let settings = TomlSettings::from_toml(SETTINGS).unwrap();
        let creds = OAuthCredentials::from_lookup(&settings, DEFAULT_SETTINGS_ROOT).unwrap();

        assert_eq!(creds.client_id, "settings-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "settings-secret");
        assert_eq!(creds.project_id.as_deref(), Some("settings-project"));
        assert_eq!(creds.redirect_url, "https://app.test/oauth");
    }

    #[test]
    fn credentials_from_custom_root() {
        let settings = TomlSettings::from_toml(SETTINGS).unwrap();
        let creds = OAuthCredentials::from_lookup(&settings, "Work").unwrap();
        assert_eq!(creds.client_id, "work.apps.googleusercontent.com");
        assert!(creds.project_id.is_none());
    }

    #[test]
    fn credentials_from_lookup_require_client_id() {
        let settings = TomlSettings::from_toml("[GoogleClient]\nclient_secret = \"s\"").unwrap();
        let err = OAuthCredentials::from_lookup(&settings, DEFAULT_SETTINGS_ROOT).unwrap_err();
        assert!(err.message().contains("GoogleClient.client_id"));
    }

    #[test]
    fn config_from_lookup_reads_optional_settings() {
        let settings = TomlSettings::from_toml(SETTINGS).unwrap();
        let config = GoogleConfig::from_lookup(&settings, "Work").unwrap();

        assert_eq!(config.scopes, vec![Scope::CalendarReadonly, Scope::OAuth2Email]);
        assert_eq!(config.prompt, PromptType::SelectAccount);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_from_lookup_rejects_unknown_scope() {
        let settings = TomlSettings::from_toml(
            "[G]\nclient_id = \"a\"\nclient_secret = \"b\"\nscopes = [\"https://example.com/x\"]",
        )
        .unwrap();
        let err = GoogleConfig::from_lookup(&settings, "G").unwrap_err();
        assert!(err.message().contains("unknown scope"));
    }

    #[test]
    fn settings_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SETTINGS.as_bytes()).unwrap();

        let settings = TomlSettings::load(file.path()).unwrap();
        assert!(settings.value(&["GoogleClient", "client_id"]).is_some());

        let err = TomlSettings::load("/nonexistent/config.toml").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
    }

    #[test]
    fn malformed_settings_are_rejected() {
        assert!(TomlSettings::from_toml("[unclosed").is_err());
    }

    #[test]
    fn default_path_ends_with_config_file() {
        if let Some(path) = TomlSettings::default_path() {
            assert!(path.ends_with("gcalkit/config.toml"));
        }
    }
}
