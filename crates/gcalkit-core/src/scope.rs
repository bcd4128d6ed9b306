//! OAuth scopes and consent prompt modes, with their wire strings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Returned when a wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Google OAuth 2.0 scopes this library knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    OAuth2Email,
    OAuth2Profile,
    Analytics,
    AnalyticsReadonly,
    Calendar,
    CalendarReadonly,
    CalendarEvents,
    CalendarEventsReadonly,
    Drive,
    DriveReadonly,
    DriveFile,
    DriveAppData,
    DriveMetadata,
    DriveMetadataReadonly,
}

impl Scope {
    /// Every scope, in declaration order.
    pub const ALL: [Scope; 14] = [
        Self::OAuth2Email,
        Self::OAuth2Profile,
        Self::Analytics,
        Self::AnalyticsReadonly,
        Self::Calendar,
        Self::CalendarReadonly,
        Self::CalendarEvents,
        Self::CalendarEventsReadonly,
        Self::Drive,
        Self::DriveReadonly,
        Self::DriveFile,
        Self::DriveAppData,
        Self::DriveMetadata,
        Self::DriveMetadataReadonly,
    ];

    /// Returns the scope URL sent to the authorization endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth2Email => "https://www.googleapis.com/auth/userinfo.email",
            Self::OAuth2Profile => "https://www.googleapis.com/auth/userinfo.profile",
            Self::Analytics => "https://www.googleapis.com/auth/analytics",
            Self::AnalyticsReadonly => "https://www.googleapis.com/auth/analytics.readonly",
            Self::Calendar => "https://www.googleapis.com/auth/calendar",
            Self::CalendarReadonly => "https://www.googleapis.com/auth/calendar.readonly",
            Self::CalendarEvents => "https://www.googleapis.com/auth/calendar.events",
            Self::CalendarEventsReadonly => {
                "https://www.googleapis.com/auth/calendar.events.readonly"
            }
            Self::Drive => "https://www.googleapis.com/auth/drive",
            Self::DriveReadonly => "https://www.googleapis.com/auth/drive.readonly",
            Self::DriveFile => "https://www.googleapis.com/auth/drive.file",
            Self::DriveAppData => "https://www.googleapis.com/auth/drive.appdata",
            Self::DriveMetadata => "https://www.googleapis.com/auth/drive.metadata",
            Self::DriveMetadataReadonly => {
                "https://www.googleapis.com/auth/drive.metadata.readonly"
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("scope", s))
    }
}

/// The `prompt` parameter of the authorization URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PromptType {
    /// Skip the consent page when the user already granted access.
    None,
    /// Always ask for consent. Google only returns a refresh token on consent.
    #[default]
    Consent,
    /// Show the account chooser.
    SelectAccount,
}

impl PromptType {
    /// Returns the wire value of the prompt mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Consent => "consent",
            Self::SelectAccount => "select_account",
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "consent" => Ok(Self::Consent),
            "select_account" => Ok(Self::SelectAccount),
            other => Err(UnknownVariant::new("prompt type", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_wire_strings() {
        assert_eq!(
            Scope::Calendar.as_str(),
            "https://www.googleapis.com/auth/calendar"
        );
        assert_eq!(
            Scope::CalendarEventsReadonly.to_string(),
            "https://www.googleapis.com/auth/calendar.events.readonly"
        );
    }

    #[test]
    fn scope_wire_strings_are_unique() {
        for (i, a) in Scope::ALL.iter().enumerate() {
            for b in &Scope::ALL[i + 1..] {
                assert_ne!(a.as_str(), b.as_str(), "{a:?} and {b:?} share a wire string");
            }
        }
    }

    #[test]
    fn scope_parses_from_wire_string() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>(), Ok(scope));
        }
        let err = "https://example.com/other".parse::<Scope>().unwrap_err();
        assert!(err.to_string().contains("unknown scope"));
    }

    #[test]
    fn prompt_defaults_to_consent() {
        assert_eq!(PromptType::default(), PromptType::Consent);
        assert_eq!(PromptType::default().as_str(), "consent");
    }

    #[test]
    fn prompt_parses() {
        assert_eq!("select_account".parse(), Ok(PromptType::SelectAccount));
        assert_eq!("none".parse(), Ok(PromptType::None));
        assert!("always".parse::<PromptType>().is_err());
    }
}
