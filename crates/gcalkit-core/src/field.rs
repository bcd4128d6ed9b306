//! Named fields used to pick values out of API payloads.

use std::fmt;
use std::str::FromStr;

use crate::scope::UnknownVariant;

/// A field of the token endpoint's JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    AccessToken,
    RefreshToken,
    Scope,
    TokenType,
    ExpiresIn,
}

impl CredentialField {
    /// Returns the JSON property name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::Scope => "scope",
            Self::TokenType => "token_type",
            Self::ExpiresIn => "expires_in",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialField {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access_token" => Ok(Self::AccessToken),
            "refresh_token" => Ok(Self::RefreshToken),
            "scope" => Ok(Self::Scope),
            "token_type" => Ok(Self::TokenType),
            "expires_in" => Ok(Self::ExpiresIn),
            other => Err(UnknownVariant::new("credential field", other)),
        }
    }
}

/// A text field that calendars and events can be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupField {
    Summary,
    Description,
    Location,
}

impl LookupField {
    /// Returns the JSON property name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for LookupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_field_names() {
        assert_eq!(CredentialField::AccessToken.as_str(), "access_token");
        assert_eq!(CredentialField::ExpiresIn.to_string(), "expires_in");
        assert_eq!("token_type".parse(), Ok(CredentialField::TokenType));
        assert!("id_token".parse::<CredentialField>().is_err());
    }

    #[test]
    fn lookup_field_names() {
        assert_eq!(LookupField::Summary.as_str(), "summary");
        assert_eq!(LookupField::Location.to_string(), "location");
    }
}
