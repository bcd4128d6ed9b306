//! Shared pieces for gcalkit: tracing setup, wire-string tables and
//! Calendar API time formatting.

pub mod field;
pub mod scope;
pub mod time;
pub mod tracing;

pub use field::{CredentialField, LookupField};
pub use scope::{PromptType, Scope, UnknownVariant};
pub use time::{GOOGLE_DATETIME_FORMAT, TimeWindow, format_google_datetime};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
