//! Google Calendar v3: calendars, events and lookups.
//!
//! # Example
//!
//! ```ignore
//! use gcalkit_google::calendar::{CalendarClient, EventQuery};
//! use gcalkit_google::{CredentialStore, GoogleConfig};
//!
//! let client = CalendarClient::new(&config, store.clone())?;
//! let primary = client.find_primary_calendar(true).await?;
//! let events = client
//!     .list_events(&EventQuery::new("primary", window), true)
//!     .await?
//!     .into_data();
//! ```

mod client;
mod models;

pub use client::{
    ApiReply, CalendarClient, DEFAULT_CALENDAR_PAGE_SIZE, DEFAULT_EVENT_PAGE_SIZE, EventQuery,
};
pub use models::{
    Attendee, Calendar, CalendarList, CalendarListEntry, ConferenceProperties, DefaultReminder,
    Event, EventDateTime, EventList, Notification, NotificationSettings, Person, Reminders,
};
