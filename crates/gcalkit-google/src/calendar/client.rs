//! Google Calendar v3 client.
//!
//! Every operation sends the current access token as a bearer header and
//! runs through [`TokenRefresher::call`], so an expired token is refreshed
//! and the request repeated once when `force_access_token` is set.
//!
//! Google's error answers are not raised: they come back as an
//! [`ApiReply`] whose `data` is `None`. Only validation, transport and
//! malformed-success failures are errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gcalkit_core::{LookupField, TimeWindow, format_google_datetime};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{Calendar, CalendarList, CalendarListEntry, Event, EventList};
use crate::config::GoogleConfig;
use crate::credential::CredentialStore;
use crate::error::{ApiError, ApiResult};
use crate::http::{HttpRequest, HttpTransport, RawResponse, ReqwestTransport};
use crate::oauth::OAuthClient;
use crate::query::get_with_query_strings;
use crate::refresh::TokenRefresher;

/// Default page size of `calendarList.list`.
pub const DEFAULT_CALENDAR_PAGE_SIZE: u32 = 250;

/// Default page size of `events.list`.
pub const DEFAULT_EVENT_PAGE_SIZE: u32 = 2500;

/// A Calendar API answer: the raw response, plus the parsed resource when
/// the status was 2xx.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply<T> {
    pub response: RawResponse,
    pub data: Option<T>,
}

impl<T: DeserializeOwned> ApiReply<T> {
    /// Parses the body of a successful response.
    ///
    /// A 2xx body that does not parse is an error; other statuses are kept
    /// as unsuccessful replies.
    fn from_response(response: RawResponse) -> ApiResult<Self> {
        if !response.is_success() {
            return Ok(Self::failed(response));
        }
        let data = serde_json::from_str(&response.body).map_err(|e| {
            ApiError::invalid_response(format!("failed to parse response: {}", e)).with_source(e)
        })?;
        Ok(Self {
            response,
            data: Some(data),
        })
    }
}

impl<T> ApiReply<T> {
    fn failed(response: RawResponse) -> Self {
        Self {
            response,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.response.is_success()
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// Parameters of an `events.list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub calendar_id: String,
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub max_results: u32,
    /// IANA zone for the times in the answer; calendar zone when `None`.
    pub time_zone: Option<String>,
}

impl EventQuery {
    pub fn new(calendar_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min: window.start,
            time_max: window.end,
            max_results: DEFAULT_EVENT_PAGE_SIZE,
            time_zone: None,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }
}

/// Resources that can be searched by a text field.
trait Lookup {
    fn field(&self, field: LookupField) -> Option<&str>;
    fn id(&self) -> Option<&str>;
}

impl Lookup for CalendarListEntry {
    fn field(&self, field: LookupField) -> Option<&str> {
        match field {
            LookupField::Summary => self.summary.as_deref(),
            LookupField::Description => self.description.as_deref(),
            LookupField::Location => self.location.as_deref(),
        }
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Lookup for Event {
    fn field(&self, field: LookupField) -> Option<&str> {
        match field {
            LookupField::Summary => self.summary.as_deref(),
            LookupField::Description => self.description.as_deref(),
            LookupField::Location => self.location.as_deref(),
        }
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Id of the first item whose `field` equals `value`.
fn first_id<T: Lookup>(items: &[T], field: LookupField, value: &str) -> Option<String> {
    items
        .iter()
        .find(|item| item.field(field) == Some(value))
        .and_then(Lookup::id)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

/// Id of the last item whose `field` equals `value`.
fn last_id<T: Lookup>(items: &[T], field: LookupField, value: &str) -> Option<String> {
    items
        .iter()
        .rev()
        .find(|item| item.field(field) == Some(value))
        .and_then(Lookup::id)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

fn encode(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

fn to_json<T: Serialize>(value: &T) -> ApiResult<String> {
    serde_json::to_string(value).map_err(|e| {
        ApiError::internal(format!("failed to serialize request body: {}", e)).with_source(e)
    })
}

/// Google Calendar API client.
///
/// Cheap to clone; clones share the transport and the credential.
#[derive(Clone)]
pub struct CalendarClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    refresher: TokenRefresher,
}

impl std::fmt::Debug for CalendarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarClient")
            .field("base_url", &self.base_url)
            .field("refresher", &self.refresher)
            .finish_non_exhaustive()
    }
}

impl CalendarClient {
    /// Creates a client that refreshes through an [`OAuthClient`] built
    /// from the same configuration and sharing its HTTP transport.
    pub fn new(config: &GoogleConfig, credentials: CredentialStore) -> ApiResult<Self> {
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(config.timeout, &config.user_agent)?);
        let oauth = OAuthClient::with_transport(
            config.credentials.clone(),
            config.endpoints.clone(),
            Arc::clone(&transport),
        );
        let refresher = TokenRefresher::new(credentials, Arc::new(oauth));
        Ok(Self::with_parts(&config.endpoints.calendar, transport, refresher))
    }

    pub fn with_parts(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
        refresher: TokenRefresher,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            refresher,
        }
    }

    /// The credential this client authenticates with.
    pub fn credentials(&self) -> &CredentialStore {
        self.refresher.credentials()
    }

    /// Sends `request` with the current bearer token, through the refresh
    /// wrapper.
    async fn send(&self, request: HttpRequest, force_access_token: bool) -> ApiResult<RawResponse> {
        let transport = Arc::clone(&self.transport);
        self.refresher
            .call(force_access_token, move |token| {
                let transport = Arc::clone(&transport);
                let request = request.clone().with_bearer(token);
                async move { transport.send(request).await }
            })
            .await
    }

    /// GETs `uri` with query pairs, through the refresh wrapper.
    async fn get_with_query(
        &self,
        uri: String,
        params: Vec<Option<String>>,
        force_access_token: bool,
    ) -> ApiResult<RawResponse> {
        let transport = Arc::clone(&self.transport);
        self.refresher
            .call(force_access_token, move |token| {
                let transport = Arc::clone(&transport);
                let uri = uri.clone();
                let params = params.clone();
                async move {
                    get_with_query_strings(transport.as_ref(), &uri, &params, Some(token.as_str())).await
                }
            })
            .await
    }

    // Calendars

    /// Lists the user's calendars (`calendarList.list`).
    pub async fn list_calendars(
        &self,
        max_results: u32,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<CalendarList>> {
        debug!(max_results, "listing calendars");
        let uri = format!("{}/users/me/calendarList", self.base_url);
        let response = self
            .get_with_query(
                uri,
                vec![Some("maxResults".to_string()), Some(max_results.to_string())],
                force_access_token,
            )
            .await?;
        ApiReply::from_response(response)
    }

    /// Gets one entry of the user's calendar list.
    pub async fn get_calendar(
        &self,
        calendar_id: &str,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<CalendarListEntry>> {
        debug!(calendar_id, "getting calendar");
        let url = format!("{}/users/me/calendarList/{}", self.base_url, encode(calendar_id));
        let response = self.send(HttpRequest::get(url), force_access_token).await?;
        ApiReply::from_response(response)
    }

    /// Gets the first calendar whose summary equals `summary`.
    ///
    /// Returns `None` when no calendar matches. If listing fails, that
    /// unsuccessful reply is returned.
    pub async fn calendar_by_summary(
        &self,
        summary: &str,
        force_access_token: bool,
    ) -> ApiResult<Option<ApiReply<CalendarListEntry>>> {
        let list = self
            .list_calendars(DEFAULT_CALENDAR_PAGE_SIZE, force_access_token)
            .await?;
        let Some(calendars) = list.data else {
            return Ok(Some(ApiReply::failed(list.response)));
        };

        match first_id(&calendars.items, LookupField::Summary, summary) {
            Some(id) => self.get_calendar(&id, force_access_token).await.map(Some),
            None => Ok(None),
        }
    }

    /// Creates a secondary calendar (`calendars.insert`).
    pub async fn insert_calendar(
        &self,
        calendar: &CalendarListEntry,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<Calendar>> {
        debug!("inserting calendar");
        let url = format!("{}/calendars", self.base_url);
        let request = HttpRequest::post(url).with_json(to_json(calendar)?);
        let response = self.send(request, force_access_token).await?;
        ApiReply::from_response(response)
    }

    /// Replaces a calendar's metadata (`calendars.update`).
    pub async fn update_calendar(
        &self,
        calendar_id: &str,
        calendar: &CalendarListEntry,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<Calendar>> {
        debug!(calendar_id, "updating calendar");
        let url = format!("{}/calendars/{}", self.base_url, encode(calendar_id));
        let request = HttpRequest::put(url).with_json(to_json(calendar)?);
        let response = self.send(request, force_access_token).await?;
        ApiReply::from_response(response)
    }

    /// Deletes a secondary calendar. Google answers 204 with no body.
    pub async fn delete_calendar(
        &self,
        calendar_id: &str,
        force_access_token: bool,
    ) -> ApiResult<RawResponse> {
        debug!(calendar_id, "deleting calendar");
        let url = format!("{}/calendars/{}", self.base_url, encode(calendar_id));
        self.send(HttpRequest::delete(url), force_access_token).await
    }

    /// Deletes every event of a primary calendar (`calendars.clear`).
    pub async fn clear_calendar(
        &self,
        calendar_id: &str,
        force_access_token: bool,
    ) -> ApiResult<RawResponse> {
        debug!(calendar_id, "clearing calendar");
        let url = format!("{}/calendars/{}/clear", self.base_url, encode(calendar_id));
        self.send(HttpRequest::post(url), force_access_token).await
    }

    // Events

    /// Lists events in a time window (`events.list`).
    pub async fn list_events(
        &self,
        query: &EventQuery,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<EventList>> {
        debug!(calendar_id = %query.calendar_id, "listing events");
        let uri = format!("{}/calendars/{}/events", self.base_url, encode(&query.calendar_id));
        let params = vec![
            Some("maxResults".to_string()),
            Some(query.max_results.to_string()),
            Some("timeMin".to_string()),
            Some(format_google_datetime(&query.time_min)),
            Some("timeMax".to_string()),
            Some(format_google_datetime(&query.time_max)),
            Some("timeZone".to_string()),
            query.time_zone.clone(),
        ];
        let response = self.get_with_query(uri, params, force_access_token).await?;
        ApiReply::from_response(response)
    }

    pub async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<Event>> {
        debug!(calendar_id, event_id, "getting event");
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            encode(calendar_id),
            encode(event_id)
        );
        let response = self.send(HttpRequest::get(url), force_access_token).await?;
        ApiReply::from_response(response)
    }

    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &Event,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<Event>> {
        debug!(calendar_id, "inserting event");
        let url = format!("{}/calendars/{}/events", self.base_url, encode(calendar_id));
        let request = HttpRequest::post(url).with_json(to_json(event)?);
        let response = self.send(request, force_access_token).await?;
        ApiReply::from_response(response)
    }

    /// Replaces an event (`events.update`). Fields left unset are cleared.
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
        force_access_token: bool,
    ) -> ApiResult<ApiReply<Event>> {
        debug!(calendar_id, event_id, "updating event");
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            encode(calendar_id),
            encode(event_id)
        );
        let request = HttpRequest::put(url).with_json(to_json(event)?);
        let response = self.send(request, force_access_token).await?;
        ApiReply::from_response(response)
    }

    pub async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        force_access_token: bool,
    ) -> ApiResult<RawResponse> {
        debug!(calendar_id, event_id, "deleting event");
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            encode(calendar_id),
            encode(event_id)
        );
        self.send(HttpRequest::delete(url), force_access_token).await
    }

    /// Gets the last event in the window whose summary equals `summary`.
    pub async fn event_by_summary(
        &self,
        summary: &str,
        query: &EventQuery,
        force_access_token: bool,
    ) -> ApiResult<Option<ApiReply<Event>>> {
        self.event_by_field(LookupField::Summary, summary, query, force_access_token)
            .await
    }

    /// Like [`CalendarClient::event_by_summary`], searching a list the
    /// caller already fetched.
    pub async fn event_by_summary_in(
        &self,
        summary: &str,
        events: &EventList,
        calendar_id: &str,
        force_access_token: bool,
    ) -> ApiResult<Option<ApiReply<Event>>> {
        self.event_in(LookupField::Summary, summary, events, calendar_id, force_access_token)
            .await
    }

    /// Gets the last event in the window whose description equals
    /// `description`.
    pub async fn event_by_description(
        &self,
        description: &str,
        query: &EventQuery,
        force_access_token: bool,
    ) -> ApiResult<Option<ApiReply<Event>>> {
        self.event_by_field(LookupField::Description, description, query, force_access_token)
            .await
    }

    pub async fn event_by_description_in(
        &self,
        description: &str,
        events: &EventList,
        calendar_id: &str,
        force_access_token: bool,
    ) -> ApiResult<Option<ApiReply<Event>>> {
        self.event_in(
            LookupField::Description,
            description,
            events,
            calendar_id,
            force_access_token,
        )
        .await
    }

    async fn event_by_field(
        &self,
        field: LookupField,
        value: &str,
        query: &EventQuery,
        force_access_token: bool,
    ) -> ApiResult<Option<ApiReply<Event>>> {
        let list = self.list_events(query, force_access_token).await?;
        let Some(events) = list.data else {
            return Ok(Some(ApiReply::failed(list.response)));
        };
        self.event_in(field, value, &events, &query.calendar_id, force_access_token)
            .await
    }

    async fn event_in(
        &self,
        field: LookupField,
        value: &str,
        events: &EventList,
        calendar_id: &str,
        force_access_token: bool,
    ) -> ApiResult<Option<ApiReply<Event>>> {
        match last_id(&events.items, field, value) {
            Some(id) => self
                .get_event(calendar_id, &id, force_access_token)
                .await
                .map(Some),
            None => {
                debug!(%field, "no matching event");
                Ok(None)
            }
        }
    }

    // Lookups

    /// Id of the first calendar whose `field` equals `value`.
    ///
    /// `None` when nothing matches or the list could not be fetched.
    pub async fn find_calendar_id(
        &self,
        field: LookupField,
        value: &str,
        force_access_token: bool,
    ) -> ApiResult<Option<String>> {
        let list = self
            .list_calendars(DEFAULT_CALENDAR_PAGE_SIZE, force_access_token)
            .await?;
        Ok(list
            .data
            .and_then(|calendars| first_id(&calendars.items, field, value)))
    }

    /// The user's primary calendar, if the list has one.
    pub async fn find_primary_calendar(
        &self,
        force_access_token: bool,
    ) -> ApiResult<Option<CalendarListEntry>> {
        let list = self
            .list_calendars(DEFAULT_CALENDAR_PAGE_SIZE, force_access_token)
            .await?;
        Ok(list
            .data
            .and_then(|calendars| calendars.items.into_iter().find(CalendarListEntry::is_primary)))
    }

    /// Id of the first event in the window whose `field` equals `value`.
    pub async fn find_event_id(
        &self,
        field: LookupField,
        value: &str,
        query: &EventQuery,
        force_access_token: bool,
    ) -> ApiResult<Option<String>> {
        let list = self.list_events(query, force_access_token).await?;
        Ok(list
            .data
            .and_then(|events| first_id(&events.items, field, value)))
    }
}
