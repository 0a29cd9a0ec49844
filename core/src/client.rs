//! Request builder, response parser and executing client for the bridge API.
//!
//! # Design
//! `BridgeClient` holds only immutable configuration plus its transport.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` function that consumes an `HttpResponse`;
//! the executing methods just glue the two together through
//! `Transport::send`. The split keeps URL, header and status handling
//! testable without a network.
//!
//! Records never hold a client. The convenience methods at the bottom of
//! this file take the client as an argument and return fresh snapshots.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use ureq::http::StatusCode;
use url::Url;

use crate::asset::{AssetKind, ImageOptions, Sleeper, ThreadSleeper};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::mapping::{map_record, map_records};
use crate::paginate::{Page, Paginator, DEFAULT_PAGE_SIZE};
use crate::transport::UreqTransport;
use crate::types::{
    Album, HealthStatus, MediaFilter, MediaKind, NewReminder, Photo, PhotoPage, PhotoQuery, PhotoSort,
    Reminder, ReminderList, ReminderUpdate, ThumbnailSize,
};

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Synchronous client for the iCloud Bridge REST API.
#[derive(Debug, Clone)]
pub struct BridgeClient<T = UreqTransport, S = ThreadSleeper> {
    pub(crate) config: BridgeConfig,
    pub(crate) transport: T,
    pub(crate) sleeper: S,
}

impl BridgeClient {
    /// Client over the default ureq transport, honoring the configured
    /// request timeout.
    pub fn new(config: BridgeConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> BridgeClient<T> {
    pub fn with_transport(config: BridgeConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            sleeper: ThreadSleeper,
        }
    }
}

impl<T: Transport, S: Sleeper> BridgeClient<T, S> {
    /// Replace the sleeper used between image polls.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> BridgeClient<T, S2> {
        BridgeClient {
            config: self.config,
            transport: self.transport,
            sleeper,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    /// `GET /health`, outside the versioned API prefix.
    pub fn build_health(&self) -> HttpRequest {
        let url = self.url(&["health"], &[]);
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_lists(&self) -> HttpRequest {
        self.api_get(&["lists"], &[])
    }

    pub fn build_list(&self, list_id: &str) -> HttpRequest {
        self.api_get(&["lists", list_id], &[])
    }

    pub fn build_reminders(&self, list_id: &str, include_completed: bool) -> HttpRequest {
        let query = if include_completed {
            vec![("includeCompleted", "true".to_string())]
        } else {
            Vec::new()
        };
        self.api_get(&["lists", list_id, "reminders"], &query)
    }

    pub fn build_reminder(&self, reminder_id: &str) -> HttpRequest {
        self.api_get(&["reminders", reminder_id], &[])
    }

    pub fn build_create_reminder(
        &self,
        list_id: &str,
        input: &NewReminder,
    ) -> Result<HttpRequest, BridgeError> {
        let url = self.api_url(&["lists", list_id, "reminders"], &[]);
        Ok(self.request(HttpMethod::Post, url, Some(to_json(input)?)))
    }

    pub fn build_update_reminder(
        &self,
        reminder_id: &str,
        input: &ReminderUpdate,
    ) -> Result<HttpRequest, BridgeError> {
        let url = self.api_url(&["reminders", reminder_id], &[]);
        Ok(self.request(HttpMethod::Put, url, Some(to_json(input)?)))
    }

    pub fn build_delete_reminder(&self, reminder_id: &str) -> HttpRequest {
        let url = self.api_url(&["reminders", reminder_id], &[]);
        self.request(HttpMethod::Delete, url, None)
    }

    pub fn build_albums(&self) -> HttpRequest {
        self.api_get(&["albums"], &[])
    }

    pub fn build_album(&self, album_id: &str) -> HttpRequest {
        self.api_get(&["albums", album_id], &[])
    }

    /// `limit` and `offset` are always sent; `sort` and `type` only when
    /// they differ from the server default.
    pub fn build_photo_page(&self, album_id: &str, query: &PhotoQuery) -> HttpRequest {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if query.sort != PhotoSort::Album {
            params.push(("sort", query.sort.as_query().to_string()));
        }
        if let Some(filter) = query.filter {
            params.push(("type", filter.as_query().to_string()));
        }
        self.api_get(&["albums", album_id, "photos"], &params)
    }

    pub fn build_photo(&self, photo_id: &str) -> HttpRequest {
        self.api_get(&["photos", photo_id], &[])
    }

    /// Request for a binary asset. `wait` only applies to the full image.
    pub fn build_asset(&self, photo_id: &str, kind: AssetKind, wait: bool) -> HttpRequest {
        let mut params = Vec::new();
        match kind {
            AssetKind::ThumbnailSmall => params.push(("size", ThumbnailSize::Small.as_query().to_string())),
            AssetKind::FullImage if wait => params.push(("wait", "true".to_string())),
            _ => {}
        }
        self.api_get(&["photos", photo_id, kind.path_segment()], &params)
    }

    fn api_get(&self, segments: &[&str], query: &[(&str, String)]) -> HttpRequest {
        let url = self.api_url(segments, query);
        self.request(HttpMethod::Get, url, None)
    }

    fn api_url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let full: Vec<&str> = API_PREFIX.iter().copied().chain(segments.iter().copied()).collect();
        self.url(&full, query)
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.config.base_url().clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        url
    }

    fn request(&self, method: HttpMethod, url: Url, body: Option<String>) -> HttpRequest {
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = self.config.token() {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        }
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    pub(crate) fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, BridgeError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self.transport.send(request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }

    pub fn health(&self) -> Result<HealthStatus, BridgeError> {
        let request = self.build_health();
        parse_record(&request, self.execute(&request)?)
    }

    pub fn lists(&self) -> Result<Vec<ReminderList>, BridgeError> {
        let request = self.build_lists();
        parse_records(&request, self.execute(&request)?)
    }

    pub fn list(&self, list_id: &str) -> Result<ReminderList, BridgeError> {
        let request = self.build_list(list_id);
        parse_record(&request, self.execute(&request)?)
    }

    /// Reminders in a list; only incomplete ones unless `include_completed`.
    /// The endpoint is not paginated.
    pub fn reminders(&self, list_id: &str, include_completed: bool) -> Result<Vec<Reminder>, BridgeError> {
        let request = self.build_reminders(list_id, include_completed);
        parse_records(&request, self.execute(&request)?)
    }

    pub fn reminder(&self, reminder_id: &str) -> Result<Reminder, BridgeError> {
        let request = self.build_reminder(reminder_id);
        parse_record(&request, self.execute(&request)?)
    }

    pub fn create_reminder(&self, list_id: &str, input: &NewReminder) -> Result<Reminder, BridgeError> {
        let request = self.build_create_reminder(list_id, input)?;
        parse_record(&request, self.execute(&request)?)
    }

    pub fn update_reminder(&self, reminder_id: &str, input: &ReminderUpdate) -> Result<Reminder, BridgeError> {
        let request = self.build_update_reminder(reminder_id, input)?;
        parse_record(&request, self.execute(&request)?)
    }

    pub fn delete_reminder(&self, reminder_id: &str) -> Result<(), BridgeError> {
        let request = self.build_delete_reminder(reminder_id);
        parse_empty(&request, self.execute(&request)?)
    }

    pub fn complete_reminder(&self, reminder_id: &str) -> Result<Reminder, BridgeError> {
        self.update_reminder(reminder_id, &ReminderUpdate::completed(true))
    }

    pub fn uncomplete_reminder(&self, reminder_id: &str) -> Result<Reminder, BridgeError> {
        self.update_reminder(reminder_id, &ReminderUpdate::completed(false))
    }

    pub fn albums(&self) -> Result<Vec<Album>, BridgeError> {
        let request = self.build_albums();
        parse_records(&request, self.execute(&request)?)
    }

    pub fn album(&self, album_id: &str) -> Result<Album, BridgeError> {
        let request = self.build_album(album_id);
        parse_record(&request, self.execute(&request)?)
    }

    /// One page of an album listing, with explicit paging control.
    pub fn photo_page(&self, album_id: &str, query: &PhotoQuery) -> Result<PhotoPage, BridgeError> {
        let request = self.build_photo_page(album_id, query);
        parse_record(&request, self.execute(&request)?)
    }

    /// Every photo in an album, fetched lazily 100 at a time.
    ///
    /// Each call starts a fresh walk from offset 0.
    pub fn photos<'a>(
        &'a self,
        album_id: &'a str,
        sort: PhotoSort,
        filter: Option<MediaFilter>,
    ) -> impl Iterator<Item = Result<Photo, BridgeError>> + 'a {
        Paginator::new(DEFAULT_PAGE_SIZE, move |offset, limit| {
            let query = PhotoQuery {
                limit,
                offset,
                sort,
                filter,
            };
            let page = self.photo_page(album_id, &query)?;
            Ok(Page {
                items: page.photos,
                total: page.total,
            })
        })
    }

    pub fn photo(&self, photo_id: &str) -> Result<Photo, BridgeError> {
        let request = self.build_photo(photo_id);
        parse_record(&request, self.execute(&request)?)
    }
}

fn to_json<B: Serialize>(body: &B) -> Result<String, BridgeError> {
    serde_json::to_string(body).map_err(|e| BridgeError::Client(format!("cannot encode request: {e}")))
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Map non-success statuses to `NotFound` or `Api`.
///
/// The reason comes from a JSON `{"reason": ...}` body when there is one,
/// otherwise from the status line.
pub fn check_status(request: &HttpRequest, response: &HttpResponse) -> Result<(), BridgeError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(BridgeError::NotFound(request_path(&request.url)));
    }
    Err(BridgeError::Api {
        status: response.status,
        reason: error_reason(response),
    })
}

fn error_reason(response: &HttpResponse) -> String {
    serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("reason").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| fallback_reason(response.status))
}

fn fallback_reason(status: u16) -> String {
    match StatusCode::from_u16(status).ok().and_then(|code| code.canonical_reason()) {
        Some(phrase) => format!("HTTP {status}: {phrase}"),
        None => format!("HTTP {status}"),
    }
}

fn request_path(url: &str) -> String {
    Url::parse(url)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

fn decode_body(response: &HttpResponse) -> Result<Value, BridgeError> {
    serde_json::from_slice(&response.body)
        .map_err(|e| BridgeError::Connection(format!("undecodable response body: {e}")))
}

pub fn parse_record<R: DeserializeOwned>(request: &HttpRequest, response: HttpResponse) -> Result<R, BridgeError> {
    check_status(request, &response)?;
    Ok(map_record(decode_body(&response)?)?)
}

pub fn parse_records<R: DeserializeOwned>(
    request: &HttpRequest,
    response: HttpResponse,
) -> Result<Vec<R>, BridgeError> {
    check_status(request, &response)?;
    Ok(map_records(decode_body(&response)?)?)
}

/// Success with no body (204), or any 2xx whose body is ignored.
pub fn parse_empty(request: &HttpRequest, response: HttpResponse) -> Result<(), BridgeError> {
    check_status(request, &response)
}

pub fn parse_bytes(request: &HttpRequest, response: HttpResponse) -> Result<Vec<u8>, BridgeError> {
    check_status(request, &response)?;
    Ok(response.body)
}

// ---------------------------------------------------------------------------
// Record conveniences
// ---------------------------------------------------------------------------

impl ReminderList {
    pub fn reminders<T: Transport, S: Sleeper>(
        &self,
        client: &BridgeClient<T, S>,
        include_completed: bool,
    ) -> Result<Vec<Reminder>, BridgeError> {
        client.reminders(&self.id, include_completed)
    }

    pub fn create_reminder<T: Transport, S: Sleeper>(
        &self,
        client: &BridgeClient<T, S>,
        input: &NewReminder,
    ) -> Result<Reminder, BridgeError> {
        client.create_reminder(&self.id, input)
    }
}

impl Reminder {
    /// Send this snapshot's title, notes, priority and due date back to the
    /// server and return the server's view of the result.
    pub fn save<T: Transport, S: Sleeper>(&self, client: &BridgeClient<T, S>) -> Result<Reminder, BridgeError> {
        let update = ReminderUpdate {
            title: Some(self.title.clone()),
            notes: self.notes.clone(),
            is_completed: None,
            priority: Some(self.priority),
            due_date: self.due_date,
        };
        client.update_reminder(&self.id, &update)
    }

    pub fn complete<T: Transport, S: Sleeper>(&self, client: &BridgeClient<T, S>) -> Result<Reminder, BridgeError> {
        client.complete_reminder(&self.id)
    }

    pub fn uncomplete<T: Transport, S: Sleeper>(&self, client: &BridgeClient<T, S>) -> Result<Reminder, BridgeError> {
        client.uncomplete_reminder(&self.id)
    }

    /// Consumes the snapshot: the id is no longer valid afterwards.
    pub fn delete<T: Transport, S: Sleeper>(self, client: &BridgeClient<T, S>) -> Result<(), BridgeError> {
        client.delete_reminder(&self.id)
    }
}

impl Album {
    pub fn photos<'a, T: Transport, S: Sleeper>(
        &'a self,
        client: &'a BridgeClient<T, S>,
    ) -> impl Iterator<Item = Result<Photo, BridgeError>> + 'a {
        client.photos(&self.id, PhotoSort::Album, None)
    }

    pub fn videos<'a, T: Transport, S: Sleeper>(
        &'a self,
        client: &'a BridgeClient<T, S>,
    ) -> impl Iterator<Item = Result<Photo, BridgeError>> + 'a {
        client.photos(&self.id, PhotoSort::Album, Some(MediaFilter::Video))
    }

    pub fn live_photos<'a, T: Transport, S: Sleeper>(
        &'a self,
        client: &'a BridgeClient<T, S>,
    ) -> impl Iterator<Item = Result<Photo, BridgeError>> + 'a {
        client.photos(&self.id, PhotoSort::Album, Some(MediaFilter::Live))
    }

    /// One page of this album, with explicit limit and offset.
    pub fn photo_page<T: Transport, S: Sleeper>(
        &self,
        client: &BridgeClient<T, S>,
        query: &PhotoQuery,
    ) -> Result<PhotoPage, BridgeError> {
        client.photo_page(&self.id, query)
    }
}

impl Photo {
    pub fn thumbnail<T: Transport, S: Sleeper>(
        &self,
        client: &BridgeClient<T, S>,
        size: ThumbnailSize,
    ) -> Result<Vec<u8>, BridgeError> {
        client.thumbnail(&self.id, size)
    }

    pub fn image<T: Transport, S: Sleeper>(
        &self,
        client: &BridgeClient<T, S>,
        options: &ImageOptions,
    ) -> Result<Vec<u8>, BridgeError> {
        client.image(&self.id, options)
    }

    /// The video file of a video, or the motion component of a Live Photo.
    pub fn video<T: Transport, S: Sleeper>(&self, client: &BridgeClient<T, S>) -> Result<Vec<u8>, BridgeError> {
        match self.kind {
            MediaKind::Video => client.video(&self.id),
            MediaKind::LivePhoto => client.live_video(&self.id),
            MediaKind::Photo => Err(BridgeError::Client(format!(
                "photo {} is a still image and has no video",
                self.id
            ))),
        }
    }
}
