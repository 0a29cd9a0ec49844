//! Domain records and request payloads for the iCloud Bridge API.
//!
//! # Design
//! Records are plain data snapshots of what the server returned. They carry
//! no reference back to a client: the convenience methods in `client.rs`
//! take the client as an explicit argument and return fresh snapshots.
//! Field names follow Rust conventions; the camelCase wire names are handled
//! by serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mapping::{iso8601, iso8601_opt};

/// A Reminders list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderList {
    pub id: String,
    pub title: String,
    /// Hex color such as `#FF6B6B`.
    #[serde(default)]
    pub color: Option<String>,
    /// Number of incomplete reminders in the list.
    pub reminder_count: u32,
}

/// A single reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub is_completed: bool,
    /// Raw priority: 0 none, 1 high, 5 medium, 9 low. See [`Priority`].
    pub priority: u8,
    #[serde(default, with = "iso8601_opt")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, with = "iso8601_opt")]
    pub completion_date: Option<DateTime<Utc>>,
    pub list_id: String,
}

impl Reminder {
    pub fn priority_level(&self) -> Priority {
        Priority::from_raw(self.priority)
    }
}

/// Reminder priority bands as Reminders defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    None,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Priority::None,
            1..=4 => Priority::High,
            5 => Priority::Medium,
            _ => Priority::Low,
        }
    }

    /// The canonical raw value the server uses for this band.
    pub fn raw(self) -> u8 {
        match self {
            Priority::None => 0,
            Priority::High => 1,
            Priority::Medium => 5,
            Priority::Low => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumKind {
    User,
    Smart,
    Shared,
}

/// A photo album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    #[serde(rename = "albumType")]
    pub kind: AlbumKind,
    pub photo_count: u32,
    pub video_count: u32,
    /// Date of the earliest item in the album.
    #[serde(default, with = "iso8601_opt")]
    pub start_date: Option<DateTime<Utc>>,
    /// Date of the latest item in the album.
    #[serde(default, with = "iso8601_opt")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Photo,
    Video,
    LivePhoto,
}

/// A photo or video. Binary payloads are fetched on demand and never stored
/// on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub album_id: String,
    #[serde(rename = "mediaType")]
    pub kind: MediaKind,
    #[serde(with = "iso8601")]
    pub creation_date: DateTime<Utc>,
    #[serde(default, with = "iso8601_opt")]
    pub modification_date: Option<DateTime<Utc>>,
    pub width: u32,
    pub height: u32,
    pub is_favorite: bool,
    pub is_hidden: bool,
    #[serde(default)]
    pub filename: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl Photo {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_live_photo(&self) -> bool {
        self.kind == MediaKind::LivePhoto
    }
}

/// One page of an album listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoPage {
    pub photos: Vec<Photo>,
    /// Size of the whole filtered collection, not of this page.
    pub total: usize,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Payload for creating a reminder. Unset fields are left to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", with = "iso8601_opt")]
    pub due_date: Option<DateTime<Utc>>,
}

impl NewReminder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Payload for updating a reminder. Only the fields that are set are sent;
/// omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", with = "iso8601_opt")]
    pub due_date: Option<DateTime<Utc>>,
}

impl ReminderUpdate {
    pub fn completed(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            ..Self::default()
        }
    }
}

/// Sort order for album listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhotoSort {
    /// The album's own order.
    #[default]
    Album,
    DateAsc,
    DateDesc,
}

impl PhotoSort {
    pub fn as_query(self) -> &'static str {
        match self {
            PhotoSort::Album => "album",
            PhotoSort::DateAsc => "date-asc",
            PhotoSort::DateDesc => "date-desc",
        }
    }
}

/// Media filter for album listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFilter {
    Photo,
    Video,
    Live,
    All,
}

impl MediaFilter {
    pub fn as_query(self) -> &'static str {
        match self {
            MediaFilter::Photo => "photo",
            MediaFilter::Video => "video",
            MediaFilter::Live => "live",
            MediaFilter::All => "all",
        }
    }
}

/// Paging and filtering for a single album-listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoQuery {
    pub limit: usize,
    pub offset: usize,
    pub sort: PhotoSort,
    pub filter: Option<MediaFilter>,
}

impl Default for PhotoQuery {
    fn default() -> Self {
        Self {
            limit: crate::paginate::DEFAULT_PAGE_SIZE,
            offset: 0,
            sort: PhotoSort::Album,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThumbnailSize {
    /// 200px on the long edge.
    Small,
    /// 800px on the long edge.
    #[default]
    Medium,
}

impl ThumbnailSize {
    pub fn as_query(self) -> &'static str {
        match self {
            ThumbnailSize::Small => "small",
            ThumbnailSize::Medium => "medium",
        }
    }
}
