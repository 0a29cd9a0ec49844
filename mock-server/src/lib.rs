//! In-memory stand-in for the iCloud Bridge server.
//!
//! Serves the same routes, status codes and JSON shapes as the real bridge
//! from a seeded `Library`. Full-resolution images can be configured to stay
//! "downloading" (202 + `Retry-After`) for a number of polls, and a bearer
//! token can be required on every route.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListRecord {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub reminder_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecord {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_completed: bool,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
    pub list_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRecord {
    pub id: String,
    pub title: String,
    pub album_type: String,
    pub photo_count: usize,
    pub video_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: String,
    pub album_id: String,
    pub media_type: String,
    pub creation_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
    pub width: u32,
    pub height: u32,
    pub is_favorite: bool,
    pub is_hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhotoPageBody {
    pub photos: Vec<PhotoRecord>,
    pub total: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminder {
    pub title: String,
    pub notes: Option<String>,
    pub priority: Option<u8>,
    pub due_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminder {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub is_completed: Option<bool>,
    pub priority: Option<u8>,
    pub due_date: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReminderParams {
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Deserialize)]
pub struct PhotoParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

#[derive(Deserialize)]
pub struct ThumbnailParams {
    pub size: Option<String>,
}

#[derive(Deserialize)]
pub struct ImageParams {
    #[serde(default)]
    pub wait: bool,
}

/// Everything the server knows, plus knobs for the image download simulation.
#[derive(Clone, Debug, Default)]
pub struct Library {
    pub lists: Vec<ListRecord>,
    pub reminders: Vec<ReminderRecord>,
    pub albums: Vec<AlbumRecord>,
    pub photos: Vec<PhotoRecord>,
    /// Remaining 202 replies per photo id before `/image` returns bytes.
    pub pending_polls: HashMap<String, u32>,
    /// Seconds advertised in `Retry-After` while an image is pending.
    pub retry_after_secs: u64,
    /// Bearer token every request must carry, if set.
    pub token: Option<String>,
}

pub const PHOTO_ALBUM_ID: &str = "album-camera-roll";
pub const EMPTY_ALBUM_ID: &str = "album-empty";
pub const INBOX_LIST_ID: &str = "list-inbox";
pub const SAMPLE_PHOTO_COUNT: usize = 250;

impl Library {
    /// Two reminder lists, a 250-item album of mixed media and an empty album.
    pub fn sample() -> Self {
        let lists = vec![
            ListRecord {
                id: INBOX_LIST_ID.to_string(),
                title: "Inbox".to_string(),
                color: Some("#FF6B6B".to_string()),
                reminder_count: 0,
            },
            ListRecord {
                id: "list-errands".to_string(),
                title: "Errands".to_string(),
                color: None,
                reminder_count: 0,
            },
        ];
        let reminders = vec![
            ReminderRecord {
                id: "rem-1".to_string(),
                title: "Renew passport".to_string(),
                notes: Some("Bring two photos".to_string()),
                is_completed: false,
                priority: 1,
                due_date: Some("2024-09-01T09:00:00Z".to_string()),
                completion_date: None,
                list_id: INBOX_LIST_ID.to_string(),
            },
            ReminderRecord {
                id: "rem-2".to_string(),
                title: "File taxes".to_string(),
                notes: None,
                is_completed: true,
                priority: 5,
                due_date: Some("2024-04-15T17:00:00.000+02:00".to_string()),
                completion_date: Some("2024-04-10T12:30:45.123456".to_string()),
                list_id: INBOX_LIST_ID.to_string(),
            },
        ];
        let photos: Vec<PhotoRecord> = (0..SAMPLE_PHOTO_COUNT)
            .map(|i| {
                let media_type = match i % 10 {
                    3 => "video",
                    7 => "livePhoto",
                    _ => "photo",
                };
                PhotoRecord {
                    id: format!("photo-{i:03}"),
                    album_id: PHOTO_ALBUM_ID.to_string(),
                    media_type: media_type.to_string(),
                    // Album order runs newest first so date sorting is observable.
                    creation_date: format!("2024-01-01T{:02}:{:02}:00Z", (249 - i) / 60, (249 - i) % 60),
                    modification_date: (i % 2 == 0).then(|| "2024-02-01T00:00:00Z".to_string()),
                    width: 4032,
                    height: 3024,
                    is_favorite: i % 25 == 0,
                    is_hidden: false,
                    filename: (i % 5 != 0).then(|| format!("IMG_{i:04}.HEIC")),
                    file_size: (i % 5 != 0).then(|| 2_000_000 + i as u64),
                }
            })
            .collect();
        let albums = vec![
            AlbumRecord {
                id: PHOTO_ALBUM_ID.to_string(),
                title: "Camera Roll".to_string(),
                album_type: "smart".to_string(),
                photo_count: photos.iter().filter(|p| p.media_type != "video").count(),
                video_count: photos.iter().filter(|p| p.media_type == "video").count(),
                start_date: Some("2024-01-01T00:00:00Z".to_string()),
                end_date: Some("2024-01-01T04:09:00Z".to_string()),
            },
            AlbumRecord {
                id: EMPTY_ALBUM_ID.to_string(),
                title: "Empty".to_string(),
                album_type: "user".to_string(),
                photo_count: 0,
                video_count: 0,
                start_date: None,
                end_date: None,
            },
        ];
        let mut library = Self {
            lists,
            reminders,
            albums,
            photos,
            pending_polls: HashMap::new(),
            retry_after_secs: 0,
            token: None,
        };
        library.recount();
        library
    }

    pub fn with_pending(mut self, photo_id: &str, polls: u32) -> Self {
        self.pending_polls.insert(photo_id.to_string(), polls);
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    fn recount(&mut self) {
        for list in &mut self.lists {
            list.reminder_count = self
                .reminders
                .iter()
                .filter(|r| r.list_id == list.id && !r.is_completed)
                .count();
        }
    }

    fn photo(&self, id: &str) -> Result<&PhotoRecord, ApiFailure> {
        self.photos
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiFailure::not_found("Photo not found"))
    }
}

pub type Db = Arc<RwLock<Library>>;

/// Error reply in the bridge's `{"error": true, "reason": ...}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    reason: String,
}

impl ApiFailure {
    fn new(status: StatusCode, reason: &str) -> Self {
        Self {
            status,
            reason: reason.to_string(),
        }
    }

    fn not_found(reason: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, reason)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": true, "reason": self.reason}))).into_response()
    }
}

pub fn app() -> Router {
    app_with(Library::sample())
}

pub fn app_with(library: Library) -> Router {
    let db: Db = Arc::new(RwLock::new(library));
    let api = Router::new()
        .route("/lists", get(list_lists))
        .route("/lists/{id}", get(get_list))
        .route("/lists/{id}/reminders", get(list_reminders).post(create_reminder))
        .route(
            "/reminders/{id}",
            get(get_reminder).put(update_reminder).delete(delete_reminder),
        )
        .route("/albums", get(list_albums))
        .route("/albums/{id}", get(get_album))
        .route("/albums/{id}/photos", get(list_photos))
        .route("/photos/{id}", get(get_photo))
        .route("/photos/{id}/thumbnail", get(get_thumbnail))
        .route("/photos/{id}/image", get(get_image))
        .route("/photos/{id}/video", get(get_video))
        .route("/photos/{id}/live-video", get(get_live_video));
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(db.clone(), require_token))
        .with_state(db)
}

pub async fn run_with(listener: TcpListener, library: Library) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(library)).await
}

async fn require_token(State(db): State<Db>, request: Request, next: Next) -> Response {
    let expected = db.read().await.token.clone();
    tracing::debug!(method = %request.method(), uri = %request.uri(), "request");
    if let Some(token) = expected {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented != Some(token.as_str()) {
            return ApiFailure::new(StatusCode::UNAUTHORIZED, "Missing or invalid token").into_response();
        }
    }
    next.run(request).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn list_lists(State(db): State<Db>) -> Json<Vec<ListRecord>> {
    Json(db.read().await.lists.clone())
}

async fn get_list(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<ListRecord>, ApiFailure> {
    let library = db.read().await;
    library
        .lists
        .iter()
        .find(|l| l.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("List not found"))
}

async fn list_reminders(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<ReminderParams>,
) -> Result<Json<Vec<ReminderRecord>>, ApiFailure> {
    let library = db.read().await;
    if !library.lists.iter().any(|l| l.id == id) {
        return Err(ApiFailure::not_found("List not found"));
    }
    let reminders = library
        .reminders
        .iter()
        .filter(|r| r.list_id == id && (params.include_completed || !r.is_completed))
        .cloned()
        .collect();
    Ok(Json(reminders))
}

async fn create_reminder(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<CreateReminder>,
) -> Result<Json<ReminderRecord>, ApiFailure> {
    let mut library = db.write().await;
    if !library.lists.iter().any(|l| l.id == id) {
        return Err(ApiFailure::not_found("List not found"));
    }
    let reminder = ReminderRecord {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        notes: input.notes,
        is_completed: false,
        priority: input.priority.unwrap_or(0),
        due_date: input.due_date,
        completion_date: None,
        list_id: id,
    };
    library.reminders.push(reminder.clone());
    library.recount();
    Ok(Json(reminder))
}

async fn get_reminder(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<ReminderRecord>, ApiFailure> {
    let library = db.read().await;
    library
        .reminders
        .iter()
        .find(|r| r.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("Reminder not found"))
}

async fn update_reminder(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateReminder>,
) -> Result<Json<ReminderRecord>, ApiFailure> {
    let mut library = db.write().await;
    let reminder = library
        .reminders
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| ApiFailure::not_found("Reminder not found"))?;
    if input.priority.is_some_and(|priority| priority > 9) {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Priority must be between 0 and 9"));
    }
    if let Some(title) = input.title {
        reminder.title = title;
    }
    if let Some(notes) = input.notes {
        reminder.notes = Some(notes);
    }
    if let Some(priority) = input.priority {
        reminder.priority = priority;
    }
    if let Some(due_date) = input.due_date {
        reminder.due_date = Some(due_date);
    }
    if let Some(completed) = input.is_completed {
        if completed && !reminder.is_completed {
            reminder.completion_date = Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string());
        } else if !completed {
            reminder.completion_date = None;
        }
        reminder.is_completed = completed;
    }
    let updated = reminder.clone();
    library.recount();
    Ok(Json(updated))
}

async fn delete_reminder(State(db): State<Db>, Path(id): Path<String>) -> Result<StatusCode, ApiFailure> {
    let mut library = db.write().await;
    let before = library.reminders.len();
    library.reminders.retain(|r| r.id != id);
    if library.reminders.len() == before {
        return Err(ApiFailure::not_found("Reminder not found"));
    }
    library.recount();
    Ok(StatusCode::NO_CONTENT)
}

async fn list_albums(State(db): State<Db>) -> Json<Vec<AlbumRecord>> {
    Json(db.read().await.albums.clone())
}

async fn get_album(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<AlbumRecord>, ApiFailure> {
    let library = db.read().await;
    library
        .albums
        .iter()
        .find(|a| a.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("Album not found"))
}

async fn list_photos(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<PhotoParams>,
) -> Result<Json<PhotoPageBody>, ApiFailure> {
    let library = db.read().await;
    if !library.albums.iter().any(|a| a.id == id) {
        return Err(ApiFailure::not_found("Album not found"));
    }
    let wanted = match params.media_type.as_deref() {
        None | Some("all") => None,
        Some("photo") => Some("photo"),
        Some("video") => Some("video"),
        Some("live") => Some("livePhoto"),
        Some(_) => return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Invalid type filter")),
    };
    let mut photos: Vec<PhotoRecord> = library
        .photos
        .iter()
        .filter(|p| p.album_id == id && wanted.map_or(true, |kind| p.media_type == kind))
        .cloned()
        .collect();
    match params.sort.as_deref() {
        None | Some("album") => {}
        Some("date-asc") => photos.sort_by(|a, b| a.creation_date.cmp(&b.creation_date)),
        Some("date-desc") => photos.sort_by(|a, b| b.creation_date.cmp(&a.creation_date)),
        Some(_) => return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Invalid sort order")),
    }
    let total = photos.len();
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);
    let page = photos.into_iter().skip(offset).take(limit).collect();
    Ok(Json(PhotoPageBody { photos: page, total }))
}

async fn get_photo(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<PhotoRecord>, ApiFailure> {
    let library = db.read().await;
    library.photo(&id).cloned().map(Json)
}

fn binary(content_type: &'static str, body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Deterministic fake payload so tests can tell assets apart.
pub fn asset_bytes(kind: &str, photo_id: &str) -> Vec<u8> {
    format!("{kind}:{photo_id}").into_bytes()
}

async fn get_thumbnail(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<ThumbnailParams>,
) -> Result<Response, ApiFailure> {
    let library = db.read().await;
    library.photo(&id)?;
    let size = match params.size.as_deref() {
        None | Some("medium") => "medium",
        Some("small") => "small",
        Some(_) => return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Invalid thumbnail size")),
    };
    Ok(binary("image/jpeg", asset_bytes(&format!("thumbnail-{size}"), &id)))
}

async fn get_image(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<ImageParams>,
) -> Result<Response, ApiFailure> {
    let mut library = db.write().await;
    library.photo(&id)?;
    let retry_after = library.retry_after_secs;
    if let Some(remaining) = library.pending_polls.get_mut(&id) {
        if params.wait {
            *remaining = 0;
        } else if *remaining > 0 {
            *remaining -= 1;
            tracing::debug!(photo = %id, remaining = *remaining, "image still downloading");
            let mut response = (StatusCode::ACCEPTED, Json(json!({"status": "downloading"}))).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            return Ok(response);
        }
    }
    Ok(binary("image/jpeg", asset_bytes("image", &id)))
}

async fn get_video(State(db): State<Db>, Path(id): Path<String>) -> Result<Response, ApiFailure> {
    let library = db.read().await;
    let photo = library.photo(&id)?;
    if photo.media_type == "photo" {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Photo is not a video"));
    }
    Ok(binary("video/quicktime", asset_bytes("video", &id)))
}

async fn get_live_video(State(db): State<Db>, Path(id): Path<String>) -> Result<Response, ApiFailure> {
    let library = db.read().await;
    let photo = library.photo(&id)?;
    if photo.media_type != "livePhoto" {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Photo is not a Live Photo"));
    }
    Ok(binary("video/quicktime", asset_bytes("live-video", &id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_match_contents() {
        let library = Library::sample();
        assert_eq!(library.photos.len(), SAMPLE_PHOTO_COUNT);
        let album = &library.albums[0];
        assert_eq!(album.photo_count + album.video_count, SAMPLE_PHOTO_COUNT);
        assert_eq!(library.lists[0].reminder_count, 1);
        assert_eq!(library.lists[1].reminder_count, 0);
    }

    #[test]
    fn records_omit_unset_fields() {
        let library = Library::sample();
        let json = serde_json::to_value(&library.lists[1]).unwrap();
        assert!(json.get("color").is_none());
        assert_eq!(json["reminderCount"], 0);
    }

    #[test]
    fn photo_records_use_wire_names() {
        let library = Library::sample();
        let json = serde_json::to_value(&library.photos[1]).unwrap();
        assert_eq!(json["albumId"], PHOTO_ALBUM_ID);
        assert_eq!(json["mediaType"], "photo");
        assert_eq!(json["filename"], "IMG_0001.HEIC");
        assert!(json.get("modificationDate").is_none());
    }

    #[test]
    fn create_reminder_accepts_title_only() {
        let input: CreateReminder = serde_json::from_str(r#"{"title":"Buy milk"}"#).unwrap();
        assert_eq!(input.title, "Buy milk");
        assert!(input.priority.is_none());
        assert!(input.due_date.is_none());
    }

    #[test]
    fn update_reminder_all_fields_optional() {
        let input: UpdateReminder = serde_json::from_str("{}").unwrap();
        assert!(input.title.is_none());
        assert!(input.is_completed.is_none());
    }
}
