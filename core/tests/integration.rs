//! End-to-end tests against the live mock server over real HTTP.
//!
//! # Design
//! Starts the mock server on a random port, then exercises the client
//! through the default ureq transport: reminder CRUD, auto-pagination across
//! a 250-item album, asset retrieval and image polling.

use icloud_bridge::{
    AlbumKind, BridgeClient, BridgeConfig, BridgeError, ImageOptions, MediaFilter, MediaKind,
    NewReminder, PhotoSort, Priority, ThumbnailSize,
};
use mock_server::{asset_bytes, Library, EMPTY_ALBUM_ID, INBOX_LIST_ID, PHOTO_ALBUM_ID, SAMPLE_PHOTO_COUNT};

/// Start the mock server on a random port and return its base URL.
fn start_server(library: Library) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, library).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn connect(library: Library) -> BridgeClient {
    BridgeClient::new(BridgeConfig::new(&start_server(library)).unwrap())
}

#[test]
fn health_reports_ok() {
    let client = connect(Library::sample());
    assert_eq!(client.health().unwrap().status, "ok");
}

#[test]
fn reminder_lifecycle() {
    let client = connect(Library::sample());

    // Step 1: lists and their incomplete counts.
    let lists = client.lists().unwrap();
    let inbox = lists.iter().find(|l| l.id == INBOX_LIST_ID).unwrap().clone();
    assert_eq!(inbox.reminder_count, 1);
    assert_eq!(inbox.color.as_deref(), Some("#FF6B6B"));
    let errands = lists.iter().find(|l| l.id != INBOX_LIST_ID).unwrap();
    assert_eq!(errands.color, None);

    // Step 2: completed reminders only show up when asked for.
    assert_eq!(inbox.reminders(&client, false).unwrap().len(), 1);
    let all = inbox.reminders(&client, true).unwrap();
    assert_eq!(all.len(), 2);
    let done = all.iter().find(|r| r.is_completed).unwrap();
    assert!(done.completion_date.is_some());
    assert_eq!(done.priority_level(), Priority::Medium);

    // Step 3: create.
    let due = icloud_bridge::parse_date("2024-12-24T18:00:00Z").unwrap();
    let input = NewReminder {
        title: "Buy milk".to_string(),
        notes: Some("2%".to_string()),
        priority: Some(Priority::High.raw()),
        due_date: Some(due),
    };
    let created = inbox.create_reminder(&client, &input).unwrap();
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.list_id, INBOX_LIST_ID);
    assert_eq!(created.due_date, Some(due));
    assert!(!created.is_completed);
    assert_eq!(client.list(INBOX_LIST_ID).unwrap().reminder_count, 2);

    // Step 4: edit the snapshot and save it back.
    let mut edited = created.clone();
    edited.title = "Buy oat milk".to_string();
    edited.priority = Priority::Low.raw();
    let saved = edited.save(&client).unwrap();
    assert_eq!(saved.title, "Buy oat milk");
    assert_eq!(saved.priority, 9);
    assert_eq!(saved.notes.as_deref(), Some("2%"));

    // Step 5: complete and uncomplete.
    let completed = saved.complete(&client).unwrap();
    assert!(completed.is_completed);
    assert!(completed.completion_date.is_some());
    let reopened = completed.uncomplete(&client).unwrap();
    assert!(!reopened.is_completed);
    assert_eq!(reopened.completion_date, None);

    // Step 6: delete, after which the id is gone.
    let id = reopened.id.clone();
    reopened.delete(&client).unwrap();
    assert!(matches!(client.reminder(&id), Err(BridgeError::NotFound(_))));
    assert!(matches!(client.delete_reminder(&id), Err(BridgeError::NotFound(_))));
}

#[test]
fn unknown_ids_are_not_found() {
    let client = connect(Library::sample());
    assert!(matches!(client.list("missing"), Err(BridgeError::NotFound(_))));
    assert!(matches!(client.album("missing"), Err(BridgeError::NotFound(_))));
    assert!(matches!(client.photo("missing"), Err(BridgeError::NotFound(_))));
    assert!(matches!(
        client.thumbnail("missing", ThumbnailSize::Small),
        Err(BridgeError::NotFound(_))
    ));
    assert!(matches!(
        client.image("missing", &ImageOptions::default()),
        Err(BridgeError::NotFound(_))
    ));
}

#[test]
fn album_iteration_covers_every_photo() {
    let client = connect(Library::sample());

    let albums = client.albums().unwrap();
    let roll = albums.iter().find(|a| a.id == PHOTO_ALBUM_ID).unwrap();
    assert_eq!(roll.kind, AlbumKind::Smart);
    assert!(roll.start_date.is_some());

    let ids: Vec<String> = roll.photos(&client).map(|p| p.unwrap().id).collect();
    assert_eq!(ids.len(), SAMPLE_PHOTO_COUNT);
    assert_eq!(ids.first().map(String::as_str), Some("photo-000"));
    assert_eq!(ids.last().map(String::as_str), Some("photo-249"));

    let videos: Vec<_> = roll.videos(&client).map(Result::unwrap).collect();
    assert_eq!(videos.len() as u32, roll.video_count);
    assert!(videos.iter().all(|p| p.kind == MediaKind::Video));

    assert!(roll
        .live_photos(&client)
        .map(Result::unwrap)
        .all(|p| p.is_live_photo()));
}

#[test]
fn date_sorted_iteration() {
    let client = connect(Library::sample());
    let dates: Vec<_> = client
        .photos(PHOTO_ALBUM_ID, PhotoSort::DateAsc, Some(MediaFilter::Photo))
        .map(|p| p.unwrap().creation_date)
        .collect();
    assert!(!dates.is_empty());
    assert!(dates.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn empty_album_yields_nothing() {
    let client = connect(Library::sample());
    let album = client.album(EMPTY_ALBUM_ID).unwrap();
    assert_eq!(album.start_date, None);
    assert_eq!(album.photos(&client).count(), 0);
}

#[test]
fn assets_come_back_as_bytes() {
    let client = connect(Library::sample());

    let still = client.photo("photo-001").unwrap();
    assert_eq!(still.filename.as_deref(), Some("IMG_0001.HEIC"));
    assert_eq!(
        still.thumbnail(&client, ThumbnailSize::Small).unwrap(),
        asset_bytes("thumbnail-small", "photo-001")
    );
    assert_eq!(
        still.thumbnail(&client, ThumbnailSize::Medium).unwrap(),
        asset_bytes("thumbnail-medium", "photo-001")
    );
    assert!(matches!(still.video(&client), Err(BridgeError::Client(_))));
    assert!(matches!(
        client.video("photo-001"),
        Err(BridgeError::Api { status: 400, .. })
    ));

    let video = client.photo("photo-003").unwrap();
    assert_eq!(video.video(&client).unwrap(), asset_bytes("video", "photo-003"));

    let live = client.photo("photo-007").unwrap();
    assert_eq!(live.video(&client).unwrap(), asset_bytes("live-video", "photo-007"));
}

#[test]
fn image_polls_until_downloaded() {
    // Retry-After stays at 0 so the real sleeps are instant.
    let client = connect(Library::sample().with_pending("photo-010", 2));
    let photo = client.photo("photo-010").unwrap();

    let bytes = photo.image(&client, &ImageOptions::polling(3)).unwrap();
    assert_eq!(bytes, asset_bytes("image", "photo-010"));
}

#[test]
fn image_times_out_when_budget_is_too_small() {
    let client = connect(Library::sample().with_pending("photo-010", 5));
    let err = client.image("photo-010", &ImageOptions::polling(2)).unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { attempts: 2 }));
}

#[test]
fn blocking_image_returns_immediately() {
    let client = connect(Library::sample().with_pending("photo-010", 5));
    let bytes = client.image("photo-010", &ImageOptions::blocking()).unwrap();
    assert_eq!(bytes, asset_bytes("image", "photo-010"));
}

#[test]
fn bearer_token_is_sent() {
    let base = start_server(Library::sample().with_token("s3cret"));

    let anonymous = BridgeClient::new(BridgeConfig::new(&base).unwrap());
    assert!(matches!(
        anonymous.albums(),
        Err(BridgeError::Api { status: 401, ref reason }) if reason == "Missing or invalid token"
    ));

    let authorized = BridgeClient::new(BridgeConfig::new(&base).unwrap().with_token("s3cret"));
    assert_eq!(authorized.albums().unwrap().len(), 2);
}

#[test]
fn refused_connection_is_connection_error() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = BridgeClient::new(BridgeConfig::for_host("127.0.0.1", port).unwrap());
    assert!(matches!(client.lists(), Err(BridgeError::Connection(_))));
}
