//! Synchronous client for the iCloud Bridge REST API.
//!
//! # Overview
//! Exposes the bridge's reminders and photo-library endpoints as typed
//! records. Album listings are auto-paginated into lazy iterators and
//! full-resolution images are polled while the bridge is still downloading
//! them from iCloud.
//!
//! # Design
//! - `BridgeClient` splits every operation into `build_*` (produces an
//!   `HttpRequest`) and `parse_*` (consumes an `HttpResponse`), and runs the
//!   round-trip through the `Transport` trait. `UreqTransport` is the
//!   default; tests substitute scripted transports.
//! - Records are plain data with no back-reference to a client. Convenience
//!   methods such as `Reminder::complete` take the client explicitly.
//! - The server address is explicit configuration (`BridgeConfig`); there is
//!   no process-wide default.
//! - Everything blocks on the calling thread, including the waits between
//!   image polls.
//!
//! ```no_run
//! use icloud_bridge::{BridgeClient, BridgeConfig, ImageOptions};
//!
//! # fn main() -> Result<(), icloud_bridge::BridgeError> {
//! let client = BridgeClient::new(BridgeConfig::for_host("localhost", 31337)?);
//! for album in client.albums()? {
//!     for photo in album.photos(&client) {
//!         let photo = photo?;
//!         let image = photo.image(&client, &ImageOptions::default())?;
//!         println!("{} {} bytes", photo.id, image.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mapping;
pub mod paginate;
pub mod transport;
pub mod types;

pub use asset::{AssetKind, CancelToken, ImageOptions, Sleeper, ThreadSleeper};
pub use client::BridgeClient;
pub use config::BridgeConfig;
pub use error::{BridgeError, MappingError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use mapping::{format_date, parse_date};
pub use paginate::{Page, Paginator};
pub use transport::UreqTransport;
pub use types::{
    Album, AlbumKind, HealthStatus, MediaFilter, MediaKind, NewReminder, Photo, PhotoPage,
    PhotoQuery, PhotoSort, Priority, Reminder, ReminderList, ReminderUpdate, ThumbnailSize,
};
