//! Binary asset retrieval: thumbnails, full images, video.
//!
//! # Design
//! Thumbnails and video are one request each. The full-resolution image may
//! not exist on the bridge yet (it is still coming down from iCloud); the
//! server then answers 202 with a `Retry-After` hint in seconds. In polling
//! mode the client sleeps exactly that long and repeats the identical
//! request, up to `max_retries` attempts. In blocking mode (`wait=true`) the
//! server is supposed to hold the request until the image is ready, so a 202
//! there is a protocol violation and is reported, not retried.
//!
//! One invocation moves through these states:
//!
//! ```text
//! Requesting -> Succeeded (2xx) | NotFound (404) | Failed (other)
//! Requesting -> Pending (202, polling only)
//! Pending    -> Requesting (attempts left) | TimedOut
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{check_status, parse_bytes, BridgeClient};
use crate::error::BridgeError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::ThumbnailSize;

/// Wait used when a 202 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Which binary payload of a photo to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    ThumbnailSmall,
    ThumbnailMedium,
    FullImage,
    Video,
    LiveVideo,
}

impl AssetKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            AssetKind::ThumbnailSmall | AssetKind::ThumbnailMedium => "thumbnail",
            AssetKind::FullImage => "image",
            AssetKind::Video => "video",
            AssetKind::LiveVideo => "live-video",
        }
    }
}

impl From<ThumbnailSize> for AssetKind {
    fn from(size: ThumbnailSize) -> Self {
        match size {
            ThumbnailSize::Small => AssetKind::ThumbnailSmall,
            ThumbnailSize::Medium => AssetKind::ThumbnailMedium,
        }
    }
}

/// Blocks the calling thread between image polls.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared flag that stops an image poll between attempts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Controls for a full-resolution image fetch.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Ask the server to hold the request until the image is ready.
    pub wait: bool,
    /// Attempt budget in polling mode. Zero is treated as one.
    pub max_retries: u32,
    pub cancel: Option<CancelToken>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            wait: false,
            max_retries: DEFAULT_MAX_RETRIES,
            cancel: None,
        }
    }
}

impl ImageOptions {
    pub fn blocking() -> Self {
        Self {
            wait: true,
            ..Self::default()
        }
    }

    pub fn polling(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn ensure_not_cancelled(&self) -> Result<(), BridgeError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(BridgeError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Outcome of one image request.
enum Step {
    Ready(Vec<u8>),
    Pending(Duration),
}

fn classify(request: &HttpRequest, response: HttpResponse, wait: bool) -> Result<Step, BridgeError> {
    if response.status == 202 {
        if wait {
            return Err(BridgeError::Client(
                "image download pending despite wait=true".to_string(),
            ));
        }
        return Ok(Step::Pending(retry_after(&response)));
    }
    check_status(request, &response)?;
    Ok(Step::Ready(response.body))
}

/// `Retry-After` as whole seconds; anything else falls back to the default.
pub fn retry_after(response: &HttpResponse) -> Duration {
    response
        .header("retry-after")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

impl<T: Transport, S: Sleeper> BridgeClient<T, S> {
    pub fn thumbnail(&self, photo_id: &str, size: ThumbnailSize) -> Result<Vec<u8>, BridgeError> {
        self.fetch_asset(photo_id, size.into())
    }

    pub fn video(&self, photo_id: &str) -> Result<Vec<u8>, BridgeError> {
        self.fetch_asset(photo_id, AssetKind::Video)
    }

    /// Motion component of a Live Photo.
    pub fn live_video(&self, photo_id: &str) -> Result<Vec<u8>, BridgeError> {
        self.fetch_asset(photo_id, AssetKind::LiveVideo)
    }

    /// Single-request assets. `FullImage` goes through here in blocking
    /// mode only; use [`BridgeClient::image`] for the polling behavior.
    pub fn fetch_asset(&self, photo_id: &str, kind: AssetKind) -> Result<Vec<u8>, BridgeError> {
        if kind == AssetKind::FullImage {
            return self.image(photo_id, &ImageOptions::blocking());
        }
        let request = self.build_asset(photo_id, kind, false);
        parse_bytes(&request, self.execute(&request)?)
    }

    /// Full-resolution image, polling while the bridge downloads it.
    pub fn image(&self, photo_id: &str, options: &ImageOptions) -> Result<Vec<u8>, BridgeError> {
        let request = self.build_asset(photo_id, AssetKind::FullImage, options.wait);
        let attempts = if options.wait { 1 } else { options.max_retries.max(1) };

        for attempt in 1..=attempts {
            options.ensure_not_cancelled()?;
            let response = self.execute(&request)?;
            match classify(&request, response, options.wait)? {
                Step::Ready(bytes) => return Ok(bytes),
                Step::Pending(delay) if attempt < attempts => {
                    debug!(photo_id, attempt, delay_secs = delay.as_secs(), "image pending");
                    options.ensure_not_cancelled()?;
                    self.sleeper.sleep(delay);
                }
                Step::Pending(_) => {}
            }
        }

        warn!(photo_id, attempts, "image still pending after last attempt");
        Err(BridgeError::Timeout { attempts })
    }
}
