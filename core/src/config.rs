//! Connection settings for `BridgeClient`.
//!
//! There is no built-in server address: the base URL is always supplied by
//! the caller, either directly or through `ICLOUD_BRIDGE_URL`.

use std::time::Duration;

use url::Url;

use crate::error::BridgeError;

pub const ENV_URL: &str = "ICLOUD_BRIDGE_URL";
pub const ENV_TOKEN: &str = "ICLOUD_BRIDGE_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "ICLOUD_BRIDGE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    base_url: Url,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl BridgeConfig {
    /// `base_url` is the server root, e.g. `http://localhost:31337`; the
    /// `/api/v1` prefix is added per request.
    pub fn new(base_url: &str) -> Result<Self, BridgeError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BridgeError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(BridgeError::Config(format!(
                "base URL must be an http(s) URL, got {base_url}"
            )));
        }
        Ok(Self {
            base_url,
            token: None,
            timeout: None,
        })
    }

    /// Plain-HTTP server at `host:port`.
    pub fn for_host(host: &str, port: u16) -> Result<Self, BridgeError> {
        Self::new(&format!("http://{host}:{port}"))
    }

    /// Read `ICLOUD_BRIDGE_URL` (required), `ICLOUD_BRIDGE_TOKEN` and
    /// `ICLOUD_BRIDGE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        let url = lookup(ENV_URL).ok_or_else(|| BridgeError::Config(format!("{ENV_URL} is not set")))?;
        let mut config = Self::new(&url)?;
        if let Some(token) = lookup(ENV_TOKEN).filter(|token| !token.is_empty()) {
            config = config.with_token(token);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| BridgeError::Config(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got {secs:?}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Bearer token sent as `Authorization` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Upper bound on one HTTP round-trip. Unset leaves the transport
    /// default in place.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
