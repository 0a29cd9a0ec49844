//! In-memory transport and sleeper used by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use icloud_bridge::{BridgeClient, BridgeConfig, HttpRequest, HttpResponse, Sleeper, Transport, TransportError};

pub const BASE_URL: &str = "http://bridge.test:31337";

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, response: HttpResponse) -> Self {
        self.replies.borrow_mut().push_back(Ok(response));
        self
    }

    pub fn reply_times(self, times: usize, response: HttpResponse) -> Self {
        for _ in 0..times {
            self.replies.borrow_mut().push_back(Ok(response.clone()));
        }
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies.borrow_mut().push_back(Err(TransportError::new(message)));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left for {}", request.url))
    }
}

/// Answers every request through a closure and records what it was asked.
pub struct FnTransport<F> {
    handler: F,
    requests: RefCell<Vec<HttpRequest>>,
}

impl<F: Fn(&HttpRequest) -> HttpResponse> FnTransport<F> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

impl<F: Fn(&HttpRequest) -> HttpResponse> Transport for FnTransport<F> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        Ok((self.handler)(request))
    }
}

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.waits.borrow().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

pub fn client<'a, T: Transport>(
    transport: &'a T,
    sleeper: &'a RecordingSleeper,
) -> BridgeClient<&'a T, &'a RecordingSleeper> {
    BridgeClient::with_transport(BridgeConfig::new(BASE_URL).unwrap(), transport).with_sleeper(sleeper)
}

pub fn json(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string().into_bytes()).with_header("content-type", "application/json")
}

pub fn pending(retry_after: &str) -> HttpResponse {
    HttpResponse::new(202, br#"{"status":"downloading"}"#.to_vec()).with_header("Retry-After", retry_after)
}

pub fn jpeg(bytes: &[u8]) -> HttpResponse {
    HttpResponse::new(200, bytes.to_vec()).with_header("content-type", "image/jpeg")
}

/// Query parameter value of a recorded request URL.
pub fn query_param(request: &HttpRequest, key: &str) -> Option<String> {
    let url = url::Url::parse(&request.url).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn photo_json(id: usize, album_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": format!("P{id}"),
        "albumId": album_id,
        "mediaType": "photo",
        "creationDate": "2024-06-01T08:00:00Z",
        "width": 4032,
        "height": 3024,
        "isFavorite": false,
        "isHidden": false
    })
}
