//! Device geolocation, bridged through the webview.
//!
//! The desktop shell has no geolocation API of its own; the webview does.
//! Rust stays in charge of the deadline: it emits a `location-request` event,
//! the frontend runs `navigator.geolocation` and answers through the
//! `provide_location` command, and whichever of reply, timeout or
//! cancellation arrives first wins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SubmitError;
use crate::events::UiEvents;
use crate::models::GeoPoint;

/// Every fix is requested with high accuracy, a 30 second deadline, and
/// no cached positions.
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(30);
const HIGH_ACCURACY: bool = true;
const MAXIMUM_AGE_MS: u64 = 0;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// One fresh fix, or the reason there is none. Honors `cancel` and an
    /// internal deadline regardless of how the device side behaves.
    async fn current_position(&self, cancel: &CancellationToken) -> Result<GeoPoint, SubmitError>;
}

/// Event payload asking the webview for a fix.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub request_id: String,
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

/// What the webview sends back through `provide_location`: coordinates on
/// success, a coded failure otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReply {
    #[serde(default)]
    pub coords: Option<GeoPoint>,
    #[serde(default)]
    pub error: Option<LocationFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFailure {
    pub code: LocationErrorCode,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationErrorCode {
    Denied,
    Unavailable,
    Timeout,
    Unsupported,
}

/// Webview-backed provider. One pending oneshot per request id; late or
/// unknown replies are dropped.
pub struct WebviewLocation {
    events: Arc<dyn UiEvents>,
    pending: Mutex<HashMap<String, oneshot::Sender<LocationReply>>>,
    timeout: Duration,
}

impl WebviewLocation {
    pub fn new(events: Arc<dyn UiEvents>) -> Self {
        Self {
            events,
            pending: Mutex::new(HashMap::new()),
            timeout: LOCATION_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(events: Arc<dyn UiEvents>, timeout: Duration) -> Self {
        Self {
            events,
            pending: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Resolve a pending request. Unknown ids are ignored; the request may
    /// have timed out or been cancelled while the reply was in flight.
    pub async fn provide(&self, request_id: &str, reply: LocationReply) {
        match self.pending.lock().await.remove(request_id) {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => debug!("dropping location reply for unknown request {request_id}"),
        }
    }
}

#[async_trait]
impl LocationProvider for WebviewLocation {
    async fn current_position(&self, cancel: &CancellationToken) -> Result<GeoPoint, SubmitError> {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        self.events.location_request(&LocationRequest {
            request_id: request_id.clone(),
            high_accuracy: HIGH_ACCURACY,
            timeout_ms: self.timeout.as_millis() as u64,
            maximum_age_ms: MAXIMUM_AGE_MS,
        });

        let outcome = tokio::select! {
            reply = rx => match reply {
                Ok(reply) => resolve_reply(reply),
                Err(_) => Err(SubmitError::LocationUnavailable(
                    "location channel closed".to_string(),
                )),
            },
            _ = tokio::time::sleep(self.timeout) => Err(SubmitError::LocationTimeout),
            _ = cancel.cancelled() => Err(SubmitError::Cancelled),
        };

        self.pending.lock().await.remove(&request_id);
        outcome
    }
}

fn resolve_reply(reply: LocationReply) -> Result<GeoPoint, SubmitError> {
    if let Some(coords) = reply.coords {
        return Ok(coords);
    }
    let Some(failure) = reply.error else {
        return Err(SubmitError::LocationUnavailable(
            "malformed location reply".to_string(),
        ));
    };
    Err(match failure.code {
        LocationErrorCode::Denied => SubmitError::LocationDenied,
        LocationErrorCode::Timeout => SubmitError::LocationTimeout,
        LocationErrorCode::Unsupported => SubmitError::LocationUnsupported,
        LocationErrorCode::Unavailable => SubmitError::LocationUnavailable(
            failure
                .message
                .unwrap_or_else(|| "Position unavailable".to_string()),
        ),
    })
}
