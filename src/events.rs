//! Outbound events to the webview.

use tauri::{AppHandle, Emitter};

use crate::checkin::state::FlowSnapshot;
use crate::location::LocationRequest;
use crate::models::AttendanceRecord;

pub const FLOW_STATE_CHANGED: &str = "flow-state-changed";
pub const RECORDS_UPDATED: &str = "records-updated";
pub const LOCATION_REQUEST: &str = "location-request";

/// Seam over `AppHandle::emit` so the controllers can run, and be tested,
/// without a Tauri runtime.
pub trait UiEvents: Send + Sync {
    fn flow_state_changed(&self, snapshot: &FlowSnapshot);
    fn records_updated(&self, records: &[AttendanceRecord]);
    fn location_request(&self, request: &LocationRequest);
}

pub struct TauriEvents {
    app_handle: AppHandle,
}

impl TauriEvents {
    pub fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }
}

impl UiEvents for TauriEvents {
    fn flow_state_changed(&self, snapshot: &FlowSnapshot) {
        let _ = self.app_handle.emit(FLOW_STATE_CHANGED, snapshot);
    }

    fn records_updated(&self, records: &[AttendanceRecord]) {
        let _ = self.app_handle.emit(RECORDS_UPDATED, records);
    }

    fn location_request(&self, request: &LocationRequest) {
        let _ = self.app_handle.emit(LOCATION_REQUEST, request);
    }
}
