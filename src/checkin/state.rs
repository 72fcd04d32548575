//! Check-in flow state and its pure transition function.
//!
//! Every screen change in the app is one [`FlowEvent`] applied to one
//! [`FlowState`]. The transition has no IO and no clock, so the whole flow
//! graph is table-testable; the controller owns the side effects and feeds
//! their outcomes back in as events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AttendanceRecord, LocationStamp};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";
pub const EMPLOYEE_ID_REQUIRED: &str = "Employee ID is required.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    RoleSelection,
    AdminLogin,
    AdminDashboard,
    Details,
    Capture,
    Preview,
    Result,
}

impl Default for Step {
    fn default() -> Self {
        Step::RoleSelection
    }
}

/// Stamped photo held between capture and submission. The JPEG bytes stay on
/// this side of the bridge; the data URL is what the webview renders.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub jpeg: Vec<u8>,
    pub data_url: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum FlowEvent {
    RoleSelected(Role),
    AdminLoginSucceeded,
    AdminLoginFailed,
    ReturnedToRoleSelection,
    DetailsSubmitted { employee_id: String },
    PhotoCaptured(CapturedPhoto),
    CaptureFailed { message: String },
    SubmissionStarted,
    SubmissionSucceeded(AttendanceRecord),
    SubmissionFailed { message: String },
    SubmissionAborted { message: String },
    RetakeRequested,
    NewCheckinStarted,
    LoggedOut,
}

#[derive(Debug, Clone, Default)]
pub struct FlowState {
    pub step: Step,
    pub role: Option<Role>,
    pub employee_id: Option<String>,
    pub capture: Option<CapturedPhoto>,
    pub current_record: Option<AttendanceRecord>,
    pub error: Option<String>,
    pub processing: bool,
    /// Bumped whenever the user walks away from an in-flight submission
    /// (logout, retake, new check-in). An async outcome whose starting epoch
    /// no longer matches is dropped instead of applied.
    pub epoch: u64,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure transition. Events that make no sense for the current step leave
    /// the state unchanged.
    pub fn apply(&self, event: FlowEvent) -> FlowState {
        let mut next = self.clone();
        match (self.step, event) {
            (Step::RoleSelection, FlowEvent::RoleSelected(role)) => {
                next.role = Some(role);
                next.error = None;
                next.step = match role {
                    Role::Admin => Step::AdminLogin,
                    Role::User => Step::Details,
                };
            }
            (Step::AdminLogin, FlowEvent::AdminLoginSucceeded) => {
                next.step = Step::AdminDashboard;
                next.error = None;
            }
            (Step::AdminLogin, FlowEvent::AdminLoginFailed) => {
                next.error = Some(INVALID_CREDENTIALS.to_string());
            }
            (Step::AdminLogin, FlowEvent::ReturnedToRoleSelection) => {
                next.step = Step::RoleSelection;
                next.role = None;
                next.error = None;
            }
            (Step::Details, FlowEvent::DetailsSubmitted { employee_id }) => {
                if employee_id.trim().is_empty() {
                    next.error = Some(EMPLOYEE_ID_REQUIRED.to_string());
                } else {
                    // Stored exactly as entered; the trim is only a validity check.
                    next.employee_id = Some(employee_id);
                    next.step = Step::Capture;
                    next.error = None;
                }
            }
            (Step::Capture, FlowEvent::PhotoCaptured(photo)) => {
                next.capture = Some(photo);
                next.step = Step::Preview;
                next.error = None;
            }
            (Step::Capture, FlowEvent::CaptureFailed { message }) => {
                next.error = Some(message);
            }
            (Step::Preview, FlowEvent::SubmissionStarted) => {
                next.processing = true;
                next.error = None;
            }
            (Step::Preview, FlowEvent::SubmissionSucceeded(record)) => {
                next.current_record = Some(record);
                next.capture = None;
                next.processing = false;
                next.error = None;
                next.step = Step::Result;
            }
            (Step::Preview, FlowEvent::SubmissionFailed { message }) => {
                next.error = Some(message);
                next.processing = false;
                // The captured photo survives so the user can retry or retake.
            }
            (Step::Preview, FlowEvent::SubmissionAborted { message }) => {
                next.step = Step::Details;
                next.employee_id = None;
                next.capture = None;
                next.current_record = None;
                next.error = Some(message);
                next.processing = false;
            }
            (Step::Preview, FlowEvent::RetakeRequested) => {
                next.step = Step::Capture;
                next.capture = None;
                next.error = None;
                next.processing = false;
                next.epoch += 1;
            }
            (Step::Result | Step::Capture, FlowEvent::NewCheckinStarted) => {
                next.step = Step::Details;
                next.employee_id = None;
                next.capture = None;
                next.current_record = None;
                next.error = None;
                next.processing = false;
                next.epoch += 1;
            }
            (_, FlowEvent::LoggedOut) => {
                if self.role.is_some() {
                    next = FlowState {
                        epoch: self.epoch + 1,
                        ..FlowState::default()
                    };
                }
            }
            _ => {}
        }
        next
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            step: self.step,
            role: self.role,
            employee_id: self.employee_id.clone(),
            captured_at: self.capture.as_ref().map(|c| c.captured_at),
            record: self.current_record.as_ref().map(RecordView::from),
            error: self.error.clone(),
            processing: self.processing,
        }
    }
}

/// UI-facing picture of the flow. Image payloads never ride along; the
/// webview keeps the data URL it received from the capture call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    pub step: Step,
    pub role: Option<Role>,
    pub employee_id: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub record: Option<RecordView>,
    pub error: Option<String>,
    pub processing: bool,
}

/// The current record as shown on the result card, minus the photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: String,
    pub employee_id: String,
    pub check_in_time: DateTime<Utc>,
    pub location: LocationStamp,
}

impl From<&AttendanceRecord> for RecordView {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            id: record.id.clone(),
            employee_id: record.employee_id.clone(),
            check_in_time: record.check_in_time,
            location: record.location.clone(),
        }
    }
}
