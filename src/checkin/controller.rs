//! Drives the check-in flow: applies UI events to the state machine, runs the
//! submission pipeline (location fix, address lookup, persistence), and
//! publishes every state change to the webview.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Local, Utc};
use log::{info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    admin::{dashboard_page, Authenticator, DashboardPage, TimeWindow},
    capture::stamp_frame,
    error::SubmitError,
    events::UiEvents,
    geocode::AddressResolver,
    location::LocationProvider,
    models::{record::sort_newest_first, AttendanceRecord, LocationStamp},
    storage::RecordStore,
};

use super::state::{CapturedPhoto, FlowEvent, FlowSnapshot, FlowState, Role, Step};

pub const CAPTURE_PROCESS_FAILED: &str = "Failed to process the captured image.";

struct Inflight {
    epoch: u64,
    cancel: CancellationToken,
}

#[derive(Clone)]
pub struct CheckinController {
    state: Arc<Mutex<FlowState>>,
    records: Arc<Mutex<Vec<AttendanceRecord>>>,
    store: Arc<dyn RecordStore>,
    location: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn AddressResolver>,
    auth: Arc<dyn Authenticator>,
    events: Arc<dyn UiEvents>,
    submission: Arc<Mutex<Option<Inflight>>>,
}

impl CheckinController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        location: Arc<dyn LocationProvider>,
        geocoder: Arc<dyn AddressResolver>,
        auth: Arc<dyn Authenticator>,
        events: Arc<dyn UiEvents>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(FlowState::new())),
            records: Arc::new(Mutex::new(Vec::new())),
            store,
            location,
            geocoder,
            auth,
            events,
            submission: Arc::new(Mutex::new(None)),
        }
    }

    /// Loads the persisted collection into memory and publishes it. Called
    /// once at startup; the store keeps the collection newest first.
    pub async fn bootstrap(&self) -> Result<()> {
        let loaded = self.store.load().await?;
        info!("Loaded {} attendance record(s)", loaded.len());

        let mut records = self.records.lock().await;
        *records = loaded;
        self.events.records_updated(&records);
        Ok(())
    }

    /// Swaps in a collection fetched by the remote poll loop. No-op when
    /// nothing actually changed.
    pub async fn replace_records(&self, fresh: Vec<AttendanceRecord>) {
        let mut records = self.records.lock().await;
        if *records != fresh {
            *records = fresh;
            self.events.records_updated(&records);
        }
    }

    pub async fn get_snapshot(&self) -> FlowSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn select_role(&self, role: Role) -> FlowSnapshot {
        self.apply_and_publish(FlowEvent::RoleSelected(role)).await
    }

    pub async fn admin_login(&self, username: &str, password: &str) -> FlowSnapshot {
        let event = if self.auth.verify(username, password) {
            FlowEvent::AdminLoginSucceeded
        } else {
            // Credentials never reach the logs.
            info!("Rejected an admin sign-in attempt");
            FlowEvent::AdminLoginFailed
        };
        self.apply_and_publish(event).await
    }

    pub async fn return_to_role_selection(&self) -> FlowSnapshot {
        self.apply_and_publish(FlowEvent::ReturnedToRoleSelection)
            .await
    }

    pub async fn submit_details(&self, employee_id: String) -> FlowSnapshot {
        self.apply_and_publish(FlowEvent::DetailsSubmitted { employee_id })
            .await
    }

    /// Takes the raw frame from the webview camera, burns in the capture
    /// timestamp, and moves the flow to the preview screen. Returns the
    /// stamped JPEG as a data URL for the webview to render.
    pub async fn attach_photo(&self, frame_data_url: String) -> Result<String> {
        let captured_at = Local::now();

        let stamped =
            match tokio::task::spawn_blocking(move || stamp_frame(&frame_data_url, captured_at))
                .await
            {
                Ok(result) => result,
                Err(err) => Err(anyhow!("stamping task failed: {err}")),
            };

        match stamped {
            Ok(photo) => {
                let data_url = photo.data_url.clone();
                self.apply_and_publish(FlowEvent::PhotoCaptured(CapturedPhoto {
                    jpeg: photo.jpeg,
                    data_url: photo.data_url,
                    captured_at: captured_at.with_timezone(&Utc),
                }))
                .await;
                Ok(data_url)
            }
            Err(err) => {
                warn!("Failed to stamp a captured frame: {err:#}");
                self.apply_and_publish(FlowEvent::CaptureFailed {
                    message: CAPTURE_PROCESS_FAILED.to_string(),
                })
                .await;
                Err(anyhow!(CAPTURE_PROCESS_FAILED))
            }
        }
    }

    /// Surfaces a camera failure reported by the webview (denied permission,
    /// no device) on the capture screen.
    pub async fn abort_capture(&self, message: String) -> FlowSnapshot {
        self.apply_and_publish(FlowEvent::CaptureFailed { message })
            .await
    }

    pub async fn retake_photo(&self) -> FlowSnapshot {
        self.cancel_inflight().await;
        self.apply_and_publish(FlowEvent::RetakeRequested).await
    }

    pub async fn start_new_checkin(&self) -> FlowSnapshot {
        self.cancel_inflight().await;
        self.apply_and_publish(FlowEvent::NewCheckinStarted).await
    }

    pub async fn logout(&self) -> FlowSnapshot {
        self.cancel_inflight().await;
        self.apply_and_publish(FlowEvent::LoggedOut).await
    }

    /// Runs the whole submission pipeline for the previewed photo. All
    /// failures land back in the flow state as the preview-screen banner;
    /// this never errors out to the caller.
    pub async fn submit_checkin(&self) -> FlowSnapshot {
        let (epoch, employee_id, photo, cancel) = {
            let mut state = self.state.lock().await;
            if state.step != Step::Preview || state.processing {
                return state.snapshot();
            }

            let (employee_id, photo) = match (state.employee_id.clone(), state.capture.clone()) {
                (Some(employee_id), Some(photo)) => (employee_id, photo),
                _ => {
                    *state = state.apply(FlowEvent::SubmissionAborted {
                        message: SubmitError::MissingSessionData.to_string(),
                    });
                    let snapshot = state.snapshot();
                    self.events.flow_state_changed(&snapshot);
                    return snapshot;
                }
            };

            *state = state.apply(FlowEvent::SubmissionStarted);
            let cancel = CancellationToken::new();
            {
                let mut slot = self.submission.lock().await;
                *slot = Some(Inflight {
                    epoch: state.epoch,
                    cancel: cancel.clone(),
                });
            }
            self.events.flow_state_changed(&state.snapshot());
            (state.epoch, employee_id, photo, cancel)
        };

        let outcome = self.perform_submission(&employee_id, &photo, &cancel).await;

        let mut state = self.state.lock().await;
        {
            let mut slot = self.submission.lock().await;
            if slot.as_ref().map_or(false, |inflight| inflight.epoch == epoch) {
                *slot = None;
            }
        }

        if state.epoch != epoch {
            // The user walked away (logout, retake, new check-in) while this
            // ran. The flow has moved on; the outcome is not applied. A save
            // that already happened stays saved.
            match outcome {
                Ok(record) => info!("Completed submission {} for an abandoned session", record.id),
                Err(SubmitError::Cancelled) => {}
                Err(err) => info!("Abandoned submission failed: {err}"),
            }
            return state.snapshot();
        }

        let event = match outcome {
            Ok(record) => FlowEvent::SubmissionSucceeded(record),
            Err(err) => {
                warn!("Submission failed: {err}");
                FlowEvent::SubmissionFailed {
                    message: err.user_message(),
                }
            }
        };
        *state = state.apply(event);
        let snapshot = state.snapshot();
        self.events.flow_state_changed(&snapshot);
        snapshot
    }

    /// Filtered dashboard view over the in-memory collection. Window
    /// boundaries are computed in the machine's local timezone.
    pub async fn admin_records(&self, search: &str, window: TimeWindow) -> DashboardPage {
        let records = self.records.lock().await;
        dashboard_page(&records, search, window, Local::now())
    }

    async fn perform_submission(
        &self,
        employee_id: &str,
        photo: &CapturedPhoto,
        cancel: &CancellationToken,
    ) -> Result<AttendanceRecord, SubmitError> {
        let point = self.location.current_position(cancel).await?;

        let address = tokio::select! {
            resolved = self.geocoder.resolve(point) => resolved?,
            _ = cancel.cancelled() => return Err(SubmitError::Cancelled),
        };

        let record = AttendanceRecord::new(
            employee_id.to_string(),
            photo.captured_at,
            LocationStamp::new(point, address),
            photo.data_url.clone(),
        );

        let mut updated = {
            let records = self.records.lock().await;
            let mut updated = Vec::with_capacity(records.len() + 1);
            updated.push(record.clone());
            updated.extend(records.iter().cloned());
            updated
        };
        sort_newest_first(&mut updated);

        // Nothing may be persisted for a submission the user already walked
        // away from. A cancel landing after this point is handled by the
        // epoch check instead.
        if cancel.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }

        self.store
            .save(&updated)
            .await
            .map_err(SubmitError::Storage)?;

        {
            let mut records = self.records.lock().await;
            *records = updated;
            self.events.records_updated(&records);
        }

        Ok(record)
    }

    async fn apply_and_publish(&self, event: FlowEvent) -> FlowSnapshot {
        let snapshot = {
            let mut state = self.state.lock().await;
            *state = state.apply(event);
            state.snapshot()
        };
        self.events.flow_state_changed(&snapshot);
        snapshot
    }

    async fn cancel_inflight(&self) {
        if let Some(inflight) = self.submission.lock().await.take() {
            inflight.cancel.cancel();
        }
    }
}
