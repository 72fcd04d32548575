//! Error types for the check-in pipeline.

use thiserror::Error;

/// Why a submission failed. `Display` carries the reason line;
/// [`SubmitError::user_message`] wraps it into the full banner shown on the
/// preview screen.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The user refused the location permission prompt.
    #[error("Location Error: User denied Geolocation")]
    LocationDenied,

    /// No location fix arrived within the deadline.
    #[error("Location Error: Timeout expired")]
    LocationTimeout,

    /// The device could not produce a fix for some other reason. The payload
    /// is the reason reported by the geolocation layer.
    #[error("Location Error: {0}")]
    LocationUnavailable(String),

    /// The webview has no geolocation API at all.
    #[error("Geolocation is not supported by your browser.")]
    LocationUnsupported,

    /// Address resolution failed: network trouble, a rejected API call, or an
    /// empty answer. The cause goes to the logs, never to the user.
    #[error("Could not determine address from coordinates.")]
    AddressResolution(#[source] anyhow::Error),

    /// The record could not be persisted.
    #[error("Failed to save the attendance record.")]
    Storage(#[source] anyhow::Error),

    /// Submission was requested without a completed details + capture pair.
    /// Unreachable through the UI (the flow states carry their data) but
    /// guarded at the command boundary.
    #[error("Data is missing. Please start over.")]
    MissingSessionData,

    /// The flow moved on (retake, logout, new check-in) while the submission
    /// was still in flight. Never rendered; the screen that would have shown
    /// it is already gone.
    #[error("submission cancelled")]
    Cancelled,
}

impl SubmitError {
    /// Full banner for a failed submission.
    pub fn user_message(&self) -> String {
        format!(
            "Failed to capture attendance: {self}. Please ensure you have granted \
             location permissions and have a stable internet connection."
        )
    }
}
