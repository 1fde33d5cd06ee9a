//! User-facing notifications.
//!
//! A single [`AlertSlot`] holds the alert currently on screen. Alerts can
//! hide themselves after a fixed duration; callers pass the current time in
//! so the slot stays a plain state object.

use std::time::{Duration, Instant};

use crate::client::ClientError;

/// Auto-hide delay used when an alert does not set its own.
pub const DEFAULT_ALERT_DISPLAY_DURATION: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// `None` keeps the alert until it is closed.
    pub auto_hide: Option<Duration>,
}

impl Alert {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            description: description.into(),
            auto_hide: None,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, description)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(Severity::Error, "Error", description)
    }

    /// Hide after [`DEFAULT_ALERT_DISPLAY_DURATION`].
    pub fn auto_hide(self) -> Self {
        self.auto_hide_after(DEFAULT_ALERT_DISPLAY_DURATION)
    }

    pub fn auto_hide_after(mut self, duration: Duration) -> Self {
        self.auto_hide = Some(duration);
        self
    }
}

impl From<&ClientError> for Alert {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Aborted(reason) => {
                Alert::new(reason.severity, reason.title.clone(), reason.message.clone())
            }
            ClientError::Decode(_) => Alert::error("Processing the response failed."),
            ClientError::Validation(errors) => {
                Alert::new(Severity::Error, "Invalid input", errors.to_string())
            }
            ClientError::Api { message, .. } => Alert::error(message.clone()),
            ClientError::Http(_) => Alert::error("The request failed."),
            other => Alert::error(other.to_string()),
        }
    }
}

#[derive(Debug)]
struct Shown {
    alert: Alert,
    hide_at: Option<Instant>,
}

/// The alert currently displayed, if any.
#[derive(Debug, Default)]
pub struct AlertSlot {
    current: Option<Shown>,
}

impl AlertSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display `alert`, replacing the current one.
    pub fn show(&mut self, alert: Alert, now: Instant) {
        let hide_at = alert.auto_hide.map(|duration| now + duration);
        self.current = Some(Shown { alert, hide_at });
    }

    /// The visible alert at `now`. Expired alerts are dropped.
    pub fn visible(&mut self, now: Instant) -> Option<&Alert> {
        if matches!(&self.current, Some(Shown { hide_at: Some(at), .. }) if now >= *at) {
            self.current = None;
        }
        self.current.as_ref().map(|shown| &shown.alert)
    }

    pub fn close(&mut self) {
        self.current = None;
    }
}
