//! Notification collaborator seam.
//!
//! The dispatcher hands `(report, area)` matches to a `Notifier`; the
//! transport behind it is the host's concern. Ships a webhook sink for the
//! daemon and a no-op sink for one-shot CLI use.

use std::time::Duration;

use once_cell::sync::Lazy;

use crate::area::Area;
use crate::report::Report;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Transport(String),

    #[error("webhook rejected notification with status {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, report: &Report, area: &Area) -> Result<(), NotifyError>;
}

/// Sink for setups without a notification channel.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _report: &Report, _area: &Area) -> Result<(), NotifyError> {
        Ok(())
    }
}

static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(reqwest::blocking::Client::new);

/// POSTs one JSON payload per matched `(report, area)` pair to a webhook.
/// The recipient list travels in the payload; fan-out to individual emails
/// happens on the receiving side.
pub struct WebhookNotifier {
    endpoint: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, report: &Report, area: &Area) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "report": {
                "id": report.id,
                "title": report.content.title,
                "severity": report.content.severity,
                "location": report.location,
            },
            "area": {
                "id": area.id,
                "name": area.name,
            },
            "recipients": area.notification_emails,
        });

        let response = CLIENT
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&payload)
            .send()?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        log::debug!(
            "notified area '{}' about report '{}' ({} recipients)",
            area.id,
            report.id,
            area.notification_emails.len()
        );
        Ok(())
    }
}

/// Test double capturing deliveries, optionally failing every call.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: std::sync::Mutex<Vec<(String, String)>>,
    fail_with_status: Option<u16>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn failing(status: u16) -> Self {
        Self {
            deliveries: std::sync::Mutex::new(Vec::new()),
            fail_with_status: Some(status),
        }
    }

    /// (report id, area id) pairs in delivery order.
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, report: &Report, area: &Area) -> Result<(), NotifyError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((report.id.clone(), area.id.clone()));

        match self.fail_with_status {
            Some(status) => Err(NotifyError::Rejected(status)),
            None => Ok(()),
        }
    }
}
