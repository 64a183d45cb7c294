//! In-process notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`NotificationBus`] fans every published [`Notification`] out to live
//! subscribers and also appends it to an in-memory log, so a front end
//! that attaches late can still show what it missed. It is designed to be
//! shared via `Arc<NotificationBus>` across the stores.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user, usually describing a failed request.
///
/// Constructed via [`Notification::error`] / [`Notification::info`] and
/// enriched with [`with_entity`](Notification::with_entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Text shown to the user. May span several lines.
    pub message: String,

    pub severity: Severity,

    /// Entity label the notification concerns, e.g. `"antigen"`.
    pub entity: Option<String>,

    /// When the notification was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            entity: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Attach the entity label the notification concerns.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

// ---------------------------------------------------------------------------
// NotificationBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct NotificationLog {
    entries: Vec<Notification>,
    /// Index of the first entry not yet handed out by `take_undisplayed`.
    displayed: usize,
}

/// In-process fan-out notification bus with a replayable log.
///
/// # Usage
///
/// ```rust
/// use antigenapp_events::bus::{Notification, NotificationBus};
///
/// let bus = NotificationBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(Notification::error("404: Not Found"));
/// ```
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
    log: Mutex<NotificationLog>,
}

impl NotificationBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, slow receivers observe a
    /// `RecvError::Lagged`; the log itself is never truncated.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            log: Mutex::new(NotificationLog::default()),
        }
    }

    /// Record a notification and send it to all current subscribers.
    pub fn publish(&self, notification: Notification) {
        tracing::debug!(
            severity = ?notification.severity,
            entity = notification.entity.as_deref().unwrap_or("-"),
            message = %notification.message,
            "Notification published",
        );
        self.lock_log().entries.push(notification.clone());
        // A send error only means there are no receivers.
        let _ = self.sender.send(notification);
    }

    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Every notification published so far, oldest first.
    pub fn history(&self) -> Vec<Notification> {
        self.lock_log().entries.clone()
    }

    /// Notifications not yet returned by a previous call, oldest first.
    pub fn take_undisplayed(&self) -> Vec<Notification> {
        let mut log = self.lock_log();
        let fresh = log.entries[log.displayed..].to_vec();
        log.displayed = log.entries.len();
        fresh
    }

    // ---- private helpers ----

    /// The log holds plain data, so a poisoned lock is still consistent.
    fn lock_log(&self) -> MutexGuard<'_, NotificationLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
