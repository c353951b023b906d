// src/notifications.rs
//
// Transient user-facing messages. Every outcome of an editor operation,
// success or failure, ends up here; nothing in the session is fatal.

use crate::error::{ErrorCategory, ResizerError};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Maximum number of notifications kept at once. The oldest goes first.
const MAX_NOTIFICATIONS: usize = 5;

/// Unique identifier for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(u64);

impl NotificationId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Severity level determines how long a notification stays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    /// Operation completed (3s).
    #[default]
    Success,
    /// Informational message (3s).
    Info,
    /// Something did not happen but nothing is wrong (5s).
    Warning,
    /// Stays until dismissed.
    Error,
}

impl Severity {
    /// `None` means manual dismiss.
    pub fn auto_dismiss_duration(&self) -> Option<Duration> {
        match self {
            Severity::Success | Severity::Info => Some(Duration::from_secs(3)),
            Severity::Warning => Some(Duration::from_secs(5)),
            Severity::Error => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    id: NotificationId,
    severity: Severity,
    message: String,
    created_at: Instant,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>, now: Instant) -> Self {
        Self {
            id: NotificationId::next(),
            severity,
            message: message.into(),
            created_at: now,
        }
    }

    /// Errors from user input are shown as warnings; everything else as an
    /// error that waits for the user.
    pub fn from_error(error: &ResizerError, now: Instant) -> Self {
        let severity = match error.category() {
            ErrorCategory::UserError => Severity::Warning,
            _ => Severity::Error,
        };
        Self::new(severity, error.to_string(), now)
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.severity.auto_dismiss_duration() {
            Some(d) => now.saturating_duration_since(self.created_at) >= d,
            None => false,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.message)
    }
}

/// Notifications currently shown, oldest first.
#[derive(Debug, Default)]
pub struct Notifications {
    active: VecDeque<Notification>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) -> NotificationId {
        let id = notification.id();
        if self.active.len() == MAX_NOTIFICATIONS {
            self.active.pop_front();
        }
        self.active.push_back(notification);
        id
    }

    /// Returns `true` if the notification was found and removed.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        match self.active.iter().position(|n| n.id() == id) {
            Some(pos) => {
                self.active.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop notifications whose display time is over. Returns how many.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.active.len();
        self.active.retain(|n| !n.is_expired(now));
        before - self.active.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.active.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.active.back()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let now = Instant::now();
        let a = Notification::new(Severity::Info, "a", now);
        let b = Notification::new(Severity::Info, "a", now);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn expiry_follows_severity() {
        let now = Instant::now();
        let mut list = Notifications::new();
        list.push(Notification::new(Severity::Success, "ok", now));
        list.push(Notification::new(Severity::Warning, "careful", now));
        list.push(Notification::new(Severity::Error, "broken", now));

        assert_eq!(list.expire(now + Duration::from_millis(2999)), 0);
        assert_eq!(list.expire(now + Duration::from_secs(3)), 1);
        assert_eq!(list.expire(now + Duration::from_secs(5)), 1);
        assert_eq!(list.expire(now + Duration::from_secs(3600)), 0);
        assert_eq!(list.latest().map(|n| n.message()), Some("broken"));
    }

    #[test]
    fn dismiss_by_id() {
        let now = Instant::now();
        let mut list = Notifications::new();
        let id = list.push(Notification::new(Severity::Error, "x", now));
        assert!(list.dismiss(id));
        assert!(!list.dismiss(id));
        assert!(list.is_empty());
    }

    #[test]
    fn oldest_is_dropped_when_full() {
        let now = Instant::now();
        let mut list = Notifications::new();
        for i in 0..(MAX_NOTIFICATIONS + 2) {
            list.push(Notification::new(Severity::Info, i.to_string(), now));
        }
        assert_eq!(list.len(), MAX_NOTIFICATIONS);
        assert_eq!(list.iter().next().map(|n| n.message()), Some("2"));
    }

    #[test]
    fn errors_map_to_severity() {
        let now = Instant::now();
        let user = Notification::from_error(&ResizerError::dimension_required(), now);
        assert_eq!(user.severity(), Severity::Warning);
        let codec = Notification::from_error(&ResizerError::decode_failed("bad"), now);
        assert_eq!(codec.severity(), Severity::Error);
        assert_eq!(codec.to_string(), "[error] Failed to decode image: bad");
    }
}
