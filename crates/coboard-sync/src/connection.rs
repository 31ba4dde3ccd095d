//! Connection state machine.
//!
//! One tracker per session is the single writer of [`ConnectionState`];
//! everything else (UI banner, queue viewer) observes it through registered
//! callbacks instead of implicit reactivity.

use serde::{Deserialize, Serialize};

/// Link health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    /// Replaying the offline queue after a reconnect.
    Syncing,
    /// Link lost; local edits queue until it returns.
    Offline,
    /// Unrecoverable sync failure; retry re-enters through Offline.
    Error,
}

impl ConnectionStatus {
    /// Transition legality table.
    fn allows(self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        match (self, next) {
            (current, target) if current == target => true,
            // Any state can fail hard.
            (_, Error) => true,
            (Connected, Syncing | Offline) => true,
            (Syncing, Connected | Offline) => true,
            (Offline, Syncing | Connected) => true,
            (Error, Offline) => true,
            _ => false,
        }
    }
}

/// Snapshot of link health shown to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Pending entries in the offline queue, kept in lock-step with it.
    pub queue_length: usize,
    pub error: Option<String>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        // Optimistic: assume the link is up until a write or the
        // subscription proves otherwise.
        Self {
            status: ConnectionStatus::Connected,
            queue_length: 0,
            error: None,
        }
    }
}

type Observer = Box<dyn Fn(&ConnectionState) + Send + Sync>;

/// The single writer of [`ConnectionState`].
#[derive(Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
    observers: Vec<Observer>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status
    }

    /// Register a callback invoked after every state change.
    pub fn subscribe(&mut self, observer: impl Fn(&ConnectionState) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Link confirmed healthy; clears any surfaced error.
    pub fn mark_connected(&mut self) {
        self.state.error = None;
        self.transition(ConnectionStatus::Connected);
    }

    /// A queue flush has started.
    pub fn begin_sync(&mut self) {
        self.transition(ConnectionStatus::Syncing);
    }

    /// Link lost, or a write failed with a network error.
    pub fn mark_offline(&mut self) {
        self.transition(ConnectionStatus::Offline);
    }

    /// Unrecoverable sync failure.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.state.error = Some(message.into());
        self.transition(ConnectionStatus::Error);
    }

    /// Surface an error message (e.g. a permission failure) without leaving
    /// the current status.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.state.error = Some(message.into());
        self.notify();
    }

    /// Leave the error state and re-enter the retry path through Offline.
    pub fn retry(&mut self) {
        if self.state.status == ConnectionStatus::Error {
            self.transition(ConnectionStatus::Offline);
        }
    }

    /// Mirror the queue's pending count for UI display.
    pub fn set_queue_length(&mut self, queue_length: usize) {
        if self.state.queue_length != queue_length {
            self.state.queue_length = queue_length;
            self.notify();
        }
    }

    fn transition(&mut self, next: ConnectionStatus) {
        let current = self.state.status;
        if current == next {
            return;
        }
        if !current.allows(next) {
            log::warn!("ignoring illegal connection transition {current:?} -> {next:?}");
            return;
        }
        log::debug!("connection {current:?} -> {next:?}");
        self.state.status = next;
        self.notify();
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer(&self.state);
        }
    }
}

impl std::fmt::Debug for ConnectionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTracker")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_initial_state_is_optimistic() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.status(), ConnectionStatus::Connected);
        assert_eq!(tracker.state().queue_length, 0);
        assert_eq!(tracker.state().error, None);
    }

    #[test]
    fn test_normal_flush_cycle() {
        let mut tracker = ConnectionTracker::new();
        tracker.begin_sync();
        assert_eq!(tracker.status(), ConnectionStatus::Syncing);
        tracker.mark_connected();
        assert_eq!(tracker.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_offline_reconnect_cycle() {
        let mut tracker = ConnectionTracker::new();
        tracker.mark_offline();
        assert_eq!(tracker.status(), ConnectionStatus::Offline);
        tracker.begin_sync();
        tracker.mark_connected();
        assert_eq!(tracker.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_error_reenters_through_offline() {
        let mut tracker = ConnectionTracker::new();
        tracker.mark_error("backend rejected sync");
        assert_eq!(tracker.status(), ConnectionStatus::Error);
        assert!(tracker.state().error.is_some());

        tracker.retry();
        assert_eq!(tracker.status(), ConnectionStatus::Offline);

        tracker.begin_sync();
        tracker.mark_connected();
        assert_eq!(tracker.status(), ConnectionStatus::Connected);
        // A successful reconnect clears the surfaced error.
        assert_eq!(tracker.state().error, None);
    }

    #[test]
    fn test_illegal_transition_is_ignored() {
        let mut tracker = ConnectionTracker::new();
        tracker.mark_error("boom");
        // Error cannot jump straight back to Syncing.
        tracker.begin_sync();
        assert_eq!(tracker.status(), ConnectionStatus::Error);
    }

    #[test]
    fn test_observers_are_notified() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let mut tracker = ConnectionTracker::new();
        tracker.subscribe(move |state: &ConnectionState| {
            seen_clone.lock().unwrap().push(state.status);
        });

        tracker.mark_offline();
        tracker.set_queue_length(3);
        tracker.begin_sync();
        tracker.mark_connected();

        let statuses = seen.lock().unwrap().clone();
        assert_eq!(
            statuses,
            vec![
                ConnectionStatus::Offline,
                ConnectionStatus::Offline, // queue length update
                ConnectionStatus::Syncing,
                ConnectionStatus::Connected,
            ]
        );
    }

    #[test]
    fn test_permission_error_surfaces_without_transition() {
        let mut tracker = ConnectionTracker::new();
        tracker.set_error("permission denied: read-only share");
        assert_eq!(tracker.status(), ConnectionStatus::Connected);
        assert!(tracker.state().error.is_some());
    }
}
