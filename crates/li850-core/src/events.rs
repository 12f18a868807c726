//! Session event system.
//!
//! A [`SerialSession`](crate::SerialSession) broadcasts what happens on the
//! serial line so that front ends (terminal dashboards, status displays)
//! can follow along without polling.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;

use li850_store::RecordingSummary;
use li850_types::Sample;

/// Events emitted by a session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// A serial port was opened.
    Connected { port: String },
    /// The serial port was closed.
    Disconnected { port: String },
    /// The background reader started.
    ReadingStarted { port: String },
    /// The background reader stopped on request.
    ReadingStopped { port: String },
    /// A telemetry line was parsed.
    Sample { sample: Sample },
    /// Rows will now be appended to `path`.
    RecordingStarted { path: PathBuf },
    /// A recording was closed.
    RecordingFinalized { summary: RecordingSummary },
    /// A read failed and the reader exited.
    ReadError { port: String, error: String },
}

/// Sender for session events.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Fan-out of session events to any number of receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::Connected {
            port: "/dev/ttyACM0".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("/dev/ttyACM0"));

        let event = SessionEvent::Sample {
            sample: Sample::parse("<co2>400.0</co2>"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"sample\""));
        assert!(json.contains("400.0"));
    }

    #[tokio::test]
    async fn test_dispatcher_broadcasts() {
        let dispatcher = EventDispatcher::new(8);
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(SessionEvent::ReadingStarted {
            port: "p".to_string(),
        });

        assert!(matches!(
            rx1.recv().await.unwrap(),
            SessionEvent::ReadingStarted { .. }
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            SessionEvent::ReadingStarted { .. }
        ));
    }

    #[test]
    fn test_send_without_receivers() {
        let dispatcher = EventDispatcher::default();
        dispatcher.send(SessionEvent::Disconnected {
            port: "p".to_string(),
        });
        assert_eq!(dispatcher.receiver_count(), 0);
    }
}
