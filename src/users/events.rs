//! User notification events.
//!
//! # Data Flow
//! ```text
//! UserService
//!     → ChannelPublisher::publish (non-blocking try_send)
//!     → bounded mpsc queue
//!     → EventDispatcher task (serialize, log under topic, count)
//! ```
//!
//! # Design Decisions
//! - Fire-and-forget: the service never waits for delivery
//! - A full or closed queue is reported to the caller, which only logs it
//! - On shutdown the dispatcher drains what is already queued

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::observability::metrics;

/// Kind of user change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Create,
    Delete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "CREATE",
            EventType::Delete => "DELETE",
        }
    }
}

/// Immutable notification about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    pub email: String,
    pub event_type: EventType,
}

impl UserEvent {
    pub fn created(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            event_type: EventType::Create,
        }
    }

    pub fn deleted(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            event_type: EventType::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("event queue is full")]
    Full,

    #[error("event queue is closed")]
    Closed,
}

/// Outbound seam for user events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: UserEvent) -> Result<(), PublishError>;
}

/// Publisher feeding a bounded in-process queue.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<UserEvent>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<UserEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: UserEvent) -> Result<(), PublishError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::Full,
            mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
        })
    }
}

/// Background consumer standing in for the message broker.
pub struct EventDispatcher {
    topic: String,
    rx: mpsc::Receiver<UserEvent>,
}

impl EventDispatcher {
    pub fn new(topic: impl Into<String>, rx: mpsc::Receiver<UserEvent>) -> Self {
        Self { topic: topic.into(), rx }
    }

    /// Deliver events until shutdown. Returns how many were delivered.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        tracing::info!(topic = %self.topic, "Event dispatcher starting");
        let mut delivered = 0u64;

        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => {
                        self.dispatch(&event);
                        delivered += 1;
                    }
                    None => break,
                },
                _ = shutdown.recv() => {
                    self.rx.close();
                    while let Some(event) = self.rx.recv().await {
                        self.dispatch(&event);
                        delivered += 1;
                    }
                    break;
                }
            }
        }

        tracing::info!(topic = %self.topic, delivered, "Event dispatcher stopped");
        delivered
    }

    fn dispatch(&self, event: &UserEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                tracing::info!(topic = %self.topic, key = %event.email, payload = %payload, "User event published");
                metrics::record_user_event(event.event_type.as_str());
            }
            Err(e) => tracing::error!(topic = %self.topic, error = %e, "Failed to serialize user event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(UserEvent::created("a@x.com")).unwrap();
        assert_eq!(json, serde_json::json!({ "email": "a@x.com", "eventType": "CREATE" }));
    }

    #[tokio::test]
    async fn test_publisher_reports_full_and_closed() {
        let (publisher, rx) = ChannelPublisher::new(1);
        publisher.publish(UserEvent::created("a@x.com")).unwrap();
        assert_eq!(publisher.publish(UserEvent::created("b@x.com")), Err(PublishError::Full));

        drop(rx);
        assert_eq!(publisher.publish(UserEvent::deleted("a@x.com")), Err(PublishError::Closed));
    }

    #[tokio::test]
    async fn test_dispatcher_drains_on_shutdown() {
        let (publisher, rx) = ChannelPublisher::new(8);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        publisher.publish(UserEvent::created("a@x.com")).unwrap();
        publisher.publish(UserEvent::deleted("a@x.com")).unwrap();
        shutdown_tx.send(()).unwrap();

        let delivered = EventDispatcher::new("user-events", rx).run(shutdown_rx).await;
        assert_eq!(delivered, 2);
        assert_eq!(publisher.publish(UserEvent::created("b@x.com")), Err(PublishError::Closed));
    }

    #[tokio::test]
    async fn test_dispatcher_stops_when_publishers_gone() {
        let (publisher, rx) = ChannelPublisher::new(8);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        publisher.publish(UserEvent::created("a@x.com")).unwrap();
        drop(publisher);

        let delivered = EventDispatcher::new("user-events", rx).run(shutdown_rx).await;
        assert_eq!(delivered, 1);
    }
}
