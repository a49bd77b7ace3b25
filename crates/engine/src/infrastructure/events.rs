//! Domain event fan-out and the log-backed notifier.

use spellbook_domain::DomainEvent;
use tokio::sync::broadcast;

use crate::infrastructure::ports::{
    Audience, EventPublisher, Notification, NotificationLevel, NotificationPort,
};

const EVENT_BUFFER: usize = 256;

/// Broadcasts domain events to in-process subscribers.
///
/// Publishing never blocks; subscribers that fall behind by more than the
/// buffer see a `Lagged` error and skip ahead.
pub struct BroadcastEventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for BroadcastEventBus {
    fn publish(&self, event: DomainEvent) {
        let event_type = event.event_type();
        match self.tx.send(event) {
            Ok(receivers) => tracing::debug!(event_type, receivers, "Published domain event"),
            Err(_) => tracing::trace!(event_type, "No subscribers for domain event"),
        }
    }
}

/// Writes notifications to the log. The host renders them for real users.
#[derive(Default)]
pub struct TracingNotifier;

impl NotificationPort for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let audience = match &notification.audience {
            Audience::User { user_id } => user_id.to_string(),
            Audience::Gms => "gms".to_string(),
        };
        match notification.level {
            NotificationLevel::Info => {
                tracing::info!(audience = %audience, "{}", notification.message)
            }
            NotificationLevel::Warning => {
                tracing::warn!(audience = %audience, "{}", notification.message)
            }
            NotificationLevel::Error => {
                tracing::error!(audience = %audience, "{}", notification.message)
            }
        }
    }
}
