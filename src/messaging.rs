//! Fire-and-forget event publication over NATS

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
    prefix: String,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>, prefix: impl Into<String>) -> Self {
        Self { nats, prefix: prefix.into() }
    }

    /// No broker: events are logged and dropped.
    pub fn disabled() -> Self { Self::default() }

    pub fn subject_for(&self, event: &DomainEvent) -> String {
        if self.prefix.is_empty() {
            event.subject().to_string()
        } else {
            format!("{}.{}", self.prefix, event.subject())
        }
    }

    /// Never fails the caller; the owning transaction has already committed.
    pub async fn publish(&self, event: DomainEvent) {
        let subject = self.subject_for(&event);
        let Some(client) = &self.nats else {
            debug!(%subject, ?event, "event not published, no broker configured");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%subject, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            warn!(%subject, error = %e, "failed to publish event");
        }
    }
}
