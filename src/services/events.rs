// src/services/events.rs
//
// Best-effort audit side channel. A failed append is logged operationally
// and never surfaces to the caller: the primary mutation already happened
// and must not be reported as failed because of its audit trail.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{db::LeadEventRepository, models::event::NewLeadEvent};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, event: &NewLeadEvent) -> anyhow::Result<()>;
}

pub struct PgEventSink {
    repo: LeadEventRepository,
}

impl PgEventSink {
    pub fn new(repo: LeadEventRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl EventSink for PgEventSink {
    async fn append(&self, event: &NewLeadEvent) -> anyhow::Result<()> {
        self.repo.append(event).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct EventLogger {
    sink: Arc<dyn EventSink>,
}

impl EventLogger {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Append an event, swallowing failures. The lead id goes into the log
    /// line so a missing audit row stays discoverable.
    pub async fn record(&self, event: NewLeadEvent) {
        if let Err(e) = self.sink.append(&event).await {
            tracing::error!(
                lead_id = %event.lead_id,
                event_type = ?event.event_type,
                error = %e,
                "failed to append lead event; primary mutation is unaffected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::LeadEventType;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn append(&self, _event: &NewLeadEvent) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("event store is down"))
        }
    }

    struct CountingSink(AtomicUsize);

    #[async_trait]
    impl EventSink for CountingSink {
        async fn append(&self, _event: &NewLeadEvent) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event() -> NewLeadEvent {
        NewLeadEvent::new(
            Uuid::new_v4(),
            LeadEventType::StatusChanged,
            Some("ops1@example.com".into()),
            json!("new"),
            json!("contacted"),
        )
    }

    #[tokio::test]
    async fn sink_failure_does_not_propagate() {
        let logger = EventLogger::new(Arc::new(FailingSink));
        // Must complete normally; the caller's mutation already succeeded.
        logger.record(event()).await;
    }

    #[tokio::test]
    async fn successful_append_reaches_the_sink_once() {
        let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
        let logger = EventLogger::new(sink.clone());
        logger.record(event()).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }
}
