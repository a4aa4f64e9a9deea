use crate::engine::events::PipelineEvent;
use crate::engine::sink::EventSink;

/// In-memory sink collecting the events of a single request.
///
/// Each event is also logged at debug level.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Vec<PipelineEvent>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Borrow all collected events.
    pub fn events(&self) -> &[PipelineEvent] {
        &self.events
    }

    /// Consume the sink and return the collected events.
    pub fn into_events(self) -> Vec<PipelineEvent> {
        self.events
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&mut self, event: PipelineEvent) {
        tracing::debug!(
            request_id = %event.request_id,
            kind = ?event.kind,
            detail = event.detail.as_deref().unwrap_or(""),
            "pipeline event"
        );
        self.events.push(event);
    }
}
