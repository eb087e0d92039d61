use insight_rs_protocol::{EventSink, WorkflowEvent, WorkflowEventPayload};
use parking_lot::Mutex;

/// Sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }

    /// Payloads in emission order.
    pub fn payloads(&self) -> Vec<WorkflowEventPayload> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: WorkflowEvent) {
        self.events.lock().push(event);
    }
}
