//! Fan-out of workflow events to any number of listeners.

use insight_rs_protocol::{EventSink, WorkflowEvent};
use log::debug;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Broadcast-backed sink that fans workflow events out to subscribers.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// `capacity` events are retained per slow receiver before it lags.
    pub fn new(capacity: usize) -> Self {
        debug!("event bus ready (capacity={capacity})");
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`; lagging receivers yield an error item.
    pub fn stream(&self) -> BroadcastStream<WorkflowEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: WorkflowEvent) {
        // no receivers is not an error here
        self.sender.send(event).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use insight_rs_protocol::WorkflowEventPayload;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();
        let workflow_id = Uuid::new_v4();
        bus.emit(WorkflowEvent::new(
            workflow_id,
            Utc::now(),
            WorkflowEventPayload::Reset,
        ));
        let event = receiver.recv().await.expect("event");
        assert_eq!(event.workflow_id, workflow_id);
        assert_eq!(event.payload, WorkflowEventPayload::Reset);
    }

    #[test]
    fn emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(1);
        bus.emit(WorkflowEvent::new(
            Uuid::new_v4(),
            Utc::now(),
            WorkflowEventPayload::StreamStopped,
        ));
    }
}
