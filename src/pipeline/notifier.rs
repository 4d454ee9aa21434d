//! Status event sinks.
//!
//! Every state transition is pushed to an [`EventSink`]. Emission is
//! fire-and-forget: a sink that cannot deliver drops the event.

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::models::{StatusPayload, TrackStatusEvent};

/// Receives status events. Implementations must not block.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TrackStatusEvent);
}

/// Broadcasts events to any number of subscribers, e.g. a websocket or SSE
/// transport.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<TrackStatusEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackStatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: TrackStatusEvent) {
        // No subscribers is not an error
        if self.sender.send(event).is_err() {
            debug!("No subscribers for track status event");
        }
    }
}

/// Writes events to the log.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, event: TrackStatusEvent) {
        match &event.payload {
            StatusPayload::None => info!("Track {} -> {}", event.track_id, event.state),
            StatusPayload::Resolved { url } => {
                info!("Track {} -> {} ({})", event.track_id, event.state, url)
            }
            StatusPayload::Downloaded { path } => {
                info!("Track {} -> {} ({:?})", event.track_id, event.state, path)
            }
            StatusPayload::Failed { message } => {
                info!("Track {} -> {}: {}", event.track_id, event.state, message)
            }
        }
    }
}

/// Drops every event.
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: TrackStatusEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TrackState;

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let sink = BroadcastEventSink::new(8);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        sink.emit(TrackStatusEvent::new(1, TrackState::Searching, StatusPayload::None));

        assert_eq!(first.recv().await.unwrap().state, TrackState::Searching);
        assert_eq!(second.recv().await.unwrap().track_id, 1);
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_fail() {
        let sink = BroadcastEventSink::default();
        sink.emit(TrackStatusEvent::new(1, TrackState::Queued, StatusPayload::None));
    }
}
