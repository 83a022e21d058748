//! Fan-out of cover state and service-call events to in-process listeners.

use std::future::Future;

use tokio::sync::broadcast;

use filmscreen_domain::error::FilmscreenError;
use filmscreen_domain::event::Event;

use crate::ports::EventPublisher;

/// [`EventPublisher`] that hands every event to all current listeners.
///
/// With no listener attached, events are discarded. A listener that falls
/// more than `capacity` events behind loses the oldest ones.
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Bus buffering up to `capacity` events per listener.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attach a listener. It sees nothing published before it attached.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), FilmscreenError>> + Send {
        // Err means no listener is attached.
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}
