//! Outlet for the platform events covers and service calls emit.

use std::future::Future;
use std::sync::Arc;

use filmscreen_domain::error::FilmscreenError;
use filmscreen_domain::event::Event;

/// Where `StateChanged` and `ServiceCalled` events go.
pub trait EventPublisher {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), FilmscreenError>> + Send;
}

impl<P: EventPublisher + Send + Sync> EventPublisher for Arc<P> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), FilmscreenError>> + Send {
        P::publish(self, event)
    }
}
