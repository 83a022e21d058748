//! Cover entity: one per CVM motor.
//!
//! The entity owns the motor's [`CoverState`], registers a handler for its
//! motor address with the [`DeviceDispatch`], and turns open/close/stop
//! requests into physical commands.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use filmscreen_domain::cover::{CoverAction, CoverState, SupportedFeatures};
use filmscreen_domain::device::{Device, MANUFACTURER, MODEL};
use filmscreen_domain::error::FilmscreenError;
use filmscreen_domain::event::{Event as PlatformEvent, EventType};
use filmscreen_domain::protocol::{Event, Message, Motor, Payload, QueryKind, Status};

use crate::dispatch::DeviceDispatch;
use crate::ports::{ConnectionClient, EventPublisher, HandlerFuture, MessageHandler};

/// Cover entity for a single motor.
pub struct CoverEntity<C, EP> {
    name: String,
    motor: Motor,
    reverse: bool,
    dispatch: Arc<DeviceDispatch<C>>,
    handler: Arc<CoverHandler<EP>>,
}

impl<C, EP> CoverEntity<C, EP>
where
    C: ConnectionClient,
    EP: EventPublisher + Send + Sync + 'static,
{
    /// Create the cover for `motor` on `device`. Nothing is registered until
    /// [`added`](Self::added) is called.
    #[must_use]
    pub fn new(
        device: &Device,
        motor: Motor,
        reverse: bool,
        dispatch: Arc<DeviceDispatch<C>>,
        publisher: EP,
    ) -> Self {
        Self {
            name: format!("{MANUFACTURER} {MODEL} {motor}"),
            motor,
            reverse,
            dispatch,
            handler: Arc::new(CoverHandler {
                unique_id: format!("{}_{motor}", device.unique_id),
                motor,
                state: Mutex::new(CoverState::default()),
                publisher,
            }),
        }
    }

    /// Activate the entity: start receiving this motor's messages and ask
    /// the device where the motor currently is.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error if the position query cannot be sent.
    pub async fn added(&self) -> Result<(), FilmscreenError> {
        self.dispatch.register(self.motor, self.as_handler());
        self.dispatch
            .send_command(Message::query(self.motor, QueryKind::Position))
            .await
    }

    /// Deactivate the entity. Its state no longer follows the device.
    ///
    /// Another entity that took over the same motor keeps receiving.
    pub fn removed(&self) {
        if !self.dispatch.deregister(self.motor, &self.as_handler()) {
            tracing::debug!(unique_id = %self.unique_id(), "cover was not registered");
        }
    }

    fn as_handler(&self) -> Arc<dyn MessageHandler> {
        Arc::clone(&self.handler) as _
    }

    /// Send the physical command for `action`, honouring the reverse flag.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error if the command cannot be sent.
    pub async fn perform(&self, action: CoverAction) -> Result<(), FilmscreenError> {
        let command = action.command(self.reverse);
        tracing::info!(unique_id = %self.unique_id(), ?action, ?command, "cover action");
        self.dispatch
            .send_command(Message::command(self.motor, command))
            .await
    }

    /// # Errors
    ///
    /// See [`perform`](Self::perform).
    pub async fn open_cover(&self) -> Result<(), FilmscreenError> {
        self.perform(CoverAction::Open).await
    }

    /// # Errors
    ///
    /// See [`perform`](Self::perform).
    pub async fn close_cover(&self) -> Result<(), FilmscreenError> {
        self.perform(CoverAction::Close).await
    }

    /// # Errors
    ///
    /// See [`perform`](Self::perform).
    pub async fn stop_cover(&self) -> Result<(), FilmscreenError> {
        self.perform(CoverAction::Stop).await
    }

    #[must_use]
    pub fn available(&self) -> bool {
        self.dispatch.is_connected()
    }
}

impl<C, EP> CoverEntity<C, EP> {
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.handler.unique_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn motor(&self) -> Motor {
        self.motor
    }

    #[must_use]
    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> CoverState {
        *self.handler.lock()
    }

    #[must_use]
    pub fn is_closed(&self) -> Option<bool> {
        self.state().closed
    }

    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.state().opening
    }

    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.state().closing
    }

    #[must_use]
    pub fn current_cover_position(&self) -> Option<i64> {
        self.state().position
    }

    #[must_use]
    pub fn supported_features(&self) -> SupportedFeatures {
        SupportedFeatures::CVM
    }
}

/// Reducer side of a cover, registered with the dispatch.
struct CoverHandler<EP> {
    unique_id: String,
    motor: Motor,
    state: Mutex<CoverState>,
    publisher: EP,
}

impl<EP> CoverHandler<EP> {
    fn lock(&self) -> MutexGuard<'_, CoverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<EP> CoverHandler<EP>
where
    EP: EventPublisher + Send + Sync,
{
    async fn handle_message(&self, message: &Message) -> Result<(), FilmscreenError> {
        let Payload::Event(event) = &message.payload else {
            tracing::trace!(motor = %self.motor, ?message, "ignoring command message");
            return Ok(());
        };
        tracing::debug!(motor = %self.motor, ?event, "received event from CVM");
        if let Event::Status(Status::Other(value)) = event {
            tracing::warn!(motor = %self.motor, %value, "ignoring unknown motor status");
            return Ok(());
        }

        let snapshot = {
            let mut state = self.lock();
            state.apply(event)?;
            *state
        };

        self.publisher
            .publish(PlatformEvent::new(
                EventType::StateChanged,
                Some(self.unique_id.clone()),
                state_payload(&snapshot),
            ))
            .await
    }
}

impl<EP> MessageHandler for CoverHandler<EP>
where
    EP: EventPublisher + Send + Sync,
{
    fn handle<'a>(&'a self, message: &'a Message) -> HandlerFuture<'a> {
        Box::pin(self.handle_message(message))
    }
}

fn state_payload(state: &CoverState) -> serde_json::Value {
    serde_json::json!({
        "state": state.status(),
        "closed": state.closed,
        "opening": state.opening,
        "closing": state.closing,
        "position": state.position,
    })
}
