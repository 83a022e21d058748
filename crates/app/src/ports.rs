//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod connection;
pub mod event_bus;
pub mod handler;

pub use connection::{ConnectionClient, InboundSender, Subscription, inbound_channel};
pub use event_bus::EventPublisher;
pub use handler::{HandlerFuture, MessageHandler};
