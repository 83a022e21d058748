//! # filmscreen-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `ConnectionClient`: the link to one CVM controller
//!   - `MessageHandler`: per-motor consumers of routed messages
//!   - `EventPublisher`: entity event notifications
//! - Route inbound device messages to per-motor covers (`DeviceDispatch`)
//! - Hold each motor's cover state and map open/close/stop to commands
//! - Forward preset recall/store service calls
//! - Drive the integration lifecycle (validate, setup, teardown)
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `filmscreen-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod cover;
pub mod dispatch;
pub mod event_bus;
pub mod integration;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;
