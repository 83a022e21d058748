//! # filmscreen-domain
//!
//! Pure domain model for the Stewart Filmscreen CVM integration.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers and error conventions
//! - Define the **protocol vocabulary** (motors, commands, events, statuses)
//!   shared with the connection client
//! - Define the **cover state reducer** that turns device events into
//!   open/closed/opening/closing/position
//! - Define **device** metadata and **events** published to the platform
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod cover;
pub mod device;
pub mod event;
pub mod protocol;
