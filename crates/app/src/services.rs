//! Application services: use-case implementations.
//!
//! Each service accepts the connection client through a generic parameter
//! (constructor injection), keeping this layer decoupled from concrete
//! adapters.

pub mod preset_service;
