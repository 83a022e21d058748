//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`FilmscreenError`] via `#[from]` so callers can tell the categories apart.

/// Boxed error raised by the connection client (transport, framing, …).
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the integration.
#[derive(Debug, thiserror::Error)]
pub enum FilmscreenError {
    /// The device could not be reached (connection refused, timeout, …).
    #[error("cannot connect to the CVM")]
    CannotConnect(#[source] ClientError),

    /// The transport connected but the device rejected the credentials.
    #[error("invalid authentication")]
    InvalidAuth,

    /// A device message carried a value that could not be interpreted.
    #[error("malformed device message")]
    DataFormat(#[from] DataFormatError),

    /// The connection client failed while sending a command.
    #[error("connection client error")]
    Client(#[source] ClientError),

    /// A bounded send did not complete in time.
    #[error("command timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A service call targeted something that does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A service call or configuration value failed validation.
    #[error("validation error")]
    Validation(#[from] ValidationError),
}

/// A value received from the device did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataFormatError {
    /// A position event carried something other than a finite number.
    #[error("position value {0:?} is not a number")]
    InvalidPosition(String),
}

/// Lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of thing that was looked up (e.g. `"Cover"`).
    pub entity: &'static str,
    /// Identifier that was requested.
    pub id: String,
}

/// Validation failures for service calls and configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("unknown service {0:?}")]
    UnknownService(String),
    #[error("missing field {0:?}")]
    MissingField(&'static str),
    #[error("field {field:?} must be a non-negative integer")]
    InvalidPresetNumber { field: &'static str },
}
