//! Virtual client error types.

use filmscreen_domain::error::FilmscreenError;

/// Errors raised by the simulated CVM link.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// The simulated device is configured as unreachable.
    #[error("connection refused")]
    Refused,

    /// A command was sent before `connect` succeeded or after `close`.
    #[error("CVM client not connected")]
    NotConnected,

    /// Hosts only send commands; the device rejects anything else.
    #[error("the CVM only accepts commands")]
    NotACommand,
}

impl From<VirtualError> for FilmscreenError {
    fn from(err: VirtualError) -> Self {
        match err {
            VirtualError::Refused => Self::CannotConnect(Box::new(err)),
            other => Self::Client(Box::new(other)),
        }
    }
}
