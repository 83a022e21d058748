//! Logical cover actions and their physical command mapping.

use serde::{Deserialize, Serialize};

use crate::protocol::Command;

/// What the user asked the cover to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverAction {
    Open,
    Close,
    Stop,
}

impl CoverAction {
    /// Physical command for this action.
    ///
    /// Mirrored installations set `reverse` so that "open" drives the motor
    /// down and "close" drives it up.
    #[must_use]
    pub fn command(self, reverse: bool) -> Command {
        match (self, reverse) {
            (Self::Open, false) | (Self::Close, true) => Command::Up,
            (Self::Close, false) | (Self::Open, true) => Command::Down,
            (Self::Stop, _) => Command::Stop,
        }
    }

    /// Parse a cover service name (`open_cover`, `close_cover`, `stop_cover`).
    #[must_use]
    pub fn from_service(service: &str) -> Option<Self> {
        match service {
            "open_cover" => Some(Self::Open),
            "close_cover" => Some(Self::Close),
            "stop_cover" => Some(Self::Stop),
            _ => None,
        }
    }
}
