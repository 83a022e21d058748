//! Cover: the per-motor view of a projection screen.
//!
//! A cover is "open" when the screen is fully retracted (home) and "closed"
//! when it is fully extended (end). The device reports percent *extended*,
//! so positions are inverted before they reach the cover.

mod action;
mod state;

pub use action::CoverAction;
pub use state::{CoverState, CoverStatus};

/// Feature flags advertised by every CVM cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SupportedFeatures {
    pub open: bool,
    pub close: bool,
    pub stop: bool,
    pub set_position: bool,
}

impl SupportedFeatures {
    /// Open, close and stop. The CVM has no absolute positioning command.
    pub const CVM: Self = Self {
        open: true,
        close: true,
        stop: true,
        set_position: false,
    };
}
