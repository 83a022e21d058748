//! Cover state reducer: folds status/position events into cover state.

use serde::{Deserialize, Serialize};

use crate::error::DataFormatError;
use crate::protocol::{Event, Status};

/// Device position at which the screen is fully extended.
const FULLY_EXTENDED: i64 = 100;

/// Observable state of one motor's cover.
///
/// `opening` and `closing` are never both true. `closed` stays unknown until
/// the first position or terminal status arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverState {
    pub closed: Option<bool>,
    pub opening: bool,
    pub closing: bool,
    /// Percent open (`100 - device extension`). Not clamped below.
    pub position: Option<i64>,
}

/// Coarse status derived from [`CoverState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverStatus {
    Open,
    Opening,
    Closed,
    Closing,
    Unknown,
}

impl std::fmt::Display for CoverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Opening => "opening",
            Self::Closed => "closed",
            Self::Closing => "closing",
            Self::Unknown => "unknown",
        })
    }
}

impl CoverState {
    /// Apply one event addressed to this cover's motor.
    ///
    /// Unknown status values are ignored. The state is left untouched when
    /// an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DataFormatError::InvalidPosition`] when a position event
    /// does not carry a finite number.
    pub fn apply(&mut self, event: &Event) -> Result<(), DataFormatError> {
        match event {
            Event::Status(status) => self.apply_status(status),
            Event::Position(raw) => {
                let extension = parse_extension(raw)?;
                self.set_extension(extension.min(FULLY_EXTENDED));
            }
        }
        Ok(())
    }

    fn apply_status(&mut self, status: &Status) {
        match status {
            Status::Stop => {
                self.opening = false;
                self.closing = false;
            }
            Status::Retracting => {
                self.closed = Some(false);
                self.closing = false;
                self.opening = true;
            }
            Status::Extending => {
                self.closed = Some(false);
                self.closing = true;
                self.opening = false;
            }
            Status::Home => {
                self.closed = Some(false);
                self.closing = false;
                self.opening = false;
                self.set_extension(0);
            }
            Status::End => {
                self.closed = Some(true);
                self.closing = false;
                self.opening = false;
                self.set_extension(FULLY_EXTENDED);
            }
            Status::Other(_) => {}
        }
    }

    fn set_extension(&mut self, extension: i64) {
        if !self.opening && !self.closing {
            self.closed = Some(extension == FULLY_EXTENDED);
        }
        self.position = Some(FULLY_EXTENDED.saturating_sub(extension));
    }

    #[must_use]
    pub fn status(&self) -> CoverStatus {
        if self.opening {
            CoverStatus::Opening
        } else if self.closing {
            CoverStatus::Closing
        } else {
            match self.closed {
                None => CoverStatus::Unknown,
                Some(true) => CoverStatus::Closed,
                Some(false) => CoverStatus::Open,
            }
        }
    }
}

/// Parse a device position string, rounding half to even.
#[allow(clippy::cast_possible_truncation)]
fn parse_extension(raw: &str) -> Result<i64, DataFormatError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| DataFormatError::InvalidPosition(raw.to_string()))?;
    if !value.is_finite() {
        return Err(DataFormatError::InvalidPosition(raw.to_string()));
    }
    Ok(value.round_ties_even() as i64)
}
