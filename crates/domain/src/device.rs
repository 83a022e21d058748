//! Device: the CVM controller as registered with the platform.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;

pub const MANUFACTURER: &str = "Stewart Filmscreen";
pub const MODEL: &str = "CVM";

/// Registry metadata for one CVM controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Stable identifier of the configured controller (its host).
    pub unique_id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl Device {
    /// Describe the CVM reachable under `unique_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] if `unique_id` is blank.
    pub fn cvm(unique_id: impl Into<String>) -> Result<Self, ValidationError> {
        let unique_id = unique_id.into();
        if unique_id.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            id: DeviceId::new(),
            unique_id,
            name: format!("{MANUFACTURER} {MODEL}"),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
        })
    }
}
