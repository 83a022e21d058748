//! Preset service: recall and store device-wide screen presets.

use std::sync::Arc;

use filmscreen_domain::error::{FilmscreenError, ValidationError};
use filmscreen_domain::protocol::{Command, Message, Motor};

use crate::dispatch::DeviceDispatch;
use crate::ports::ConnectionClient;

pub const RECALL_PRESET: &str = "recall_preset";
pub const STORE_PRESET: &str = "store_preset";

const PRESET_NUMBER: &str = "preset_number";

/// Forwards preset commands to the whole device.
pub struct PresetService<C> {
    dispatch: Arc<DeviceDispatch<C>>,
}

impl<C: ConnectionClient> PresetService<C> {
    #[must_use]
    pub fn new(dispatch: Arc<DeviceDispatch<C>>) -> Self {
        Self { dispatch }
    }

    /// Move every motor to preset `number`.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error if the command cannot be sent.
    pub async fn recall_preset(&self, number: u32) -> Result<(), FilmscreenError> {
        tracing::info!(preset = number, "recalling preset");
        self.dispatch
            .send_command(Message::command(Motor::All, Command::Recall(number)))
            .await
    }

    /// Store the current motor positions as preset `number`.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error if the command cannot be sent.
    pub async fn store_preset(&self, number: u32) -> Result<(), FilmscreenError> {
        tracing::info!(preset = number, "storing preset");
        self.dispatch
            .send_command(Message::command(Motor::All, Command::Store(number)))
            .await
    }

    /// Whether `service` is one of the preset services.
    #[must_use]
    pub fn handles(service: &str) -> bool {
        matches!(service, RECALL_PRESET | STORE_PRESET)
    }

    /// Handle a `recall_preset` / `store_preset` call with
    /// `{"preset_number": n}` data.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown service or a missing or
    /// invalid preset number, otherwise the dispatch error.
    pub async fn handle_service_call(
        &self,
        service: &str,
        data: &serde_json::Value,
    ) -> Result<(), FilmscreenError> {
        let number = preset_number(data)?;
        match service {
            RECALL_PRESET => self.recall_preset(number).await,
            STORE_PRESET => self.store_preset(number).await,
            other => Err(ValidationError::UnknownService(other.to_string()).into()),
        }
    }
}

/// Extract a non-negative preset number. Numeric strings are accepted.
fn preset_number(data: &serde_json::Value) -> Result<u32, ValidationError> {
    let invalid = ValidationError::InvalidPresetNumber {
        field: PRESET_NUMBER,
    };
    let value = data
        .get(PRESET_NUMBER)
        .ok_or(ValidationError::MissingField(PRESET_NUMBER))?;
    let number = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(invalid)
}
