//! CVM integration lifecycle: connect, expose covers, route service calls,
//! tear down.
//!
//! Each [`FilmscreenIntegration`] owns everything for one configured
//! controller: the dispatch, the four cover entities and the preset service.
//! Nothing is shared between instances.

use std::sync::Arc;
use std::time::Duration;

use filmscreen_domain::cover::CoverAction;
use filmscreen_domain::device::{Device, MANUFACTURER};
use filmscreen_domain::error::{FilmscreenError, NotFoundError, ValidationError};
use filmscreen_domain::event::{Event, EventType};
use filmscreen_domain::protocol::Motor;

use crate::cover::CoverEntity;
use crate::dispatch::DeviceDispatch;
use crate::ports::{ConnectionClient, EventPublisher};
use crate::services::preset_service::PresetService;

/// Per-instance settings.
#[derive(Debug, Clone)]
pub struct IntegrationOptions {
    /// Stable id of the controller, usually its host.
    pub unique_id: String,
    /// Upper bound on each outbound command, if any.
    pub send_timeout: Option<Duration>,
}

/// Check that `client` can reach the device and log in.
///
/// The connection is closed again on success. Returns the title under which
/// the controller should be listed.
///
/// # Errors
///
/// [`FilmscreenError::CannotConnect`] when the transport fails,
/// [`FilmscreenError::InvalidAuth`] when the credentials are rejected.
pub async fn validate_connection<C: ConnectionClient>(
    client: &C,
    host: &str,
) -> Result<String, FilmscreenError> {
    connect(client).await?;
    client.close();
    Ok(format!("{MANUFACTURER} ({host})"))
}

async fn connect<C: ConnectionClient>(client: &C) -> Result<(), FilmscreenError> {
    match client.connect().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(FilmscreenError::InvalidAuth),
        Err(err) => {
            tracing::debug!(error = %err, "connection error");
            Err(FilmscreenError::CannotConnect(err))
        }
    }
}

/// One configured CVM controller and its cover entities.
pub struct FilmscreenIntegration<C, EP> {
    device: Device,
    dispatch: Arc<DeviceDispatch<C>>,
    covers: Vec<CoverEntity<C, EP>>,
    presets: PresetService<C>,
    publisher: EP,
}

impl<C, EP> FilmscreenIntegration<C, EP>
where
    C: ConnectionClient,
    EP: EventPublisher + Clone + Send + Sync + 'static,
{
    /// Connect, register the device and activate one cover per motor.
    ///
    /// Motors alternate orientation starting with `A` unreversed, matching
    /// the mirrored mounting of paired masking motors.
    ///
    /// # Errors
    ///
    /// Connection and authentication failures are reported as
    /// [`FilmscreenError::CannotConnect`] / [`FilmscreenError::InvalidAuth`].
    /// A failing initial position query aborts setup and closes the client.
    pub async fn setup(
        client: Arc<C>,
        options: IntegrationOptions,
        publisher: EP,
    ) -> Result<Self, FilmscreenError> {
        let device = Device::cvm(options.unique_id)?;
        connect(client.as_ref()).await?;
        tracing::info!(device_id = %device.id, unique_id = %device.unique_id, "connected to CVM");

        let mut dispatch = DeviceDispatch::new(client);
        if let Some(limit) = options.send_timeout {
            dispatch = dispatch.with_send_timeout(limit);
        }
        let dispatch = Arc::new(dispatch);

        let covers: Vec<_> = Motor::PHYSICAL
            .iter()
            .enumerate()
            .map(|(index, &motor)| {
                CoverEntity::new(
                    &device,
                    motor,
                    index % 2 == 1,
                    Arc::clone(&dispatch),
                    publisher.clone(),
                )
            })
            .collect();

        for cover in &covers {
            if let Err(err) = cover.added().await {
                tracing::error!(unique_id = %cover.unique_id(), error = %err, "failed to activate cover");
                dispatch.close();
                return Err(err);
            }
        }

        Ok(Self {
            presets: PresetService::new(Arc::clone(&dispatch)),
            device,
            dispatch,
            covers,
            publisher,
        })
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[must_use]
    pub fn covers(&self) -> &[CoverEntity<C, EP>] {
        &self.covers
    }

    #[must_use]
    pub fn cover(&self, unique_id: &str) -> Option<&CoverEntity<C, EP>> {
        self.covers.iter().find(|cover| cover.unique_id() == unique_id)
    }

    #[must_use]
    pub fn presets(&self) -> &PresetService<C> {
        &self.presets
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.dispatch.is_connected()
    }

    /// Handle a platform service call.
    ///
    /// Preset services address the whole device and ignore `target`; cover
    /// services (`open_cover`, `close_cover`, `stop_cover`) need the unique id
    /// of one of this integration's covers.
    ///
    /// # Errors
    ///
    /// Validation errors for unknown services or bad data, not-found for an
    /// unknown target, otherwise whatever sending the command returned.
    pub async fn handle_service_call(
        &self,
        target: Option<&str>,
        service: &str,
        data: serde_json::Value,
    ) -> Result<(), FilmscreenError> {
        if PresetService::<C>::handles(service) {
            self.presets.handle_service_call(service, &data).await?;
        } else {
            let action = CoverAction::from_service(service)
                .ok_or_else(|| ValidationError::UnknownService(service.to_string()))?;
            let target = target.ok_or(ValidationError::MissingField("entity_id"))?;
            let cover = self.cover(target).ok_or_else(|| NotFoundError {
                entity: "Cover",
                id: target.to_string(),
            })?;
            cover.perform(action).await?;
        }

        self.publisher
            .publish(Event::new(
                EventType::ServiceCalled,
                target.map(str::to_string),
                serde_json::json!({"service": service, "data": data}),
            ))
            .await
    }

    /// Remove every cover, then close the dispatch and its client.
    pub fn teardown(&self) {
        for cover in &self.covers {
            cover.removed();
        }
        self.dispatch.close();
        tracing::info!(device_id = %self.device.id, unique_id = %self.device.unique_id, "CVM integration unloaded");
    }
}
