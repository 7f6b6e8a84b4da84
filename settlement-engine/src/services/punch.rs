//! Attendance punch-in/out for delivery agents.

use std::sync::Arc;
use tracing::instrument;

use crate::config::GeofenceConfig;
use crate::error::SettlementError;
use crate::models::Coordinate;
use crate::services::backend::{PunchDirection, SettlementBackend};
use crate::services::evidence::Photo;
use crate::services::geo::Geofence;
use crate::services::lifecycle::PunchState;
use crate::services::metrics;

pub struct PunchClock<B: ?Sized> {
    backend: Arc<B>,
    office: Geofence,
    state: PunchState,
}

impl<B: SettlementBackend + ?Sized> PunchClock<B> {
    pub fn new(backend: Arc<B>, office: Geofence) -> Self {
        Self::with_state(backend, office, PunchState::Offline)
    }

    /// Clock gated by the configured office punch-in fence.
    pub fn from_config(backend: Arc<B>, geofence: &GeofenceConfig) -> Self {
        Self::new(backend, geofence.punch_in_fence())
    }

    pub fn with_state(backend: Arc<B>, office: Geofence, state: PunchState) -> Self {
        Self {
            backend,
            office,
            state,
        }
    }

    pub fn state(&self) -> PunchState {
        self.state
    }

    /// Offline -> Online. The geofence is checked before any request is sent.
    #[instrument(skip(self, photo))]
    pub async fn punch_in(
        &mut self,
        position: Coordinate,
        photo: &Photo,
    ) -> Result<PunchState, SettlementError> {
        if let Err(e) = self.state.check_punch_in(&self.office, position) {
            if let Some(reason) = e.reason() {
                metrics::record_precondition_failure(reason.code());
            }
            return Err(e);
        }
        self.send(PunchDirection::In, photo, PunchState::Online).await
    }

    /// Online -> Offline, ungated.
    #[instrument(skip(self, photo))]
    pub async fn punch_out(&mut self, photo: &Photo) -> Result<PunchState, SettlementError> {
        self.state.check_punch_out()?;
        self.send(PunchDirection::Out, photo, PunchState::Offline).await
    }

    async fn send(
        &mut self,
        direction: PunchDirection,
        photo: &Photo,
        next: PunchState,
    ) -> Result<PunchState, SettlementError> {
        let ack = match self.backend.punch(direction, photo).await {
            Ok(ack) => ack,
            Err(e) => {
                let err = SettlementError::from(e);
                metrics::record_punch(direction, err.kind());
                return Err(err);
            }
        };

        if !ack.success {
            metrics::record_punch(direction, "validation_rejected");
            return Err(SettlementError::ValidationRejected {
                message: ack.message.unwrap_or_else(|| "Punch rejected".to_string()),
            });
        }

        self.state = next;
        metrics::record_punch(direction, "committed");
        tracing::info!(state = self.state.as_str(), "Punch recorded");
        Ok(self.state)
    }
}
