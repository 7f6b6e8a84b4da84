use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;
use std::time::Duration;
use validator::Validate;

use crate::models::Coordinate;
use crate::services::geo::{Geofence, DEFAULT_PUNCH_IN_RADIUS_KM};

pub const DEFAULT_VISIT_RADIUS_KM: f64 = 0.5;

#[derive(Deserialize, Clone, Debug, Validate)]
pub struct SettlementConfig {
    #[validate(length(min = 1))]
    pub service_name: String,
    #[validate(nested)]
    pub backend: BackendConfig,
    #[validate(nested)]
    pub geofence: GeofenceConfig,
    #[validate(nested)]
    pub device: DeviceConfig,
}

#[derive(Deserialize, Clone, Debug, Validate)]
pub struct BackendConfig {
    #[validate(url)]
    pub base_url: String,
    /// Sent as a bearer token when non-empty.
    pub api_token: Secret<String>,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub connect_timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug, Validate)]
pub struct GeofenceConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub office_latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub office_longitude: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub punch_in_radius_km: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub visit_radius_km: f64,
}

#[derive(Deserialize, Clone, Debug, Validate)]
pub struct DeviceConfig {
    #[validate(range(min = 1))]
    pub location_timeout_secs: u64,
}

impl SettlementConfig {
    /// Load from `settlement.{toml,yaml,json}` and `SETTLEMENT__*` variables.
    ///
    /// `backend.base_url` and the office coordinates have no default.
    pub fn load() -> Result<Self, AppError> {
        let config: Self = service_core::config::load_layered(
            "settlement",
            "SETTLEMENT",
            &[
                ("service_name", "settlement-engine".into()),
                ("backend.api_token", "".into()),
                ("backend.request_timeout_secs", 30i64.into()),
                ("backend.connect_timeout_secs", 10i64.into()),
                ("geofence.punch_in_radius_km", DEFAULT_PUNCH_IN_RADIUS_KM.into()),
                ("geofence.visit_radius_km", DEFAULT_VISIT_RADIUS_KM.into()),
                ("device.location_timeout_secs", 15i64.into()),
            ],
        )?;

        config.validate()?;
        Ok(config)
    }
}

impl GeofenceConfig {
    pub fn office(&self) -> Coordinate {
        Coordinate::new(self.office_latitude, self.office_longitude)
    }

    pub fn punch_in_fence(&self) -> Geofence {
        Geofence::new(self.office(), self.punch_in_radius_km)
    }
}

impl DeviceConfig {
    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }
}
