//! One-shot camera and location acquisition through the host device.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Coordinate, PaymentMethod};
use crate::services::evidence::{self, EvidenceBundle, Photo, PhotoKind};

/// Default time allowed for a location fix.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Camera and geolocation owned by the host application.
#[async_trait]
pub trait DeviceServices: Send + Sync {
    async fn current_location(&self) -> Result<Coordinate, DeviceError>;

    async fn capture_photo(&self, kind: PhotoKind) -> Result<Photo, DeviceError>;
}

/// Request a location fix. A timeout is final; the caller decides whether to ask again.
pub async fn acquire_location<D>(device: &D, timeout: Duration) -> Result<Coordinate, DeviceError>
where
    D: DeviceServices + ?Sized,
{
    let position = tokio::time::timeout(timeout, device.current_location())
        .await
        .map_err(|_| {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Location request timed out");
            DeviceError::Timeout(timeout)
        })??;

    if !position.is_valid() {
        return Err(DeviceError::DeviceUnavailable(format!(
            "invalid fix ({}, {})",
            position.latitude, position.longitude
        )));
    }
    Ok(position)
}

/// Capture every photo `method` requires plus a location fix into a fresh bundle.
pub async fn collect_evidence<D>(
    device: &D,
    method: PaymentMethod,
    location_timeout: Duration,
) -> Result<EvidenceBundle, DeviceError>
where
    D: DeviceServices + ?Sized,
{
    let mut bundle = EvidenceBundle::new();
    for kind in evidence::requirement(method).photos {
        bundle.set_photo(device.capture_photo(*kind).await?);
    }

    let position = acquire_location(device, location_timeout).await?;
    Ok(bundle.with_coordinates(position))
}
