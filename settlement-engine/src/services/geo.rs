//! Great-circle distance and geofence gates.

use crate::error::{PreconditionReason, SettlementError};
use crate::models::Coordinate;

/// IUGG mean Earth radius.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

/// Default punch-in radius around the office.
pub const DEFAULT_PUNCH_IN_RADIUS_KM: f64 = 1.5;

/// Haversine distance between two coordinates in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let half_dlat = (b.latitude - a.latitude).to_radians() / 2.0;
    let half_dlon = (b.longitude - a.longitude).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);

    2.0 * EARTH_MEAN_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Inclusive at the boundary.
pub fn within_radius(distance_km: f64, threshold_km: f64) -> bool {
    distance_km <= threshold_km
}

/// A circular gate around a reference coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub center: Coordinate,
    pub radius_km: f64,
}

impl Geofence {
    pub fn new(center: Coordinate, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    /// Returns the measured distance when `position` is inside the fence.
    pub fn check(&self, position: Coordinate) -> Result<f64, SettlementError> {
        let distance = distance_km(self.center, position);
        if within_radius(distance, self.radius_km) {
            Ok(distance)
        } else {
            tracing::debug!(
                distance_km = distance,
                radius_km = self.radius_km,
                "Position outside geofence"
            );
            Err(SettlementError::precondition(PreconditionReason::OutOfRange {
                distance_km: distance,
                radius_km: self.radius_km,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICE: Coordinate = Coordinate {
        latitude: 12.9716,
        longitude: 77.5946,
    };

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_km(OFFICE, OFFICE), 0.0);
        let pole = Coordinate::new(90.0, 0.0);
        assert_eq!(distance_km(pole, pole), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let mysuru = Coordinate::new(12.2958, 76.6394);
        let ab = distance_km(OFFICE, mysuru);
        let ba = distance_km(mysuru, OFFICE);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_known_pairs_match_haversine() {
        // Bengaluru to Mysuru.
        let d = distance_km(OFFICE, Coordinate::new(12.2958, 76.6394));
        assert!((d - 128.017_032_847).abs() < 1e-6, "got {}", d);

        // Mumbai to Pune.
        let d = distance_km(
            Coordinate::new(19.0760, 72.8777),
            Coordinate::new(18.5204, 73.8567),
        );
        assert!((d - 120.152_467_931).abs() < 1e-6, "got {}", d);
    }

    #[test]
    fn test_one_kilometre_along_meridian() {
        let north = Coordinate::new(OFFICE.latitude + 0.008_993_203_637, OFFICE.longitude);
        let d = distance_km(OFFICE, north);
        assert!((d - 1.0).abs() / 1.0 < 0.005, "got {}", d);
    }

    #[test]
    fn test_within_radius_is_inclusive() {
        assert!(within_radius(1.5, 1.5));
        assert!(within_radius(1.499, 1.5));
        assert!(!within_radius(1.500_001, 1.5));
    }

    #[test]
    fn test_geofence_check() {
        let fence = Geofence::new(OFFICE, DEFAULT_PUNCH_IN_RADIUS_KM);
        let near = Coordinate::new(OFFICE.latitude + 0.009, OFFICE.longitude);
        assert!(fence.check(near).is_ok());

        let far = Coordinate::new(OFFICE.latitude + 0.02, OFFICE.longitude);
        let err = fence.check(far).unwrap_err();
        assert_eq!(err.reason().map(|r| r.code()), Some("OUT_OF_RANGE"));
    }

    #[test]
    fn test_non_finite_position_is_out_of_range() {
        let fence = Geofence::new(OFFICE, DEFAULT_PUNCH_IN_RADIUS_KM);
        assert!(fence.check(Coordinate::new(f64::NAN, 77.0)).is_err());
    }
}
