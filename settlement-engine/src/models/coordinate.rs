use serde::{Deserialize, Serialize};

/// A WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Latitude as the decimal string the backend expects in the `lat` part.
    pub fn lat_string(&self) -> String {
        self.latitude.to_string()
    }

    /// Longitude as the decimal string the backend expects in the `long` part.
    pub fn long_string(&self) -> String {
        self.longitude.to_string()
    }
}
