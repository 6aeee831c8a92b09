//! Geographic primitives shared across tracking, hospital search, and routing.
//!
//! All distances are great-circle (haversine) distances in kilometers over a
//! spherical Earth model. Inputs are decimal degrees.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in kilometers used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationPoint {
    /// Latitude in decimal degrees, positive north.
    #[schema(example = 28.6139)]
    pub lat: f64,

    /// Longitude in decimal degrees, positive east.
    #[schema(example = 77.2090)]
    pub lng: f64,
}

impl LocationPoint {
    /// Creates a point from decimal-degree coordinates.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometers.
    #[must_use]
    pub fn distance_km(&self, other: Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}
