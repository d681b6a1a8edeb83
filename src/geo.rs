//! Geographic helpers for distance-based pricing

use haversine::{Location as HaversineLocation, Units, distance};
use serde::{Deserialize, Serialize};

/// Point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in kilometres (Earth radius 6371 km)
    #[must_use]
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let from = HaversineLocation {
            latitude: self.lat,
            longitude: self.lon,
        };
        let to = HaversineLocation {
            latitude: other.lat,
            longitude: other.lon,
        };
        distance(from, to, Units::Kilometers)
    }
}

/// Used when the origin city is not in the table
pub const DEFAULT_ORIGIN: GeoPoint = GeoPoint::new(45.0, 10.0);
/// Used when the destination city is not in the table
pub const DEFAULT_DESTINATION: GeoPoint = GeoPoint::new(50.0, 15.0);

const CITY_COORDINATES: &[(&str, GeoPoint)] = &[
    ("Roma", GeoPoint::new(41.9, 12.5)),
    ("Milano", GeoPoint::new(45.5, 9.2)),
    ("Napoli", GeoPoint::new(40.8, 14.3)),
    ("Firenze", GeoPoint::new(43.8, 11.2)),
    ("Venezia", GeoPoint::new(45.4, 12.3)),
    ("Torino", GeoPoint::new(45.1, 7.7)),
    ("Parigi", GeoPoint::new(48.9, 2.3)),
    ("Londra", GeoPoint::new(51.5, -0.1)),
    ("Madrid", GeoPoint::new(40.4, -3.7)),
    ("Barcellona", GeoPoint::new(41.4, 2.2)),
    ("Amsterdam", GeoPoint::new(52.4, 4.9)),
    ("Berlino", GeoPoint::new(52.5, 13.4)),
    ("Vienna", GeoPoint::new(48.2, 16.4)),
    ("Praga", GeoPoint::new(50.1, 14.4)),
];

/// Approximate coordinates of a known city, matched case-insensitively
#[must_use]
pub fn city_coordinates(city: &str) -> Option<GeoPoint> {
    let city = city.trim();
    CITY_COORDINATES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(city))
        .map(|(_, point)| *point)
}
