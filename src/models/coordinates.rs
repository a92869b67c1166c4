use crate::constants::EARTH_RADIUS_KM;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            ));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lng
            ));
        }
        Ok(Coordinates { lat, lng })
    }

    /// Calculate distance between two coordinates using Haversine formula
    /// Returns distance in kilometers
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }

    /// Point reached by travelling `distance_km` along the great circle that
    /// leaves this point at `bearing_deg` (clockwise from north).
    pub fn destination(&self, distance_km: f64, bearing_deg: f64) -> Coordinates {
        let bearing = bearing_deg.to_radians();
        let lat1 = self.lat.to_radians();
        let lng1 = self.lng.to_radians();
        let angular = distance_km / EARTH_RADIUS_KM;

        let sin_lat2 = lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos();
        let lat2 = sin_lat2.asin();
        let y = bearing.sin() * angular.sin() * lat1.cos();
        let x = angular.cos() - lat1.sin() * sin_lat2;
        let lng2 = lng1 + y.atan2(x);

        // Normalize to [-180, 180) so the result always passes validation
        let lng_deg = (lng2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;

        Coordinates {
            lat: lat2.to_degrees(),
            lng: lng_deg,
        }
    }

    /// Round coordinates to specified decimal places for caching
    pub fn round(&self, decimal_places: u32) -> Self {
        let multiplier = 10_f64.powi(decimal_places as i32);
        Coordinates {
            lat: (self.lat * multiplier).round() / multiplier,
            lng: (self.lng * multiplier).round() / multiplier,
        }
    }
}

/// Parses the `"lat,lng"` form used in query strings.
impl FromStr for Coordinates {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid coordinate pair: '{}' (expected 'lat,lng')", s))?;

        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("Invalid latitude in '{}'", s))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| format!("Invalid longitude in '{}'", s))?;

        Coordinates::new(lat, lng)
    }
}
