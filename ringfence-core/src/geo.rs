//! Coordinates and Geodesic Distance
//!
//! Positions are WGS-84 latitude/longitude pairs in decimal degrees.
//! Distances are measured along the WGS-84 ellipsoid via the [`Geodesic`]
//! metric, matching what location platforms report, rather than a flat
//! or spherical approximation.

use geo::{Distance, Geodesic, Point};
use std::fmt;

/// A WGS-84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    /// Latitude in decimal degrees, positive north
    pub lat: f64,
    /// Longitude in decimal degrees, positive east
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// A location fix reported by the positioning system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Position of the fix
    pub position: LatLng,
    /// Estimated horizontal accuracy in meters, if known
    pub accuracy: Option<f32>,
}

impl Fix {
    pub fn new(position: LatLng) -> Self {
        Fix {
            position,
            accuracy: None,
        }
    }

    pub fn with_accuracy(position: LatLng, accuracy: f32) -> Self {
        Fix {
            position,
            accuracy: Some(accuracy),
        }
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accuracy {
            Some(acc) => write!(f, "{} hAcc={}", self.position, acc),
            None => write!(f, "{}", self.position),
        }
    }
}

/// Distance in meters between two positions along the WGS-84 ellipsoid
pub fn distance_meters(from: LatLng, to: LatLng) -> f64 {
    // geo points are (x, y) = (lng, lat)
    Geodesic::distance(
        Point::new(from.lng, from.lat),
        Point::new(to.lng, to.lat),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = LatLng::new(50.0, 30.0);
        assert!(distance_meters(p, p) < 1e-9);
    }

    #[test]
    fn test_distance_along_meridian() {
        // A thousandth of a degree of latitude is roughly 111 m
        let a = LatLng::new(50.0, 30.0);
        let b = LatLng::new(50.001, 30.0);
        let d = distance_meters(a, b);
        assert!(d > 100.0 && d < 125.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = LatLng::new(50.0, 30.0);
        let b = LatLng::new(50.01, 30.01);
        let d1 = distance_meters(a, b);
        let d2 = distance_meters(b, a);
        assert!((d1 - d2).abs() < 1e-6);
    }

    #[test]
    fn test_fix_display_with_accuracy() {
        let fix = Fix::with_accuracy(LatLng::new(50.0, 30.0), 12.0);
        assert_eq!(format!("{}", fix), "50.000000,30.000000 hAcc=12");
    }

    #[test]
    fn test_fix_display_without_accuracy() {
        let fix = Fix::new(LatLng::new(-1.5, -0.25));
        assert_eq!(format!("{}", fix), "-1.500000,-0.250000");
    }
}
