//! Zone Registry
//!
//! The registry is the in-memory source of truth for which zones the
//! user wants monitored. Zones are keyed by their exact geometry:
//! adding a zone with the same center and radius as an existing one
//! replaces it, so repeated taps on the same spot stay one zone.

use std::collections::HashMap;
use thiserror::Error;

use crate::geo::LatLng;
use crate::zone::{Zone, ZoneId};

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RegistryError {
    /// Radius must be a positive, finite number of meters
    #[error("invalid zone radius {0} m")]
    InvalidRadius(f32),
}

/// Geometry key: bit-exact center and radius
///
/// Two zones are "the same" only when their coordinates and radius are
/// bit-for-bit identical, not merely close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ZoneKey {
    lat: u64,
    lng: u64,
    radius: u32,
}

impl ZoneKey {
    fn new(center: LatLng, radius: f32) -> Self {
        ZoneKey {
            lat: center.lat.to_bits(),
            lng: center.lng.to_bits(),
            radius: radius.to_bits(),
        }
    }
}

/// In-memory registry of monitored zones
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: HashMap<ZoneKey, Zone>,
    next_id: u32,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        ZoneRegistry::default()
    }

    /// Add a zone, replacing any existing zone with identical geometry
    ///
    /// Returns the id assigned to the new zone. A replaced zone's id is
    /// discarded and never handed out again.
    pub fn add(&mut self, center: LatLng, radius: f32) -> Result<ZoneId, RegistryError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RegistryError::InvalidRadius(radius));
        }
        self.next_id += 1;
        let id = ZoneId(self.next_id);
        self.zones
            .insert(ZoneKey::new(center, radius), Zone::new(id, center, radius));
        Ok(id)
    }

    /// Remove every zone whose circle contains the position
    ///
    /// A position exactly on a zone boundary removes that zone. Returns
    /// the number of zones removed.
    pub fn delete_containing(&mut self, position: LatLng) -> usize {
        let before = self.zones.len();
        self.zones.retain(|_, zone| !zone.contains(position));
        before - self.zones.len()
    }

    /// Whether no zones are registered
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Number of registered zones
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// All registered zones, in no particular order
    pub fn snapshot(&self) -> Vec<Zone> {
        self.zones.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: LatLng = LatLng {
        lat: 50.0,
        lng: 30.0,
    };

    #[test]
    fn test_add_assigns_increasing_ids() {
        let mut registry = ZoneRegistry::new();
        let a = registry.add(CENTER, 500.0).unwrap();
        let b = registry.add(LatLng::new(51.0, 30.0), 500.0).unwrap();
        assert!(b > a);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_add_rejects_bad_radius() {
        let mut registry = ZoneRegistry::new();
        assert_eq!(
            registry.add(CENTER, 0.0),
            Err(RegistryError::InvalidRadius(0.0))
        );
        assert_eq!(
            registry.add(CENTER, -1.0),
            Err(RegistryError::InvalidRadius(-1.0))
        );
        assert!(registry.add(CENTER, f32::NAN).is_err());
        assert!(registry.add(CENTER, f32::INFINITY).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_identical_geometry_replaces() {
        let mut registry = ZoneRegistry::new();
        let first = registry.add(CENTER, 500.0).unwrap();
        let second = registry.add(CENTER, 500.0).unwrap();
        assert_eq!(registry.len(), 1);
        assert_ne!(first, second);
        assert_eq!(registry.snapshot()[0].id, second);
    }

    #[test]
    fn test_same_center_different_radius_is_distinct() {
        let mut registry = ZoneRegistry::new();
        registry.add(CENTER, 500.0).unwrap();
        registry.add(CENTER, 501.0).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_delete_containing_removes_zone_around_point() {
        let mut registry = ZoneRegistry::new();
        registry.add(CENTER, 500.0).unwrap();
        // ~111 m from the center, well inside the 500 m radius
        let removed = registry.delete_containing(LatLng::new(50.001, 30.0));
        assert_eq!(removed, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_delete_outside_leaves_zone() {
        let mut registry = ZoneRegistry::new();
        registry.add(CENTER, 500.0).unwrap();
        // ~1.1 km away
        let removed = registry.delete_containing(LatLng::new(50.01, 30.0));
        assert_eq!(removed, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_delete_removes_every_containing_zone() {
        let mut registry = ZoneRegistry::new();
        registry.add(CENTER, 500.0).unwrap();
        registry.add(LatLng::new(50.003, 30.0), 500.0).unwrap();
        // Far zone that does not contain the probe point
        registry.add(LatLng::new(50.1, 30.0), 500.0).unwrap();

        // Probe between the two near centers, inside both circles
        let probe = LatLng::new(50.0015, 30.0);
        let removed = registry.delete_containing(probe);
        assert_eq!(removed, 2);
        assert_eq!(registry.len(), 1);
        for zone in registry.snapshot() {
            assert!(!zone.contains(probe));
        }
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut registry = ZoneRegistry::new();
        registry.add(CENTER, 500.0).unwrap();
        registry.delete_containing(CENTER);
        let next = registry.add(CENTER, 500.0).unwrap();
        assert_eq!(next, ZoneId(2));
    }
}
