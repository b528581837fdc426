//! Zone Model
//!
//! A zone is a circle on the Earth's surface: a center position and a
//! radius in meters. Every zone in this system watches both crossing
//! directions and never expires on its own; removal is always an
//! explicit user action.

use bitflags::bitflags;
use std::fmt;
use std::time::Duration;

use crate::geo::{distance_meters, LatLng};

bitflags! {
    /// Which boundary crossings a zone reports
    ///
    /// Values match the platform transition codes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TransitionMask: u32 {
        /// Device moved from outside to inside the zone
        const ENTER = 0x01;
        /// Device moved from inside to outside the zone
        const EXIT = 0x02;
    }
}

/// Process-local zone identifier
///
/// Allocated by the registry, monotonically increasing, never reused
/// within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A circular monitored zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    /// Registry-assigned identifier
    pub id: ZoneId,
    /// Center of the circle
    pub center: LatLng,
    /// Radius in meters
    pub radius: f32,
    /// Crossings this zone reports
    pub transitions: TransitionMask,
    /// Monitoring lifetime; `None` means the zone never expires
    pub expiration: Option<Duration>,
}

impl Zone {
    /// Create a zone watching both crossing directions, with no expiration
    pub fn new(id: ZoneId, center: LatLng, radius: f32) -> Self {
        Zone {
            id,
            center,
            radius,
            transitions: TransitionMask::ENTER | TransitionMask::EXIT,
            expiration: None,
        }
    }

    /// Whether the position lies inside the zone
    ///
    /// The boundary counts as inside.
    pub fn contains(&self, position: LatLng) -> bool {
        distance_meters(self.center, position) <= self.radius as f64
    }
}
