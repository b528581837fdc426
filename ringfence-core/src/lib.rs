//! Ringfence Core
//!
//! Platform-independent building blocks for geofence monitoring: the
//! zone model and registry, WGS-84 geodesic containment, and the
//! mapping from raw transition reports to user notifications.
//!
//! This crate performs no I/O and starts no tasks; the daemon crate
//! wires it to a location platform and a notification backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use ringfence_core::geo::LatLng;
//! use ringfence_core::registry::ZoneRegistry;
//!
//! let mut registry = ZoneRegistry::new();
//! let id = registry.add(LatLng::new(50.0, 30.0), 500.0)?;
//!
//! // A tap inside the zone later removes it
//! let removed = registry.delete_containing(LatLng::new(50.001, 30.0));
//! assert_eq!(removed, 1);
//! ```

pub mod geo;
pub mod notification;
pub mod registry;
pub mod transition;
pub mod zone;

pub use crate::geo::{distance_meters, Fix, LatLng};
pub use crate::notification::Notification;
pub use crate::registry::{RegistryError, ZoneRegistry};
pub use crate::transition::{notification_for, TransitionEvent, TransitionKind};
pub use crate::zone::{TransitionMask, Zone, ZoneId};
