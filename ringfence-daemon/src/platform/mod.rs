//! Location Platform Seam
//!
//! The daemon talks to the platform's geofencing facility through the
//! [`PlatformClient`] trait. Calls only initiate work: connection
//! progress and operation outcomes come back asynchronously as
//! [`PlatformEvent`]s, and zone transitions are delivered to the
//! [`TransitionTarget`] the zone set was registered with.

pub mod monitor;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

use ringfence_core::geo::Fix;
use ringfence_core::transition::TransitionEvent;
use ringfence_core::zone::Zone;

/// Platform call failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("platform client is not connected")]
    NotConnected,

    #[error("fine location permission not granted")]
    PermissionDenied,

    #[error("cannot monitor an empty zone set")]
    EmptyRegistration,

    #[error("platform rejected the request (status {code})")]
    Rejected { code: i32 },
}

/// Outcome of an asynchronous platform operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: i32,
    pub message: Option<String>,
}

impl Status {
    pub const SUCCESS: i32 = 0;

    pub fn success() -> Self {
        Status {
            code: Self::SUCCESS,
            message: None,
        }
    }

    pub fn failure(code: i32) -> Self {
        Status {
            code,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Self::SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "code {}: {}", self.code, message),
            None => write!(f, "code {}", self.code),
        }
    }
}

/// Asynchronous callbacks from the platform connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The client is connected and ready for zone operations
    Connected,
    /// The connection was lost; a reconnect should be issued
    Suspended { cause: i32 },
    /// A connection attempt failed
    ConnectionFailed { code: i32 },
    /// Result of an earlier register or deregister call
    OperationResult(Status),
}

/// Whether registration reports zones already containing the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialTrigger {
    /// Only report actual boundary crossings
    None,
    /// Report an immediate enter for zones already containing the device
    Enter,
}

/// A full replacement zone set for the platform to monitor
#[derive(Debug, Clone)]
pub struct MonitorRequest {
    pub zones: Vec<Zone>,
    pub initial_trigger: InitialTrigger,
}

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Where the platform delivers zone transitions
///
/// The daemon creates one target lazily and reuses it for every
/// register and deregister call: deregistration matches by target
/// identity, so it must be the same handle that registered.
#[derive(Debug, Clone)]
pub struct TransitionTarget {
    id: u64,
    events: mpsc::Sender<TransitionEvent>,
}

impl TransitionTarget {
    pub fn new(events: mpsc::Sender<TransitionEvent>) -> Self {
        TransitionTarget {
            id: NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed),
            events,
        }
    }

    /// Identity used to match register and deregister calls
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Deliver a transition; best effort, a full queue drops the event
    pub fn deliver(&self, event: TransitionEvent) -> bool {
        self.events.try_send(event).is_ok()
    }
}

/// Client side of the platform's geofencing facility
///
/// All methods only initiate work. Connect completion, suspension and
/// operation outcomes arrive as [`PlatformEvent`]s on the channel the
/// implementation was constructed with.
pub trait PlatformClient: Send {
    /// Begin establishing the platform connection
    fn connect(&mut self);

    /// Replace the monitored zone set with the request's zones
    fn register(
        &mut self,
        request: MonitorRequest,
        target: &TransitionTarget,
    ) -> Result<(), PlatformError>;

    /// Stop monitoring everything registered to this target
    fn deregister(&mut self, target: &TransitionTarget) -> Result<(), PlatformError>;

    /// Inject a device location update, mock-provider style
    ///
    /// Fixes are ordered with the register and deregister calls made
    /// on the same client.
    fn report_fix(&mut self, fix: Fix);
}
