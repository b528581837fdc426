//! Transition Decoding
//!
//! Turns raw transition reports from the location platform into user
//! notifications. Reports carry a transition kind code and the fix that
//! triggered them; reports flagged as errored, and reports with a kind
//! this system does not watch, are silently discarded.

use crate::geo::Fix;
use crate::notification::Notification;

/// Platform wire value for an enter transition
pub const TRANSITION_ENTER: i32 = 1;
/// Platform wire value for an exit transition
pub const TRANSITION_EXIT: i32 = 2;

/// A boundary crossing this system reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Enter,
    Exit,
}

impl TransitionKind {
    /// Decode a platform transition code
    ///
    /// Returns `None` for codes this system does not watch (e.g. dwell).
    pub fn from_code(code: i32) -> Option<TransitionKind> {
        match code {
            TRANSITION_ENTER => Some(TransitionKind::Enter),
            TRANSITION_EXIT => Some(TransitionKind::Exit),
            _ => None,
        }
    }

    /// Platform wire value for this kind
    pub fn code(&self) -> i32 {
        match self {
            TransitionKind::Enter => TRANSITION_ENTER,
            TransitionKind::Exit => TRANSITION_EXIT,
        }
    }

    /// Notification title for this kind
    pub fn title(&self) -> &'static str {
        match self {
            TransitionKind::Enter => "zone-enter",
            TransitionKind::Exit => "zone-leave",
        }
    }
}

/// A transition report as delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionEvent {
    /// Platform error code, if the report is errored
    pub error: Option<i32>,
    /// Raw transition kind code
    pub kind: i32,
    /// The fix that triggered the report
    pub location: Fix,
}

impl TransitionEvent {
    /// A well-formed report for the given kind
    pub fn new(kind: TransitionKind, location: Fix) -> Self {
        TransitionEvent {
            error: None,
            kind: kind.code(),
            location,
        }
    }

    /// An errored report
    pub fn failed(error: i32, location: Fix) -> Self {
        TransitionEvent {
            error: Some(error),
            kind: 0,
            location,
        }
    }
}

/// Map a transition report to the notification it should produce
///
/// Errored reports and reports with an unwatched kind produce nothing.
pub fn notification_for(event: &TransitionEvent) -> Option<Notification> {
    if event.error.is_some() {
        return None;
    }
    let kind = TransitionKind::from_code(event.kind)?;
    Some(Notification::transition(
        kind.title(),
        event.location.to_string(),
    ))
}
