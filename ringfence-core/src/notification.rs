//! Notifications
//!
//! The notification model handed to notifier backends. Transition
//! notifications always reuse one notification slot, so a newer
//! transition replaces the one on screen instead of piling up.

use serde::Serialize;

/// Notification slot shared by all transition notifications
pub const TRANSITION_NOTIFICATION_ID: u32 = 0;

/// Channel transition notifications are posted on
pub const TRANSITION_CHANNEL: &str = "zone-transitions";

/// Icon name for transition notifications
pub const TRANSITION_ICON: &str = "ringfence";

/// Surface to open when a notification is activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchTarget {
    /// The map surface showing the monitored zones
    MapSurface,
}

/// A notification to present to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Slot id; posting to an occupied slot replaces its content
    pub id: u32,
    pub title: String,
    pub body: String,
    /// Channel the notification is posted on
    pub channel: &'static str,
    /// Icon name
    pub icon: &'static str,
    /// Surface opened when the notification is activated
    pub launch: LaunchTarget,
}

impl Notification {
    /// Build a transition notification in the shared slot
    pub fn transition(title: &str, body: String) -> Self {
        Notification {
            id: TRANSITION_NOTIFICATION_ID,
            title: title.to_string(),
            body,
            channel: TRANSITION_CHANNEL,
            icon: TRANSITION_ICON,
            launch: LaunchTarget::MapSurface,
        }
    }
}
