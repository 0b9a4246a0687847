//! Reminder notifications.
//!
//! The platform tray itself sits behind
//! [`NotifierPort`](crate::app::ports::NotifierPort); this module only
//! owns what each reminder says and where tapping it leads.

/// Notification id for the hydration reminder.
pub const HYDRATION_NOTIFICATION_ID: u32 = 1001;
/// Notification id for the cycle reminder.
pub const CYCLE_NOTIFICATION_ID: u32 = 2001;

pub const HYDRATION_CHANNEL: &str = "water_intake_channel";
pub const CYCLE_CHANNEL: &str = "period_tracker_channel";

/// Where tapping the notification takes the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    /// Start a verification session; `alarm` beeps until verified.
    OpenVerification { alarm: bool },
    /// Show the cycle tracker.
    OpenCycles,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u32,
    pub channel: &'static str,
    pub title: &'static str,
    pub body: &'static str,
    pub action: NotificationAction,
}

impl Notification {
    pub fn hydration_reminder() -> Self {
        Self {
            id: HYDRATION_NOTIFICATION_ID,
            channel: HYDRATION_CHANNEL,
            title: "Hydration Time!",
            body: "It's time to drink water. Verify now!",
            action: NotificationAction::OpenVerification { alarm: true },
        }
    }

    pub fn cycle_reminder() -> Self {
        Self {
            id: CYCLE_NOTIFICATION_ID,
            channel: CYCLE_CHANNEL,
            title: "Cycle Reminder",
            body: "Your period is expected soon or is late. Please log it if it has started.",
            action: NotificationAction::OpenCycles,
        }
    }
}
