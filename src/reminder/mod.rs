//! Two-hourly "come back to the app" reminders.
//!
//! Two independent mechanisms post reminders on the same cadence:
//!
//! - [`alarm`]: a persisted repeating registration (first firing two hours
//!   after registration, then every two hours) whose receiver can also be run
//!   from an external host scheduler via `light-reminder fire-alarm`.
//! - [`background`]: an in-process loop that reminds immediately and then every
//!   two hours for as long as the process lives.
//!
//! They are not coordinated and use different notification identities, so
//! both can be on screen at once. Each replaces its own previous notification.

pub mod alarm;
pub mod background;
pub mod display;

pub use alarm::{AlarmRegistration, AlarmScheduler, AlarmStore};
pub use background::BackgroundReminderLoop;
pub use display::{DesktopNotifier, DisplayOutcome, Notifier, Permission, show_reminder};

use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Cadence shared by both mechanisms.
pub const REMINDER_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// Fixed identity a notification is posted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderIdentity {
    pub channel_id: &'static str,
    pub notification_id: u32,
}

/// Fixed content of a reminder notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSpec {
    pub identity: ReminderIdentity,
    pub title: &'static str,
    pub body: &'static str,
}

/// Posted by the alarm receiver.
pub const ALARM_REMINDER: ReminderSpec = ReminderSpec {
    identity: ReminderIdentity {
        channel_id: "my_channel_id",
        notification_id: 123,
    },
    title: "Reminder",
    body: "Two hours have passed. Please open the app!",
};

/// Posted by the background loop.
pub const LOOP_REMINDER: ReminderSpec = ReminderSpec {
    identity: ReminderIdentity {
        channel_id: "default_channel_id",
        notification_id: 1,
    },
    title: "Reminder",
    body: "Try using the app every two hours!",
};

/// Both reminder mechanisms, started together at launch.
pub struct Reminders {
    background: BackgroundReminderLoop,
    alarm: AlarmScheduler,
}

impl Reminders {
    pub fn new(notifier: Arc<dyn Notifier>, store: AlarmStore) -> Self {
        Self {
            background: BackgroundReminderLoop::new(notifier.clone()),
            alarm: AlarmScheduler::new(store, notifier),
        }
    }

    /// Start the background loop, then register the repeating alarm.
    pub fn start(&mut self) -> Result<AlarmRegistration> {
        self.background.start();
        self.alarm.register()
    }

    pub fn background(&self) -> &BackgroundReminderLoop {
        &self.background
    }

    pub fn alarm(&self) -> &AlarmScheduler {
        &self.alarm
    }

    /// Cancel the pending in-process firings. The persisted alarm registration stays.
    pub fn teardown(&mut self) {
        self.background.teardown();
        self.alarm.teardown();
    }
}
