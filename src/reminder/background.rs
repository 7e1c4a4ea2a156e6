//! In-process repeating reminder.
//!
//! Reminds once on start and then every [`REMINDER_INTERVAL`] until torn
//! down. Nothing is persisted, so a restarted process starts counting from
//! zero again.
//!
//! Each firing goes through [`show_reminder`], so it checks notification
//! permission first, the same as the alarm receiver. A denied firing is
//! skipped and the loop keeps its cadence.

use super::{LOOP_REMINDER, Notifier, REMINDER_INTERVAL, ReminderSpec, show_reminder};
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

pub struct BackgroundReminderLoop {
    notifier: Arc<dyn Notifier>,
    spec: ReminderSpec,
    period: Duration,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl BackgroundReminderLoop {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            spec: LOOP_REMINDER,
            period: REMINDER_INTERVAL,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|(_, task)| !task.is_finished())
    }

    /// Start the loop. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let cancel = CancellationToken::new();
        let notifier = self.notifier.clone();
        let spec = self.spec;
        let period = self.period;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        show_reminder(notifier.as_ref(), &spec).await;
                    }
                }
            }
        });

        info!("[Reminder] Background reminders every {:?}", period);
        self.running = Some((cancel, task));
    }

    /// Cancel the pending firing.
    pub fn teardown(&mut self) {
        if let Some((cancel, _task)) = self.running.take() {
            cancel.cancel();
            info!("[Reminder] Background reminders stopped");
        }
    }
}

impl Drop for BackgroundReminderLoop {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::display::tests::RecordingNotifier;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_fires_immediately_then_every_interval() {
        let notifier = Arc::new(RecordingNotifier::granted());
        let mut reminders = BackgroundReminderLoop::new(notifier.clone());

        reminders.start();
        tokio::time::sleep(MINUTE).await;
        assert_eq!(notifier.shown_count(), 1);

        tokio::time::sleep(REMINDER_INTERVAL - 2 * MINUTE).await;
        assert_eq!(notifier.shown_count(), 1);

        tokio::time::sleep(2 * MINUTE).await;
        assert_eq!(notifier.shown_count(), 2);

        tokio::time::sleep(REMINDER_INTERVAL * 3).await;
        assert_eq!(notifier.shown_count(), 5);
        assert!(notifier.shown.lock().iter().all(|spec| *spec == LOOP_REMINDER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_firing() {
        let notifier = Arc::new(RecordingNotifier::granted());
        let mut reminders = BackgroundReminderLoop::new(notifier.clone());

        reminders.start();
        tokio::time::sleep(MINUTE).await;
        reminders.teardown();
        assert!(!reminders.is_running());

        tokio::time::sleep(REMINDER_INTERVAL * 2).await;
        assert_eq!(notifier.shown_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_keeps_single_loop() {
        let notifier = Arc::new(RecordingNotifier::granted());
        let mut reminders = BackgroundReminderLoop::new(notifier.clone());

        reminders.start();
        reminders.start();
        tokio::time::sleep(MINUTE).await;

        assert_eq!(notifier.shown_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_continue_without_permission() {
        let notifier = Arc::new(RecordingNotifier::denied());
        let mut reminders = BackgroundReminderLoop::new(notifier.clone());

        reminders.start();
        tokio::time::sleep(REMINDER_INTERVAL + MINUTE).await;

        // Permission is checked on each firing, at start and after one interval
        assert_eq!(notifier.permission_checks(), 2);
        assert_eq!(notifier.shown_count(), 0);
        assert!(reminders.is_running());
    }
}
