//! Reminder notification display.
//!
//! [`show_reminder`] is the single display path used by both reminder
//! mechanisms: check permission, then post. It never fails outward; the
//! outcome is returned for logging and tests.

use super::ReminderSpec;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use log::{debug, info, warn};

/// Whether reminders may be posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Result of one display attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    Shown,
    PermissionDenied,
    Failed,
}

/// Host notification facility.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn permission(&self) -> Permission;

    /// Post `spec`, replacing any notification with the same id.
    async fn show(&self, spec: &ReminderSpec) -> Result<()>;
}

/// Check permission and post the reminder.
///
/// Without permission the reminder is skipped. Permission is not requested
/// and the attempt is not retried later.
pub async fn show_reminder(notifier: &dyn Notifier, spec: &ReminderSpec) -> DisplayOutcome {
    if notifier.permission().await == Permission::Denied {
        info!(
            "[Reminder] Notifications not permitted, skipping '{}' #{}",
            spec.identity.channel_id, spec.identity.notification_id
        );
        return DisplayOutcome::PermissionDenied;
    }

    match notifier.show(spec).await {
        Ok(()) => {
            debug!(
                "[Reminder] Posted '{}' #{}",
                spec.identity.channel_id, spec.identity.notification_id
            );
            DisplayOutcome::Shown
        }
        Err(e) => {
            warn!("[Reminder] {}", e);
            DisplayOutcome::Failed
        }
    }
}

/// Desktop notifications through the freedesktop notification server
/// (or the native facility on macOS and Windows).
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    /// Granted when a notification server answers on the session bus.
    #[cfg(all(unix, not(target_os = "macos")))]
    async fn permission(&self) -> Permission {
        let server = tokio::task::spawn_blocking(|| {
            notify_rust::get_server_information().map_err(|e| e.to_string())
        });
        match server.await {
            Ok(Ok(server)) => {
                debug!("[Reminder] Notification server: {} {}", server.name, server.version);
                Permission::Granted
            }
            Ok(Err(e)) => {
                debug!("[Reminder] No notification server: {}", e);
                Permission::Denied
            }
            Err(_) => Permission::Denied,
        }
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    async fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn show(&self, spec: &ReminderSpec) -> Result<()> {
        let app_name = self.app_name.clone();
        let spec = *spec;
        tokio::task::spawn_blocking(move || {
            let mut notification = notify_rust::Notification::new();
            notification
                .summary(spec.title)
                .body(spec.body)
                .appname(&app_name)
                .icon("dialog-information");

            #[cfg(all(unix, not(target_os = "macos")))]
            {
                notification
                    .id(spec.identity.notification_id)
                    .urgency(notify_rust::Urgency::Normal)
                    .hint(notify_rust::Hint::Category(spec.identity.channel_id.to_string()));
            }

            notification
                .show()
                .map(|_| ())
                .map_err(|e| AppError::NotificationFailed(e.to_string()))
        })
        .await
        .map_err(|e| AppError::NotificationFailed(e.to_string()))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reminder::{ALARM_REMINDER, LOOP_REMINDER};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every posted reminder and counts permission checks.
    pub(crate) struct RecordingNotifier {
        pub permission: Permission,
        pub fail: bool,
        pub shown: Mutex<Vec<ReminderSpec>>,
        pub permission_checks: AtomicUsize,
    }

    impl RecordingNotifier {
        pub fn granted() -> Self {
            Self {
                permission: Permission::Granted,
                fail: false,
                shown: Mutex::new(Vec::new()),
                permission_checks: AtomicUsize::new(0),
            }
        }

        pub fn denied() -> Self {
            Self {
                permission: Permission::Denied,
                ..Self::granted()
            }
        }

        pub fn shown_count(&self) -> usize {
            self.shown.lock().len()
        }

        pub fn permission_checks(&self) -> usize {
            self.permission_checks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn permission(&self) -> Permission {
            self.permission_checks.fetch_add(1, Ordering::SeqCst);
            self.permission
        }

        async fn show(&self, spec: &ReminderSpec) -> Result<()> {
            if self.fail {
                return Err(AppError::NotificationFailed("no server".to_string()));
            }
            self.shown.lock().push(*spec);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shown_with_permission() {
        let notifier = RecordingNotifier::granted();

        let outcome = show_reminder(&notifier, &ALARM_REMINDER).await;

        assert_eq!(outcome, DisplayOutcome::Shown);
        assert_eq!(*notifier.shown.lock(), vec![ALARM_REMINDER]);
    }

    #[tokio::test]
    async fn test_skipped_without_permission() {
        let notifier = RecordingNotifier::denied();

        let outcome = show_reminder(&notifier, &LOOP_REMINDER).await;

        assert_eq!(outcome, DisplayOutcome::PermissionDenied);
        assert_eq!(notifier.shown_count(), 0);
    }

    #[tokio::test]
    async fn test_display_failure_is_swallowed() {
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::granted()
        };

        let outcome = show_reminder(&notifier, &LOOP_REMINDER).await;

        assert_eq!(outcome, DisplayOutcome::Failed);
    }
}
