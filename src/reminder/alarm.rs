//! Repeating wall-clock alarm.
//!
//! Registering records the first firing (two hours from now) and the repeat
//! interval in `alarm.json` under the state directory, replacing any earlier
//! registration. The file also records the last slot that was delivered, so
//! the in-process runner and `light-reminder fire-alarm` (run by cron or a
//! systemd timer) deliver each slot at most once between them.

use super::{ALARM_REMINDER, DisplayOutcome, Notifier, REMINDER_INTERVAL, show_reminder};
use crate::error::{AppError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const REGISTRATION_FILE: &str = "alarm.json";

/// Largest interval whose slots chrono can represent as a `TimeDelta`.
const MAX_INTERVAL_SECS: u64 = (i64::MAX / 1000) as u64;

/// Longest the runner sleeps before looking at the wall clock again.
///
/// Tokio timers stop while the machine is suspended, so a long sleep could
/// wake far past its slot.
pub const RECHECK_PERIOD: Duration = Duration::from_secs(60);

/// Source of wall-clock time for the alarm runner.
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A registered repeating alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRegistration {
    pub registered_at: DateTime<Utc>,
    pub first_fire: DateTime<Utc>,
    pub interval_secs: u64,
    /// Slot most recently delivered, if any.
    #[serde(default)]
    pub last_fired: Option<DateTime<Utc>>,
}

impl AlarmRegistration {
    /// First firing one interval after `now`.
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let interval_secs = REMINDER_INTERVAL.as_secs();
        Self {
            registered_at: now,
            first_fire: now + TimeDelta::seconds(interval_secs as i64),
            interval_secs,
            last_fired: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Reject intervals the slot arithmetic cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 || self.interval_secs > MAX_INTERVAL_SECS {
            return Err(AppError::InvalidAlarm(format!(
                "interval of {} s is out of range",
                self.interval_secs
            )));
        }
        Ok(())
    }

    fn interval_seconds(&self) -> Result<i64> {
        self.validate()?;
        Ok(self.interval_secs as i64)
    }

    /// Slot number `index`, counting `first_fire` as slot 0.
    fn slot(&self, index: i64) -> Result<DateTime<Utc>> {
        let interval = self.interval_seconds()?;
        index
            .checked_mul(interval)
            .and_then(TimeDelta::try_seconds)
            .and_then(|offset| self.first_fire.checked_add_signed(offset))
            .ok_or_else(|| AppError::InvalidAlarm(format!("slot {index} is out of range")))
    }

    /// Earliest firing strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let interval = self.interval_seconds()?;
        if now < self.first_fire {
            return Ok(self.first_fire);
        }
        let elapsed = (now - self.first_fire).num_seconds();
        self.slot(elapsed / interval + 1)
    }

    /// Latest slot at or before `now` that has not been delivered yet.
    ///
    /// Several slots missed in a row collapse into this one.
    pub fn due_slot(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let interval = self.interval_seconds()?;
        if now < self.first_fire {
            return Ok(None);
        }
        let elapsed = (now - self.first_fire).num_seconds();
        let slot = self.slot(elapsed / interval)?;
        Ok(match self.last_fired {
            Some(last) if slot <= last => None,
            _ => Some(slot),
        })
    }
}

/// Persistence of the alarm registration.
#[derive(Debug, Clone)]
pub struct AlarmStore {
    path: PathBuf,
}

impl AlarmStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(REGISTRATION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<AlarmRegistration>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let registration: AlarmRegistration = serde_json::from_str(&content)?;
                registration.validate()?;
                Ok(Some(registration))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`load`](Self::load), but a missing registration is an error.
    pub fn require(&self) -> Result<AlarmRegistration> {
        self.load()?
            .ok_or_else(|| AppError::AlarmNotRegistered(self.path.display().to_string()))
    }

    pub fn save(&self, registration: &AlarmRegistration) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(registration)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// The alarm receiver: show the alarm reminder if notifications are permitted.
pub async fn fire_receiver(notifier: &dyn Notifier) -> DisplayOutcome {
    info!("[Alarm] Fired");
    show_reminder(notifier, &ALARM_REMINDER).await
}

/// Run the receiver if a slot of the stored registration passed since the
/// last delivery, and record that slot as delivered.
///
/// Returns `None` when no slot is due.
pub async fn fire_if_due(
    store: &AlarmStore,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<Option<DisplayOutcome>> {
    let mut registration = store.require()?;
    let Some(slot) = registration.due_slot(now)? else {
        debug!("[Alarm] No slot due at {}", now);
        return Ok(None);
    };

    // Recorded before displaying so a concurrent caller sees the slot taken
    registration.last_fired = Some(slot);
    store.save(&registration)?;

    Ok(Some(fire_receiver(notifier).await))
}

/// Registers the alarm and runs it while the process lives.
pub struct AlarmScheduler {
    store: AlarmStore,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn WallClock>,
    runner: Option<(CancellationToken, JoinHandle<()>)>,
}

impl AlarmScheduler {
    pub fn new(store: AlarmStore, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_clock(store, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: AlarmStore,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn WallClock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            runner: None,
        }
    }

    pub fn store(&self) -> &AlarmStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_some()
    }

    /// Replace the registration with one first firing an interval from now
    /// and (re)start the runner on it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register(&mut self) -> Result<AlarmRegistration> {
        let registration = AlarmRegistration::starting_at(self.clock.now());
        self.store.save(&registration)?;
        info!(
            "[Alarm] Registered, first at {}, then every {:?}",
            registration.first_fire,
            registration.interval()
        );

        self.teardown();
        self.runner = Some(spawn_runner(
            self.store.clone(),
            self.notifier.clone(),
            self.clock.clone(),
        ));
        Ok(registration)
    }

    pub fn teardown(&mut self) {
        if let Some((cancel, _task)) = self.runner.take() {
            cancel.cancel();
            debug!("[Alarm] Runner stopped");
        }
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Deliver due slots of the stored registration until cancelled.
///
/// The next slot is recomputed from the wall clock on every pass, and no
/// single sleep is longer than [`RECHECK_PERIOD`].
fn spawn_runner(
    store: AlarmStore,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn WallClock>,
) -> (CancellationToken, JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        loop {
            let now = clock.now();
            if let Err(e) = fire_if_due(&store, notifier.as_ref(), now).await {
                warn!("[Alarm] Firing check failed: {}", e);
            }

            let wait = match store.require().and_then(|r| r.next_fire_after(now)) {
                Ok(next) => (next - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(RECHECK_PERIOD),
                Err(_) => RECHECK_PERIOD,
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    });

    (cancel, task)
}
