//! Sensor subscriptions.
//!
//! A subscription is a polling task that samples the sensor at a fixed period
//! and pushes each sample into the coordinator's event channel. Unsubscribing
//! aborts the task.

use super::{Sensor, SensorEvent};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Owns the optional sensor and at most one active subscription to it.
///
/// With no sensor present, [`subscribe`](Self::subscribe) and
/// [`unsubscribe`](Self::unsubscribe) do nothing.
pub struct SensorHub {
    sensor: Option<Arc<dyn Sensor>>,
    events: mpsc::Sender<SensorEvent>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SensorHub {
    pub fn new(
        sensor: Option<Arc<dyn Sensor>>,
        events: mpsc::Sender<SensorEvent>,
        period: Duration,
    ) -> Self {
        Self {
            sensor,
            events,
            period,
            task: Mutex::new(None),
        }
    }

    pub fn has_sensor(&self) -> bool {
        self.sensor.is_some()
    }

    pub fn is_subscribed(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Start delivering samples. Must be called from within a tokio runtime.
    pub fn subscribe(&self) {
        let Some(sensor) = self.sensor.clone() else {
            return;
        };

        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        info!("[Sensor] Listening to '{}' every {:?}", sensor.name(), self.period);
        let events = self.events.clone();
        let period = self.period;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match sensor.read() {
                    Ok(value) => {
                        let event = SensorEvent {
                            kind: sensor.kind(),
                            value,
                        };
                        if events.send(event).await.is_err() {
                            debug!("[Sensor] Event channel closed, stopping poll");
                            break;
                        }
                    }
                    Err(e) => debug!("[Sensor] Sample skipped: {}", e),
                }
            }
        }));
    }

    /// Stop delivering samples.
    pub fn unsubscribe(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("[Sensor] Stopped listening");
        }
    }
}

impl Drop for SensorHub {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::sensors::SensorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StepSensor {
        reads: AtomicU32,
    }

    impl Sensor for StepSensor {
        fn name(&self) -> &str {
            "step"
        }

        fn kind(&self) -> SensorKind {
            SensorKind::Light
        }

        fn read(&self) -> Result<f32> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                return Err(AppError::SensorRead("flaky".to_string()));
            }
            Ok(n as f32)
        }
    }

    fn hub(sensor: Option<Arc<dyn Sensor>>) -> (SensorHub, mpsc::Receiver<SensorEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (SensorHub::new(sensor, tx, Duration::from_millis(200)), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_delivers_samples_and_skips_failures() {
        let sensor = Arc::new(StepSensor {
            reads: AtomicU32::new(0),
        });
        let (hub, mut rx) = hub(Some(sensor as Arc<dyn Sensor>));

        hub.subscribe();
        assert!(hub.is_subscribed());

        assert_eq!(rx.recv().await, Some(SensorEvent::light(0.0)));
        // The second read fails and is skipped
        assert_eq!(rx.recv().await, Some(SensorEvent::light(2.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_twice_keeps_one_task() {
        let sensor = Arc::new(StepSensor {
            reads: AtomicU32::new(0),
        });
        let (hub, _rx) = hub(Some(sensor.clone() as Arc<dyn Sensor>));

        hub.subscribe();
        hub.subscribe();
        tokio::time::sleep(Duration::from_millis(450)).await;

        // One task, ticking at 0, 200 and 400 ms
        assert_eq!(sensor.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_delivery() {
        let sensor = Arc::new(StepSensor {
            reads: AtomicU32::new(0),
        });
        let (hub, _rx) = hub(Some(sensor.clone() as Arc<dyn Sensor>));

        hub.subscribe();
        tokio::time::sleep(Duration::from_millis(50)).await;
        hub.unsubscribe();
        assert!(!hub.is_subscribed());

        let reads = sensor.reads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sensor.reads.load(Ordering::SeqCst), reads);
    }

    #[tokio::test]
    async fn test_missing_sensor_is_noop() {
        let (hub, _rx) = hub(None);

        assert!(!hub.has_sensor());
        hub.subscribe();
        assert!(!hub.is_subscribed());
        hub.unsubscribe();
        assert!(!hub.is_subscribed());
    }
}
