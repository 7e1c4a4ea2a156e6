//! Foreground coordinator.
//!
//! Mediates between the control surface, the light sensor subscription and
//! the reading sink. All state lives in one task: surface commands and sensor
//! samples are dispatched from a single `select!` loop.
//!
//! "Sensing" is one boolean. Visibility changes, the toggle control and the
//! stop control all go through [`Coordinator::set_sensing`], and the toggle
//! label is derived from that boolean, so label and subscription never
//! disagree.

use crate::error::Result;
use crate::reminder::Reminders;
use crate::report::{LightReport, ReadingSink};
use crate::sensors::{SensorEvent, SensorHub, SensorKind};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Readings strictly above this many lux are forwarded.
pub const LIGHT_THRESHOLD: f32 = 50.0;

pub fn exceeds_threshold(value: f32) -> bool {
    value > LIGHT_THRESHOLD
}

/// Text shown on the toggle control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ToggleLabel {
    /// Sensing is off; pressing starts it.
    #[strum(serialize = "Start")]
    Start,
    /// Sensing is on; pressing stops it.
    #[strum(serialize = "Stop")]
    Stop,
}

/// Input from the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Shown,
    Hidden,
    ToggleSensing,
    Stop,
    Status,
    Quit,
}

pub struct Coordinator {
    sensors: SensorHub,
    sink: Arc<dyn ReadingSink>,
    reminders: Option<Reminders>,
    visible: bool,
    sensing: bool,
    label: watch::Sender<ToggleLabel>,
}

impl Coordinator {
    /// Coordinator without reminders, hidden and not sensing.
    pub fn new(sensors: SensorHub, sink: Arc<dyn ReadingSink>) -> Self {
        let (label, _) = watch::channel(ToggleLabel::Start);
        Self {
            sensors,
            sink,
            reminders: None,
            visible: false,
            sensing: false,
            label,
        }
    }

    /// Create the coordinator and start both reminder mechanisms.
    ///
    /// This is the only place reminders are started, so they are started once
    /// per process.
    pub fn launch(
        sensors: SensorHub,
        sink: Arc<dyn ReadingSink>,
        mut reminders: Reminders,
    ) -> Result<Self> {
        reminders.start()?;
        let mut coordinator = Self::new(sensors, sink);
        coordinator.reminders = Some(reminders);
        Ok(coordinator)
    }

    pub fn is_sensing(&self) -> bool {
        self.sensing
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_subscribed(&self) -> bool {
        self.sensors.is_subscribed()
    }

    pub fn label(&self) -> ToggleLabel {
        *self.label.borrow()
    }

    /// Follow label changes, e.g. to redraw the toggle control.
    pub fn label_updates(&self) -> watch::Receiver<ToggleLabel> {
        self.label.subscribe()
    }

    pub fn reminders(&self) -> Option<&Reminders> {
        self.reminders.as_ref()
    }

    /// Handle one surface command. Returns `false` on [`UiEvent::Quit`].
    pub fn handle_ui(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::Shown => {
                self.visible = true;
                self.set_sensing(true);
            }
            UiEvent::Hidden => {
                self.visible = false;
                self.set_sensing(false);
            }
            UiEvent::ToggleSensing => {
                if self.visible {
                    self.set_sensing(!self.sensing);
                } else {
                    debug!("[Console] Toggle ignored while hidden");
                }
            }
            UiEvent::Stop => self.set_sensing(false),
            UiEvent::Status => info!(
                "[Console] visible={} sensing={} subscribed={} sensor={} label={}",
                self.visible,
                self.sensing,
                self.sensors.is_subscribed(),
                self.sensors.has_sensor(),
                self.label()
            ),
            UiEvent::Quit => return false,
        }
        true
    }

    /// Single path for every change of the sensing state.
    fn set_sensing(&mut self, on: bool) {
        if on {
            self.sensors.subscribe();
        } else {
            self.sensors.unsubscribe();
        }
        self.sensing = on;

        let label = if on { ToggleLabel::Stop } else { ToggleLabel::Start };
        self.label.send_if_modified(|current| {
            let changed = *current != label;
            *current = label;
            changed
        });
    }

    /// Evaluate one sample. Light samples above the threshold are submitted.
    pub fn on_sensor_event(&self, event: SensorEvent) {
        if !self.sensing || event.kind != SensorKind::Light {
            return;
        }

        if exceeds_threshold(event.value) {
            info!("[Sensor] Light level {} above threshold, forwarding", event.value);
            self.sink.submit(LightReport::new(event.value));
        } else {
            debug!("[Sensor] Light level {} below threshold, no action taken", event.value);
        }
    }

    /// Dispatch surface commands and sensor samples until quit, then shut down.
    pub async fn run(
        mut self,
        mut ui: mpsc::Receiver<UiEvent>,
        mut samples: mpsc::Receiver<SensorEvent>,
    ) {
        loop {
            tokio::select! {
                // Surface commands first, so a sample never overtakes a stop
                biased;
                event = ui.recv() => match event {
                    Some(event) => {
                        if !self.handle_ui(event) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(sample) = samples.recv() => self.on_sensor_event(sample),
            }
        }
        self.shutdown();
    }

    /// Stop sensing and cancel in-process reminders.
    pub fn shutdown(&mut self) {
        self.set_sensing(false);
        if let Some(reminders) = self.reminders.as_mut() {
            reminders.teardown();
        }
        info!("[Console] Coordinator stopped");
    }
}
