//! Ambient light sensor access.
//!
//! Readings come from a [`Sensor`] implementation (Linux IIO sysfs, or a
//! simulation for development) and are delivered to the coordinator as
//! [`SensorEvent`]s while a subscription is active.

pub mod iio;
pub mod simulation;
pub mod subscription;

pub use iio::IioLightSensor;
pub use simulation::SimulatedLightSensor;
pub use subscription::SensorHub;

use crate::config::SensorSource;
use crate::error::Result;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Sampling period of the "normal" delivery rate.
pub const NORMAL_SAMPLING_PERIOD: Duration = Duration::from_millis(200);

/// Kind of physical quantity a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SensorKind {
    Light,
    Proximity,
}

/// One sample delivered by a subscription. Valid only for the instant it was read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    pub kind: SensorKind,
    pub value: f32,
}

impl SensorEvent {
    pub fn light(value: f32) -> Self {
        Self {
            kind: SensorKind::Light,
            value,
        }
    }
}

/// A pollable sensor.
pub trait Sensor: Send + Sync {
    /// Human readable name, used in logs.
    fn name(&self) -> &str;

    fn kind(&self) -> SensorKind;

    /// Take one sample.
    fn read(&self) -> Result<f32>;
}

/// Resolve the configured sensor source.
///
/// Returns `Ok(None)` when no sensor is available; callers treat that as a
/// device without a light sensor rather than an error. An explicitly
/// configured device that cannot be opened is an error.
pub fn open_sensor(source: &SensorSource) -> Result<Option<Arc<dyn Sensor>>> {
    let sensor: Option<Arc<dyn Sensor>> = match source {
        SensorSource::Auto => match iio::discover(std::path::Path::new(iio::IIO_DEVICES_DIR)) {
            Some(sensor) => Some(Arc::new(sensor)),
            None => {
                warn!("[Sensor] No ambient light sensor found, sensing disabled");
                None
            }
        },
        SensorSource::Simulated => Some(Arc::new(SimulatedLightSensor::new())),
        SensorSource::Disabled => None,
        SensorSource::Device(dir) => Some(Arc::new(IioLightSensor::open(dir)?)),
    };

    if let Some(sensor) = &sensor {
        info!("[Sensor] Using {} sensor '{}'", sensor.kind(), sensor.name());
    }
    Ok(sensor)
}
