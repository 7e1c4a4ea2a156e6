//! Simulated light sensor for development.
//!
//! Sweeps the light level up and down between 0 and 100 lux so both sides of
//! the forwarding threshold are exercised without real hardware.

use super::{Sensor, SensorKind};
use crate::error::Result;
use std::sync::atomic::{AtomicU32, Ordering};

/// Samples per full dark-bright-dark sweep.
const SWEEP_SAMPLES: u32 = 100;
const PEAK_LUX: f32 = 100.0;

pub struct SimulatedLightSensor {
    step: AtomicU32,
}

impl SimulatedLightSensor {
    pub fn new() -> Self {
        Self {
            step: AtomicU32::new(0),
        }
    }
}

impl Default for SimulatedLightSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for SimulatedLightSensor {
    fn name(&self) -> &str {
        "simulated"
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Light
    }

    fn read(&self) -> Result<f32> {
        let step = self.step.fetch_add(1, Ordering::Relaxed) % SWEEP_SAMPLES;
        let half = SWEEP_SAMPLES / 2;
        let distance = if step <= half { step } else { SWEEP_SAMPLES - step };
        Ok(PEAK_LUX * distance as f32 / half as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_crosses_threshold_both_ways() {
        let sensor = SimulatedLightSensor::new();
        let samples: Vec<f32> = (0..SWEEP_SAMPLES + 1)
            .map(|_| sensor.read().unwrap())
            .collect();

        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[50], PEAK_LUX);
        assert_eq!(samples[100], 0.0);
        assert!(samples.iter().any(|v| *v > 50.0));
        assert!(samples.iter().any(|v| *v < 50.0));
    }
}
