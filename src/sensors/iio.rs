//! Linux Industrial I/O (IIO) ambient light sensor.
//!
//! Light sensors show up under `/sys/bus/iio/devices/iio:deviceN/` and expose
//! either a processed `in_illuminance_input` attribute (lux) or a
//! `in_illuminance_raw` attribute that has to be converted with the optional
//! `in_illuminance_offset` and `in_illuminance_scale` attributes.

use super::{Sensor, SensorKind};
use crate::error::{AppError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub const IIO_DEVICES_DIR: &str = "/sys/bus/iio/devices";

const INPUT_ATTR: &str = "in_illuminance_input";
const RAW_ATTR: &str = "in_illuminance_raw";
const SCALE_ATTR: &str = "in_illuminance_scale";
const OFFSET_ATTR: &str = "in_illuminance_offset";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Channel {
    /// Already in lux.
    Processed,
    /// `(raw + offset) * scale`
    Raw { scale: f32, offset: f32 },
}

/// Ambient light sensor backed by an IIO sysfs device directory.
#[derive(Debug)]
pub struct IioLightSensor {
    name: String,
    dir: PathBuf,
    channel: Channel,
}

impl IioLightSensor {
    /// Open the device directory and detect which illuminance channel it exposes.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        let channel = if dir.join(INPUT_ATTR).is_file() {
            Channel::Processed
        } else if dir.join(RAW_ATTR).is_file() {
            Channel::Raw {
                scale: read_optional(&dir.join(SCALE_ATTR))?.unwrap_or(1.0),
                offset: read_optional(&dir.join(OFFSET_ATTR))?.unwrap_or(0.0),
            }
        } else {
            return Err(AppError::SensorNotFound(dir.display().to_string()));
        };

        let name = fs::read_to_string(dir.join("name"))
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|_| {
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "iio".to_string())
            });

        Ok(Self { name, dir, channel })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Sensor for IioLightSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Light
    }

    fn read(&self) -> Result<f32> {
        match self.channel {
            Channel::Processed => read_value(&self.dir.join(INPUT_ATTR)),
            Channel::Raw { scale, offset } => {
                let raw = read_value(&self.dir.join(RAW_ATTR))?;
                Ok((raw + offset) * scale)
            }
        }
    }
}

/// Find the first IIO device under `root` with an illuminance channel.
pub fn discover(root: &Path) -> Option<IioLightSensor> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("iio:device"))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();

    dirs.into_iter().find_map(|dir| match IioLightSensor::open(&dir) {
        Ok(sensor) => Some(sensor),
        Err(e) => {
            debug!("[Sensor] Skipping {}: {}", dir.display(), e);
            None
        }
    })
}

fn read_value(path: &Path) -> Result<f32> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::SensorRead(format!("{}: {}", path.display(), e)))?;
    text.trim()
        .parse()
        .map_err(|e| AppError::SensorRead(format!("{}: {:?}: {}", path.display(), text.trim(), e)))
}

fn read_optional(path: &Path) -> Result<Option<f32>> {
    if path.is_file() {
        read_value(path).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn device(root: &Path, name: &str, attrs: &[(&str, &str)]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (attr, value) in attrs {
            fs::write(dir.join(attr), format!("{value}\n")).unwrap();
        }
        dir
    }

    #[test]
    fn test_processed_channel() {
        let root = TempDir::new().unwrap();
        let dir = device(
            root.path(),
            "iio:device0",
            &[("name", "als"), (INPUT_ATTR, "123.5")],
        );

        let sensor = IioLightSensor::open(&dir).unwrap();
        assert_eq!(sensor.name(), "als");
        assert_eq!(sensor.kind(), SensorKind::Light);
        assert_eq!(sensor.read().unwrap(), 123.5);
    }

    #[test]
    fn test_raw_channel_applies_offset_and_scale() {
        let root = TempDir::new().unwrap();
        let dir = device(
            root.path(),
            "iio:device1",
            &[(RAW_ATTR, "40"), (OFFSET_ATTR, "10"), (SCALE_ATTR, "0.5")],
        );

        let sensor = IioLightSensor::open(&dir).unwrap();
        assert_eq!(sensor.name(), "iio:device1");
        assert_eq!(sensor.read().unwrap(), 25.0);
    }

    #[test]
    fn test_open_without_illuminance_channel() {
        let root = TempDir::new().unwrap();
        let dir = device(root.path(), "iio:device0", &[("in_accel_x_raw", "1")]);

        assert!(matches!(
            IioLightSensor::open(&dir),
            Err(AppError::SensorNotFound(_))
        ));
    }

    #[test]
    fn test_read_garbage_is_error() {
        let root = TempDir::new().unwrap();
        let dir = device(root.path(), "iio:device0", &[(INPUT_ATTR, "n/a")]);

        let sensor = IioLightSensor::open(&dir).unwrap();
        assert!(matches!(sensor.read(), Err(AppError::SensorRead(_))));
    }

    #[test]
    fn test_discover_skips_non_light_devices() {
        let root = TempDir::new().unwrap();
        device(root.path(), "iio:device0", &[("in_accel_x_raw", "1")]);
        device(root.path(), "iio:device1", &[(INPUT_ATTR, "7")]);
        device(root.path(), "trigger0", &[(INPUT_ATTR, "9")]);

        let sensor = discover(root.path()).unwrap();
        assert_eq!(sensor.dir(), root.path().join("iio:device1"));
        assert_eq!(sensor.read().unwrap(), 7.0);
    }

    #[test]
    fn test_discover_missing_root() {
        assert!(discover(Path::new("/nonexistent/iio/root")).is_none());
    }
}
