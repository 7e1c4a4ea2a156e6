use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder endpoint used until a deployment sets `LIGHT_ENDPOINT_URL`.
pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:8000";

/// Load `KEY=value` pairs from a `.env` file in the working directory.
///
/// Values may be wrapped in single or double quotes. Variables already present
/// in the environment win over the file.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            // SAFETY: called from main before the tokio runtime spawns any threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key.trim(), value))
        })
        .collect()
}

/// Where light readings come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorSource {
    /// First IIO device exposing an illuminance channel.
    Auto,
    /// Generated readings, for machines without a light sensor.
    Simulated,
    /// Run without a sensor. Subscriptions become no-ops.
    Disabled,
    /// A specific IIO device directory.
    Device(PathBuf),
}

impl SensorSource {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "auto" => SensorSource::Auto,
            "simulated" | "sim" => SensorSource::Simulated,
            "none" | "off" => SensorSource::Disabled,
            path => SensorSource::Device(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub report: ReportConfig,
    pub sensor: SensorConfig,
    pub reminder: ReminderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub endpoint_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub source: SensorSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Application name shown by the notification server.
    pub app_name: String,
    /// Directory holding the persisted alarm registration.
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report: ReportConfig {
                endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            },
            sensor: SensorConfig {
                source: SensorSource::Auto,
            },
            reminder: ReminderConfig {
                app_name: "Light Reminder".to_string(),
                state_dir: dirs::data_local_dir().map(|dir| dir.join("light-reminder")),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("LIGHT_ENDPOINT_URL") {
            config.report.endpoint_url = url;
        }
        if let Ok(source) = std::env::var("LIGHT_SENSOR") {
            config.sensor.source = SensorSource::parse(&source);
        }
        if let Ok(dir) = std::env::var("LIGHT_REMINDER_STATE_DIR") {
            config.reminder.state_dir = Some(PathBuf::from(dir));
        }
        if let Ok(name) = std::env::var("LIGHT_REMINDER_APP_NAME") {
            config.reminder.app_name = name;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_strips_quotes_and_comments() {
        let content = "# comment\n\nLIGHT_ENDPOINT_URL=\"http://10.0.2.2:8000\"\nLIGHT_SENSOR = simulated\nLIGHT_REMINDER_APP_NAME='My App'\nnot a pair\n";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("LIGHT_ENDPOINT_URL", "http://10.0.2.2:8000"),
                ("LIGHT_SENSOR", "simulated"),
                ("LIGHT_REMINDER_APP_NAME", "My App"),
            ]
        );
    }

    #[test]
    fn test_sensor_source_parse() {
        assert_eq!(SensorSource::parse("auto"), SensorSource::Auto);
        assert_eq!(SensorSource::parse(""), SensorSource::Auto);
        assert_eq!(SensorSource::parse("simulated"), SensorSource::Simulated);
        assert_eq!(SensorSource::parse("none"), SensorSource::Disabled);
        assert_eq!(
            SensorSource::parse("/sys/bus/iio/devices/iio:device0"),
            SensorSource::Device(PathBuf::from("/sys/bus/iio/devices/iio:device0"))
        );
    }

    #[test]
    fn test_default_endpoint_is_placeholder() {
        let config = Config::default();
        assert_eq!(config.report.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.sensor.source, SensorSource::Auto);
    }
}
