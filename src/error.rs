use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum AppError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("Light sensor read failed: {0}")]
    SensorRead(String),

    #[error("Light sensor not found at {0}")]
    SensorNotFound(String),

    #[error("Notification display failed: {0}")]
    NotificationFailed(String),

    #[error("Invalid alarm registration: {0}")]
    InvalidAlarm(String),

    #[error("No alarm registered (expected {0})")]
    AlarmNotRegistered(String),

    #[error("State directory unavailable")]
    NoStateDir,

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
