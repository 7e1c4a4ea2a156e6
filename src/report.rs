//! Forwarding of bright light readings to the remote endpoint.
//!
//! Every qualifying reading becomes one independent `POST` carrying
//! `{"lightLevel": <value>}`. Sends are fire-and-forget: failures and non-2xx
//! responses are logged at debug level and otherwise discarded, with no retry.

use crate::error::{AppError, Result};
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

/// JSON body sent for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightReport {
    pub light_level: f32,
}

impl LightReport {
    pub fn new(light_level: f32) -> Self {
        Self { light_level }
    }
}

/// Destination for readings that crossed the threshold.
///
/// `submit` must not block and must not report back: each call is an
/// independent send whose outcome the caller never observes.
pub trait ReadingSink: Send + Sync {
    fn submit(&self, report: LightReport);
}

/// Posts readings over HTTP with an owned client.
#[derive(Clone)]
pub struct HttpReporter {
    client: Client,
    endpoint: Url,
}

impl HttpReporter {
    /// Create a reporter with a fresh client using default timeouts.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one report and return the response status.
    ///
    /// Non-2xx statuses are not errors here; only transport failures are.
    pub async fn post(&self, report: LightReport) -> Result<StatusCode> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&report)
            .send()
            .await?;
        Ok(response.status())
    }
}

impl ReadingSink for HttpReporter {
    /// Must be called from within a tokio runtime.
    fn submit(&self, report: LightReport) {
        let reporter = self.clone();
        tokio::spawn(async move {
            match reporter.post(report).await {
                Ok(status) if status.is_success() => {
                    debug!("[Report] Sent {} lux ({})", report.light_level, status);
                }
                Ok(status) => {
                    debug!(
                        "[Report] Endpoint answered {} for {} lux, dropped",
                        status, report.light_level
                    );
                }
                Err(e) => {
                    debug!(
                        "[Report] Send of {} lux failed, dropped: {}",
                        report.light_level, e
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let body = serde_json::to_string(&LightReport::new(60.0)).unwrap();
        assert_eq!(body, r#"{"lightLevel":60.0}"#);
    }

    #[test]
    fn test_payload_parses_back_to_single_key() {
        let body = serde_json::to_string(&LightReport::new(75.5)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 1);
        assert_eq!(object["lightLevel"].as_f64(), Some(75.5));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(matches!(
            HttpReporter::new("not a url"),
            Err(AppError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_default_endpoint_accepted() {
        let reporter = HttpReporter::new(crate::config::DEFAULT_ENDPOINT_URL).unwrap();
        assert_eq!(reporter.endpoint().as_str(), "http://localhost:8000/");
    }
}
