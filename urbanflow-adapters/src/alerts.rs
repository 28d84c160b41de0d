//! Alerts over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use urbanflow_core::{AlertSource, SourceError};
use urbanflow_types::Alert;

use crate::client::{build_client, get_array, DEFAULT_TIMEOUT};
use crate::{AdapterError, ApiEndpoints};

/// Reads recent alerts, newest first, from the alerts resource.
///
/// A 404 is treated as "no alerts", which is what the API answers for a
/// sensor it has never seen.
#[derive(Debug, Clone)]
pub struct HttpAlertSource {
    client: Client,
    endpoints: ApiEndpoints,
    description: String,
}

impl HttpAlertSource {
    pub fn builder() -> HttpAlertSourceBuilder {
        HttpAlertSourceBuilder::default()
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Fetch alerts, optionally filtered to one sensor.
    pub async fn alerts(&self, sensor_id: Option<&str>) -> Result<Vec<Alert>, AdapterError> {
        let url = self.endpoints.alerts_url(sensor_id);
        let alerts = get_array(&self.client, &url).await?.unwrap_or_default();
        debug!(count = alerts.len(), sensor_id, "fetched alerts");
        Ok(alerts)
    }
}

#[async_trait]
impl AlertSource for HttpAlertSource {
    async fn fetch_alerts(&self, sensor_id: Option<&str>) -> Result<Vec<Alert>, SourceError> {
        Ok(self.alerts(sensor_id).await?)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`HttpAlertSource`].
#[derive(Debug, Default)]
pub struct HttpAlertSourceBuilder {
    endpoints: Option<ApiEndpoints>,
    timeout: Option<Duration>,
}

impl HttpAlertSourceBuilder {
    pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpAlertSource, AdapterError> {
        let endpoints = self.endpoints.unwrap_or_default();
        let client = build_client(self.timeout.unwrap_or(DEFAULT_TIMEOUT))?;
        let description = format!("http: {}", endpoints.alerts_url(None));

        Ok(HttpAlertSource {
            client,
            endpoints,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let source = HttpAlertSource::builder()
            .endpoints(
                ApiEndpoints::new("http://gateway.local", "x1", "dev")
                    .with_alerts_endpoint("incidents"),
            )
            .build()
            .unwrap();
        assert_eq!(
            source.description(),
            "http: http://gateway.local/x1/dev/_user_request_/incidents"
        );
        assert_eq!(source.endpoints().api_id, "x1");
    }
}
