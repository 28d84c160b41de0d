//! Traffic readings over HTTP.
//!
//! ## Example
//!
//! ```rust,no_run
//! use urbanflow_adapters::{ApiEndpoints, HttpTrafficSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpTrafficSource::builder()
//!         .endpoints(ApiEndpoints::new("http://localhost:4566/restapis", "abc123", "dev"))
//!         .build()?;
//!
//!     for reading in source.readings().await? {
//!         println!("{}: {} km/h", reading.street_id, reading.average_speed_kph);
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use urbanflow_core::{SourceError, TrafficSource};
use urbanflow_types::RawReading;

use crate::client::{build_client, get_array, get_one, DEFAULT_TIMEOUT};
use crate::{AdapterError, ApiEndpoints};

/// Reads the latest reading of every sensor from the traffic resource.
#[derive(Debug, Clone)]
pub struct HttpTrafficSource {
    client: Client,
    endpoints: ApiEndpoints,
    description: String,
}

impl HttpTrafficSource {
    pub fn builder() -> HttpTrafficSourceBuilder {
        HttpTrafficSourceBuilder::default()
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Fetch the current readings of all sensors.
    pub async fn readings(&self) -> Result<Vec<RawReading>, AdapterError> {
        let url = self.endpoints.traffic_url();
        let readings = get_array(&self.client, &url)
            .await?
            .ok_or_else(|| AdapterError::Http(format!("traffic resource not found at {}", url)))?;
        debug!(count = readings.len(), "fetched traffic readings");
        Ok(readings)
    }

    /// Fetch the latest reading of one sensor.
    ///
    /// `None` for an unknown sensor or one that has not reported yet.
    pub async fn sensor_reading(&self, sensor_id: &str) -> Result<Option<RawReading>, AdapterError> {
        let url = self.endpoints.sensor_traffic_url(sensor_id);
        get_one(&self.client, &url).await
    }
}

#[async_trait]
impl TrafficSource for HttpTrafficSource {
    async fn fetch_readings(&self) -> Result<Vec<RawReading>, SourceError> {
        Ok(self.readings().await?)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`HttpTrafficSource`].
#[derive(Debug, Default)]
pub struct HttpTrafficSourceBuilder {
    endpoints: Option<ApiEndpoints>,
    timeout: Option<Duration>,
}

impl HttpTrafficSourceBuilder {
    /// Set where the API lives (default: [`ApiEndpoints::default`]).
    pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpTrafficSource, AdapterError> {
        let endpoints = self.endpoints.unwrap_or_default();
        let client = build_client(self.timeout.unwrap_or(DEFAULT_TIMEOUT))?;
        let description = format!("http: {}", endpoints.traffic_url());

        Ok(HttpTrafficSource {
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
    fn test_builder_defaults() {
        let source = HttpTrafficSource::builder().build().unwrap();
        assert_eq!(source.endpoints(), &ApiEndpoints::default());
        assert_eq!(
            source.description(),
            "http: http://localhost:4566/restapis//dev/_user_request_/traffic"
        );
    }

    #[test]
    fn test_builder_custom() {
        let source = HttpTrafficSource::builder()
            .endpoints(ApiEndpoints::new("http://gateway.local", "x1", "prod"))
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(
            source.description(),
            "http: http://gateway.local/x1/prod/_user_request_/traffic"
        );
    }
}
