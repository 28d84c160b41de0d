//! URL layout of the REST API.

/// Default gateway base URL (a local API gateway emulator).
pub const DEFAULT_BASE_URL: &str = "http://localhost:4566/restapis";
pub const DEFAULT_STAGE: &str = "dev";
pub const DEFAULT_TRAFFIC_ENDPOINT: &str = "traffic";
pub const DEFAULT_ALERTS_ENDPOINT: &str = "alerts";

/// Locates the traffic and alert resources behind the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub base_url: String,
    pub api_id: String,
    pub stage: String,
    pub traffic_endpoint: String,
    pub alerts_endpoint: String,
}

impl ApiEndpoints {
    pub fn new(
        base_url: impl Into<String>,
        api_id: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_id: api_id.into(),
            stage: stage.into(),
            traffic_endpoint: DEFAULT_TRAFFIC_ENDPOINT.to_string(),
            alerts_endpoint: DEFAULT_ALERTS_ENDPOINT.to_string(),
        }
    }

    pub fn with_traffic_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.traffic_endpoint = endpoint.into();
        self
    }

    pub fn with_alerts_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.alerts_endpoint = endpoint.into();
        self
    }

    /// URL returning the latest reading of every sensor.
    pub fn traffic_url(&self) -> String {
        self.resource(&self.traffic_endpoint)
    }

    /// URL returning the readings of one sensor.
    pub fn sensor_traffic_url(&self, sensor_id: &str) -> String {
        with_street_filter(self.traffic_url(), sensor_id)
    }

    /// URL returning recent alerts, optionally for one sensor.
    pub fn alerts_url(&self, sensor_id: Option<&str>) -> String {
        let url = self.resource(&self.alerts_endpoint);
        match sensor_id {
            Some(id) => with_street_filter(url, id),
            None => url,
        }
    }

    fn resource(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}/_user_request_/{}",
            self.base_url.trim_end_matches('/'),
            self.api_id,
            self.stage,
            endpoint.trim_start_matches('/')
        )
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, "", DEFAULT_STAGE)
    }
}

fn with_street_filter(url: String, sensor_id: &str) -> String {
    format!("{}?street_id={}", url, urlencoded(sensor_id))
}

// Percent-encode everything outside the unreserved set
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> ApiEndpoints {
        ApiEndpoints::new("http://localhost:4566/restapis/", "iianki73yo", "dev")
    }

    #[test]
    fn test_gateway_layout() {
        let api = endpoints();
        assert_eq!(
            api.traffic_url(),
            "http://localhost:4566/restapis/iianki73yo/dev/_user_request_/traffic"
        );
        assert_eq!(
            api.alerts_url(None),
            "http://localhost:4566/restapis/iianki73yo/dev/_user_request_/alerts"
        );
    }

    #[test]
    fn test_street_filter() {
        let api = endpoints();
        assert!(api.sensor_traffic_url("S001").ends_with("/traffic?street_id=S001"));
        assert!(api.alerts_url(Some("S003")).ends_with("/alerts?street_id=S003"));
    }

    #[test]
    fn test_custom_endpoints() {
        let api = endpoints()
            .with_traffic_endpoint("/readings")
            .with_alerts_endpoint("incidents");
        assert!(api.traffic_url().ends_with("/_user_request_/readings"));
        assert!(api.alerts_url(None).ends_with("/_user_request_/incidents"));
    }

    #[test]
    fn test_urlencoded() {
        assert_eq!(urlencoded("S001"), "S001");
        assert_eq!(urlencoded("ring road/7"), "ring%20road%2F7");
        assert_eq!(urlencoded("a&b=c"), "a%26b%3Dc");
    }
}
