//! Alerts raised by the anomaly detector.

use crate::GeoPoint;

/// An alert as returned by the alerts API.
///
/// The API returns alerts newest first. Only `alert_id` is relied upon for
/// identity; the other fields are passed through untouched.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub sensor_id: String,
    #[serde(default)]
    pub street_name: String,
    /// Timestamp as sent by the source.
    #[serde(default)]
    pub timestamp: String,
    /// Type tag, e.g. `"SPEED_DROP"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub location: GeoPoint,
    /// Free-form payload.
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Alert {
    /// Create an alert with empty details, mostly useful for tests and fixtures.
    pub fn new(alert_id: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self {
            alert_id: alert_id.into(),
            sensor_id: sensor_id.into(),
            street_name: String::new(),
            timestamp: String::new(),
            kind: String::new(),
            location: GeoPoint::default(),
            details: serde_json::Value::Null,
        }
    }
}
