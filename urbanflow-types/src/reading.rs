//! Traffic readings: the wire record and its parsed form.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{congestion_index, GeoPoint};

/// Free-flow speed assumed when a record carries no speed limit.
pub const DEFAULT_FREE_FLOW_KPH: f64 = 80.0;

/// A reading as returned by the traffic API.
///
/// Numeric fields arrive as JSON numbers that may be floats even for
/// counts, so everything numeric is decoded as `f64`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawReading {
    pub street_id: String,
    #[serde(default)]
    pub street_name: Option<String>,
    pub average_speed_kph: f64,
    #[serde(default)]
    pub speed_limit_kph: Option<f64>,
    #[serde(default)]
    pub vehicle_count: f64,
    #[serde(default)]
    pub congestion_index: Option<f64>,
    #[serde(default)]
    pub timestamp_utc: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A point-in-time measurement for one sensor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Reading {
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    /// Average speed in km/h.
    pub avg_speed: f64,
    /// Vehicles counted during the interval.
    pub vehicle_count: u32,
    pub congestion_index: f64,
    /// Speed limit in km/h.
    pub speed_limit: f64,
}

impl Reading {
    /// Convert a wire record.
    ///
    /// A missing congestion index is derived from the speed limit (or the
    /// default free-flow speed). A timestamp that cannot be parsed is
    /// replaced by `received_at`.
    pub fn from_raw(raw: &RawReading, received_at: DateTime<Utc>) -> Self {
        let speed_limit = raw.speed_limit_kph.unwrap_or(DEFAULT_FREE_FLOW_KPH);
        let congestion_index = raw
            .congestion_index
            .unwrap_or_else(|| congestion_index(speed_limit, raw.average_speed_kph));
        let timestamp = raw
            .timestamp_utc
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(received_at);

        Self {
            sensor_id: raw.street_id.clone(),
            timestamp,
            avg_speed: raw.average_speed_kph,
            vehicle_count: raw.vehicle_count.max(0.0).round() as u32,
            congestion_index,
            speed_limit,
        }
    }
}

impl RawReading {
    /// Location reported alongside the reading, if both coordinates are present.
    pub fn location(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.latitude?, self.longitude?))
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
