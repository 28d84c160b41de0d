//! Data source abstraction for traffic readings and alerts.
//!
//! The runtime never talks to the network directly; it is handed a
//! [`TrafficSource`] and an [`AlertSource`]. HTTP implementations live in
//! `urbanflow-adapters`, and [`SyntheticSource`] generates plausible
//! readings locally for simulation mode and as the fetch-failure fallback.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use thiserror::Error;

use urbanflow_types::{congestion_index, Alert, RawReading, SensorSet};

/// Errors a source can report for one fetch.
///
/// Every variant is recoverable; the runtime logs it and carries on at the
/// next tick.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure (connection refused, bad status, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response arrived but did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No response in time.
    #[error("request timed out")]
    Timeout,
}

/// Something that can be asked for the latest reading of every sensor.
#[async_trait]
pub trait TrafficSource: Send + Sync + Debug {
    /// Fetch the current readings. Order is preserved but not relied upon.
    async fn fetch_readings(&self) -> Result<Vec<RawReading>, SourceError>;

    /// Human-readable description, used in logs.
    fn description(&self) -> &str;
}

/// Something that can be asked for recent alerts, newest first.
#[async_trait]
pub trait AlertSource: Send + Sync + Debug {
    /// Fetch alerts, optionally only those for one sensor.
    ///
    /// An unknown sensor yields an empty list, not an error.
    async fn fetch_alerts(&self, sensor_id: Option<&str>) -> Result<Vec<Alert>, SourceError>;

    fn description(&self) -> &str;
}

/// Free-flow speed used by the generator.
const FREE_FLOW_KPH: f64 = 80.0;
/// Probability that a sensor is in a rush-hour burst on a given cycle.
const RUSH_PROBABILITY: f64 = 0.4;

/// Generates randomized readings for a fixed sensor set.
///
/// Each cycle every sensor is independently either in a rush-hour burst
/// (around 20 km/h, 50-149 vehicles) or flowing freely (around 70 km/h,
/// 5-24 vehicles), with up to 10 km/h of noise.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    sensors: SensorSet,
    description: String,
}

impl SyntheticSource {
    pub fn new(sensors: SensorSet) -> Self {
        let description = format!("synthetic: {} sensors", sensors.len());
        Self {
            sensors,
            description,
        }
    }

    pub fn sensors(&self) -> &SensorSet {
        &self.sensors
    }

    /// Generate one reading per sensor using the thread-local RNG.
    pub fn generate(&self) -> Vec<RawReading> {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Generate one reading per sensor from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<RawReading> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        self.sensors
            .iter()
            .map(|sensor| {
                let rush = rng.gen_bool(RUSH_PROBABILITY);
                let base_speed: f64 = if rush { 20.0 } else { 70.0 };
                let variation = rng.gen_range(-10.0..10.0);
                let speed = (base_speed + variation).clamp(0.0, 100.0);
                let vehicles = if rush {
                    rng.gen_range(50..150)
                } else {
                    rng.gen_range(5..25)
                };
                let ci = (congestion_index(FREE_FLOW_KPH, speed) * 100.0).round() / 100.0;

                RawReading {
                    street_id: sensor.id.clone(),
                    street_name: Some(sensor.name.clone()),
                    average_speed_kph: speed.floor(),
                    speed_limit_kph: Some(FREE_FLOW_KPH),
                    vehicle_count: vehicles as f64,
                    congestion_index: Some(ci),
                    timestamp_utc: Some(timestamp.clone()),
                    latitude: Some(sensor.location.lat),
                    longitude: Some(sensor.location.lng),
                }
            })
            .collect()
    }
}

#[async_trait]
impl TrafficSource for SyntheticSource {
    async fn fetch_readings(&self) -> Result<Vec<RawReading>, SourceError> {
        Ok(self.generate())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use urbanflow_types::vienna_sensors;

    #[test]
    fn test_generates_one_reading_per_sensor() {
        let source = SyntheticSource::new(vienna_sensors());
        let readings = source.generate_with(&mut StdRng::seed_from_u64(7));

        let ids: Vec<&str> = readings.iter().map(|r| r.street_id.as_str()).collect();
        assert_eq!(ids, ["S001", "S002", "S003", "S004", "S005", "S006"]);
        assert_eq!(readings[0].latitude, Some(48.205));
        assert_eq!(readings[0].street_name.as_deref(), Some("A23 Südosttangente / Praterbrücke"));
    }

    #[test]
    fn test_values_stay_in_range() {
        let source = SyntheticSource::new(vienna_sensors());
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            for reading in source.generate_with(&mut rng) {
                assert!((0.0..=100.0).contains(&reading.average_speed_kph));
                assert_eq!(reading.average_speed_kph.fract(), 0.0);
                assert!((5.0..150.0).contains(&reading.vehicle_count));
                let ci = reading.congestion_index.unwrap();
                assert!(ci >= 0.0);
                assert_eq!((ci * 100.0).round() / 100.0, ci);
            }
        }
    }

    #[test]
    fn test_rush_hour_produces_congestion() {
        let source = SyntheticSource::new(vienna_sensors());
        let mut rng = StdRng::seed_from_u64(1);

        // Rush-hour speeds top out at 30 km/h, which is always above 0.5
        let saw_congestion = (0..50)
            .flat_map(|_| source.generate_with(&mut rng))
            .any(|r| r.congestion_index.unwrap() > 0.5);
        assert!(saw_congestion);
    }

    #[tokio::test]
    async fn test_source_trait() {
        let source = SyntheticSource::new(vienna_sensors());
        let readings = source.fetch_readings().await.unwrap();
        assert_eq!(readings.len(), 6);
        assert_eq!(source.description(), "synthetic: 6 sensors");
    }
}
