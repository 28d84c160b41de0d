//! Classified records and per-cycle snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{classify, CongestionStatus, Reading};

/// Recent samples for one sensor, oldest first.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct RecordHistory {
    /// Average speed samples (km/h).
    pub avg_speed: Vec<f64>,
    /// Vehicle count samples.
    pub vehicle_count: Vec<u32>,
}

impl RecordHistory {
    pub fn len(&self) -> usize {
        self.avg_speed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avg_speed.is_empty()
    }
}

/// A reading enriched with its congestion status and recent history.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassifiedRecord {
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub avg_speed: f64,
    pub vehicle_count: u32,
    pub congestion_index: f64,
    pub speed_limit: f64,
    pub status: CongestionStatus,
    pub history: RecordHistory,
}

impl ClassifiedRecord {
    /// Classify a reading and attach the given history.
    pub fn new(reading: Reading, history: RecordHistory) -> Self {
        Self {
            status: classify(reading.congestion_index),
            sensor_id: reading.sensor_id,
            timestamp: reading.timestamp,
            avg_speed: reading.avg_speed,
            vehicle_count: reading.vehicle_count,
            congestion_index: reading.congestion_index,
            speed_limit: reading.speed_limit,
            history,
        }
    }
}

/// The complete per-sensor state valid for one poll cycle.
///
/// A snapshot always replaces the previous one wholesale; there are no
/// partial updates.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrafficSnapshot {
    /// Monotonic cycle number assigned by the publisher, starting at 1.
    pub cycle: u64,
    /// When the snapshot was assembled.
    pub taken_at: DateTime<Utc>,
    /// True when the readings came from the synthetic fallback.
    #[serde(default)]
    pub synthetic: bool,
    /// Latest classified record per sensor id.
    pub records: BTreeMap<String, ClassifiedRecord>,
}

impl TrafficSnapshot {
    pub fn new(cycle: u64, taken_at: DateTime<Utc>) -> Self {
        Self {
            cycle,
            taken_at,
            synthetic: false,
            records: BTreeMap::new(),
        }
    }

    /// Get the record for a sensor.
    pub fn get(&self, sensor_id: &str) -> Option<&ClassifiedRecord> {
        self.records.get(sensor_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClassifiedRecord)> {
        self.records.iter()
    }

    /// Number of sensors in each status, in severity order.
    pub fn status_counts(&self) -> BTreeMap<CongestionStatus, usize> {
        let mut counts: BTreeMap<CongestionStatus, usize> =
            CongestionStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for record in self.records.values() {
            *counts.entry(record.status).or_default() += 1;
        }
        counts
    }

    /// Worst status across all sensors, or `None` for an empty snapshot.
    pub fn worst_status(&self) -> Option<CongestionStatus> {
        self.records.values().map(|r| r.status).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(id: &str, ci: f64) -> Reading {
        Reading {
            sensor_id: id.to_string(),
            timestamp: Utc::now(),
            avg_speed: 50.0,
            vehicle_count: 10,
            congestion_index: ci,
            speed_limit: 80.0,
        }
    }

    #[test]
    fn test_record_is_classified() {
        let record = ClassifiedRecord::new(reading("S1", 3.0), RecordHistory::default());
        assert_eq!(record.status, CongestionStatus::Congested);
        assert_eq!(record.sensor_id, "S1");
    }

    #[test]
    fn test_status_counts() {
        let mut snapshot = TrafficSnapshot::new(1, Utc::now());
        for (id, ci) in [("a", 0.1), ("b", 0.1), ("c", 0.4), ("d", 5.0)] {
            snapshot.records.insert(
                id.to_string(),
                ClassifiedRecord::new(reading(id, ci), RecordHistory::default()),
            );
        }

        let counts = snapshot.status_counts();
        assert_eq!(counts[&CongestionStatus::Free], 2);
        assert_eq!(counts[&CongestionStatus::Dense], 1);
        assert_eq!(counts[&CongestionStatus::NearCapacity], 0);
        assert_eq!(counts[&CongestionStatus::Congested], 1);
        assert_eq!(snapshot.worst_status(), Some(CongestionStatus::Congested));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = TrafficSnapshot::new(7, Utc::now());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.worst_status(), None);
        assert_eq!(snapshot.status_counts().values().sum::<usize>(), 0);
    }
}
