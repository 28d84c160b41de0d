//! Rolling per-sensor history.

use std::collections::{HashMap, VecDeque};

use urbanflow_types::{Reading, RecordHistory, HISTORY_CAPACITY};

/// Fixed-capacity FIFO buffer. Once full, each push evicts the oldest value.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingHistory<T> {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, returning the evicted one if the buffer was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent value.
    pub fn latest(&self) -> Option<&T> {
        self.values.back()
    }

    /// Values oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Copy of the values, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }
}

impl<T: Clone> Default for RollingHistory<T> {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

/// Speed and vehicle-count series for one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorHistory {
    pub avg_speed: RollingHistory<f64>,
    pub vehicle_count: RollingHistory<u32>,
}

impl SensorHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            avg_speed: RollingHistory::new(capacity),
            vehicle_count: RollingHistory::new(capacity),
        }
    }

    /// Append one reading to both series.
    pub fn record(&mut self, reading: &Reading) {
        self.avg_speed.push(reading.avg_speed);
        self.vehicle_count.push(reading.vehicle_count);
    }

    /// Copy out the series for publication.
    pub fn to_record_history(&self) -> RecordHistory {
        RecordHistory {
            avg_speed: self.avg_speed.to_vec(),
            vehicle_count: self.vehicle_count.to_vec(),
        }
    }
}

/// Histories for every sensor seen so far, keyed by sensor id.
#[derive(Debug, Clone)]
pub struct HistoryBook {
    capacity: usize,
    sensors: HashMap<String, SensorHistory>,
}

impl Default for HistoryBook {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl HistoryBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sensors: HashMap::new(),
        }
    }

    /// Record a reading and return the sensor's updated history.
    pub fn record(&mut self, reading: &Reading) -> RecordHistory {
        let capacity = self.capacity;
        let history = self
            .sensors
            .entry(reading.sensor_id.clone())
            .or_insert_with(|| SensorHistory::new(capacity));
        history.record(reading);
        history.to_record_history()
    }

    pub fn get(&self, sensor_id: &str) -> Option<&SensorHistory> {
        self.sensors.get(sensor_id)
    }

    /// Number of sensors with history.
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
