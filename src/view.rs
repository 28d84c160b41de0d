//! Presentation helpers over snapshots: marker filtering, status tallies
//! and sparklines.

use std::collections::{BTreeMap, BTreeSet};

use urbanflow_types::{ClassifiedRecord, CongestionStatus, Sensor, SensorSet, TrafficSnapshot};

/// Block glyphs for the eight sparkline levels, lowest first.
const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Which sensors to show.
///
/// A sensor is visible when it matches the search term (case-insensitive,
/// over id, name and description) and its current status is in the allowed
/// set. An empty set allows every status; in that case sensors without data
/// are shown too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerFilter {
    search: String,
    statuses: BTreeSet<CongestionStatus>,
}

impl MarkerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl AsRef<str>) -> Self {
        self.search = term.as_ref().trim().to_lowercase();
        self
    }

    pub fn with_status(mut self, status: CongestionStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = CongestionStatus>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.statuses.is_empty()
    }

    pub fn matches(&self, sensor: &Sensor, record: Option<&ClassifiedRecord>) -> bool {
        self.matches_search(sensor) && self.matches_status(record)
    }

    fn matches_search(&self, sensor: &Sensor) -> bool {
        if self.search.is_empty() {
            return true;
        }
        [&sensor.id, &sensor.name, &sensor.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&self.search))
    }

    fn matches_status(&self, record: Option<&ClassifiedRecord>) -> bool {
        if self.statuses.is_empty() {
            return true;
        }
        record.is_some_and(|r| self.statuses.contains(&r.status))
    }

    /// Visible sensors in set order.
    pub fn visible<'a>(
        &self,
        sensors: &'a SensorSet,
        snapshot: Option<&TrafficSnapshot>,
    ) -> Vec<&'a Sensor> {
        sensors
            .iter()
            .filter(|sensor| self.matches(sensor, snapshot.and_then(|s| s.get(&sensor.id))))
            .collect()
    }
}

/// Number of sensors per status; every status is present.
pub fn status_tallies(snapshot: &TrafficSnapshot) -> BTreeMap<CongestionStatus, usize> {
    snapshot.status_counts()
}

/// Records at near capacity or worse, most congested first.
pub fn critical_records(snapshot: &TrafficSnapshot) -> Vec<&ClassifiedRecord> {
    let mut critical: Vec<&ClassifiedRecord> = snapshot
        .iter()
        .map(|(_, record)| record)
        .filter(|record| record.status.is_critical())
        .collect();
    critical.sort_by(|a, b| b.congestion_index.total_cmp(&a.congestion_index));
    critical
}

/// One-line summary of a snapshot for logs and the console.
pub fn summary_line(snapshot: &TrafficSnapshot) -> String {
    let tallies = status_tallies(snapshot)
        .iter()
        .map(|(status, count)| format!("{} {}", status.symbol(), count))
        .collect::<Vec<_>>()
        .join("  ");
    let origin = if snapshot.synthetic { " (synthetic)" } else { "" };
    format!(
        "cycle {}: {} sensors{}  {}",
        snapshot.cycle,
        snapshot.len(),
        origin,
        tallies
    )
}

/// Normalize values to 0-7 for sparkline display.
///
/// The lowest value maps to 0 and the highest to 7. A flat series sits on
/// the bottom row.
pub fn sparkline_levels(values: &[f64]) -> Vec<u8> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() {
        return Vec::new();
    }

    let range = max - min;
    values
        .iter()
        .map(|&v| {
            if range <= f64::EPSILON || !v.is_finite() {
                0
            } else {
                (((v - min) / range * 7.0).round() as u8).min(7)
            }
        })
        .collect()
}

pub fn render_sparkline(values: &[f64]) -> String {
    sparkline_levels(values)
        .into_iter()
        .map(|level| SPARK_GLYPHS[level as usize])
        .collect()
}
