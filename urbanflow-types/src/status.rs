//! Congestion classification.

use std::fmt;

/// Upper bound (inclusive) of the `free` bucket.
pub const FREE_MAX: f64 = 0.2;
/// Upper bound (inclusive) of the `dense` bucket.
pub const DENSE_MAX: f64 = 0.5;
/// Upper bound (inclusive) of the `near_capacity` bucket.
pub const NEAR_CAPACITY_MAX: f64 = 2.0;

/// Congestion index reported for stopped traffic.
pub const STOPPED_INDEX: f64 = 999.0;

/// Congestion status of a sensor, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CongestionStatus {
    Free,
    Dense,
    NearCapacity,
    Congested,
}

impl CongestionStatus {
    /// All statuses in severity order.
    pub const ALL: [CongestionStatus; 4] = [
        CongestionStatus::Free,
        CongestionStatus::Dense,
        CongestionStatus::NearCapacity,
        CongestionStatus::Congested,
    ];

    /// Wire name, as used by the API and in exported JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionStatus::Free => "free",
            CongestionStatus::Dense => "dense",
            CongestionStatus::NearCapacity => "near_capacity",
            CongestionStatus::Congested => "congested",
        }
    }

    /// Short symbol for compact display.
    pub fn symbol(&self) -> &'static str {
        match self {
            CongestionStatus::Free => "FREE",
            CongestionStatus::Dense => "DENSE",
            CongestionStatus::NearCapacity => "NEAR",
            CongestionStatus::Congested => "JAM",
        }
    }

    /// Returns true for `near_capacity` and `congested`.
    pub fn is_critical(&self) -> bool {
        *self >= CongestionStatus::NearCapacity
    }
}

impl fmt::Display for CongestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CongestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(CongestionStatus::Free),
            "dense" => Ok(CongestionStatus::Dense),
            "near_capacity" | "near-capacity" => Ok(CongestionStatus::NearCapacity),
            "congested" => Ok(CongestionStatus::Congested),
            other => Err(format!("unknown congestion status '{}'", other)),
        }
    }
}

/// Classify a congestion index.
///
/// Each bucket includes its upper bound, so `0.2` is still `free` and `2.0`
/// is still `near_capacity`. NaN falls through to `congested`.
pub fn classify(ci: f64) -> CongestionStatus {
    if ci <= FREE_MAX {
        CongestionStatus::Free
    } else if ci <= DENSE_MAX {
        CongestionStatus::Dense
    } else if ci <= NEAR_CAPACITY_MAX {
        CongestionStatus::NearCapacity
    } else {
        CongestionStatus::Congested
    }
}

/// Compute the congestion index `(reference - avg) / avg`, clamped at zero.
///
/// `reference_kph` is the free-flow speed (or the speed limit). Stopped
/// traffic yields [`STOPPED_INDEX`].
pub fn congestion_index(reference_kph: f64, avg_speed_kph: f64) -> f64 {
    if avg_speed_kph <= 0.0 {
        return STOPPED_INDEX;
    }
    ((reference_kph - avg_speed_kph) / avg_speed_kph).max(0.0)
}
