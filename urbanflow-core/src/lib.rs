//! # urbanflow-core
//!
//! Traffic-state aggregation runtime.
//!
//! Two components run side by side, each with its own polling loop:
//!
//! ```text
//!  TrafficSource ──fetch──▶ TrafficAggregator ──Replay<Arc<TrafficSnapshot>>──▶ subscribers
//!                             │ classify
//!                             │ rolling history (20 samples)
//!                             └ synthetic fallback on failure
//!
//!  AlertSource ───fetch──▶ AlertNotifier ──Broadcast<Alert>──▶ new-alert subscribers
//!                             └ select_alert() ──Broadcast<Alert>──▶ selection subscribers
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use urbanflow_core::{AlertNotifier, NotifierConfig, TrafficAggregator};
//! # use urbanflow_core::{AlertSource, SourceError};
//! # use urbanflow_types::Alert;
//! # #[derive(Debug)] struct NoAlerts;
//! # #[async_trait::async_trait]
//! # impl AlertSource for NoAlerts {
//! #     async fn fetch_alerts(&self, _: Option<&str>) -> Result<Vec<Alert>, SourceError> { Ok(vec![]) }
//! #     fn description(&self) -> &str { "none" }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     // Simulation mode: readings generated for the reference sensors
//!     let aggregator = TrafficAggregator::builder().build();
//!     aggregator.start();
//!
//!     let notifier = AlertNotifier::spawn(NoAlerts, NotifierConfig::default());
//!
//!     let mut snapshots = aggregator.subscribe();
//!     let mut alerts = notifier.subscribe();
//!
//!     loop {
//!         tokio::select! {
//!             Some(snapshot) = snapshots.recv() => println!("cycle {}", snapshot.cycle),
//!             Some(alert) = alerts.recv() => println!("alert {}", alert.alert_id),
//!         }
//!     }
//! }
//! ```

pub mod aggregator;
pub mod channel;
pub mod history;
pub mod notifier;
pub mod schedule;
pub mod source;

use std::time::Duration;

pub use aggregator::{AggregatorConfig, TrafficAggregator, TrafficAggregatorBuilder};
pub use channel::{Broadcast, Replay, Subscription};
pub use history::{HistoryBook, RollingHistory, SensorHistory};
pub use notifier::{AlertNotifier, NotifierConfig};
pub use schedule::PollLoop;
pub use source::{AlertSource, SourceError, SyntheticSource, TrafficSource};

// Re-export types for convenience
pub use urbanflow_types::{
    classify, Alert, ClassifiedRecord, CongestionStatus, RawReading, Reading, Sensor, SensorSet,
    TrafficSnapshot,
};

/// Where readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Poll the REST API.
    Live,
    /// Generate readings locally.
    #[default]
    #[serde(alias = "sim", alias = "mock")]
    Simulation,
}

impl Mode {
    pub fn default_traffic_interval(&self) -> Duration {
        match self {
            Mode::Live => Duration::from_millis(5000),
            Mode::Simulation => Duration::from_millis(3000),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Mode::Live),
            "simulation" | "sim" | "mock" => Ok(Mode::Simulation),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// What the aggregator publishes for a cycle whose fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Publish a synthetic snapshot for the fixed sensor set, flagged as such.
    #[default]
    Synthetic,
    /// Publish nothing; subscribers keep the previous snapshot.
    Skip,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(FallbackPolicy::Synthetic),
            "skip" => Ok(FallbackPolicy::Skip),
            other => Err(format!("unknown fallback policy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_defaults() {
        assert_eq!(Mode::default(), Mode::Simulation);
        assert_eq!(Mode::Live.default_traffic_interval(), Duration::from_secs(5));
        assert_eq!(Mode::Simulation.default_traffic_interval(), Duration::from_secs(3));
    }

    #[test]
    fn mode_and_fallback_parse() {
        assert_eq!("LIVE".parse::<Mode>(), Ok(Mode::Live));
        assert_eq!("mock".parse::<Mode>(), Ok(Mode::Simulation));
        assert!("replay".parse::<Mode>().is_err());
        assert_eq!("skip".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Skip));
        assert_eq!(FallbackPolicy::default(), FallbackPolicy::Synthetic);
    }

    #[test]
    fn mode_aliases_deserialize() {
        for name in ["simulation", "sim", "mock"] {
            let mode: Mode = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(mode, Mode::Simulation);
            assert_eq!(name.parse::<Mode>(), Ok(Mode::Simulation));
        }
        let live: Mode = serde_json::from_value(serde_json::json!("live")).unwrap();
        assert_eq!(live, Mode::Live);
    }
}
