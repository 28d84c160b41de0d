//! # urbanflow-types
//!
//! Core types for traffic-state monitoring. This crate defines the shapes
//! shared by the aggregation runtime, the HTTP adapters and any consumer of
//! the published snapshots.
//!
//! ## Contents
//!
//! - **Sensors**: static identity and location of each measuring point
//!   ([`Sensor`], [`SensorSet`], [`vienna_sensors`])
//! - **Readings**: the wire record returned by the traffic API
//!   ([`RawReading`]) and its parsed form ([`Reading`])
//! - **Classification**: [`CongestionStatus`], [`classify`] and the
//!   [`congestion_index`] formula
//! - **Snapshots**: [`ClassifiedRecord`] and the per-cycle [`TrafficSnapshot`]
//! - **Alerts**: [`Alert`] as returned by the alerts API
//!
//! ## Example
//!
//! ```rust
//! use urbanflow_types::{classify, congestion_index, CongestionStatus};
//!
//! // 40 km/h on a road with an 80 km/h free-flow speed
//! let ci = congestion_index(80.0, 40.0);
//! assert_eq!(ci, 1.0);
//! assert_eq!(classify(ci), CongestionStatus::NearCapacity);
//! ```

mod alert;
mod reading;
mod sensor;
mod snapshot;
mod status;

pub use alert::*;
pub use reading::*;
pub use sensor::*;
pub use snapshot::*;
pub use status::*;

/// Number of samples kept in each rolling history series.
pub const HISTORY_CAPACITY: usize = 20;
