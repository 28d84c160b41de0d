//! # urbanflow
//!
//! A headless traffic-state monitor for a fixed set of road sensors.
//!
//! ```text
//!  ┌──────────────┐  readings  ┌───────────────────┐  snapshots  ┌──────────┐
//!  │ REST API or  │───────────▶│ TrafficAggregator │────────────▶│ console, │
//!  │ synthetic    │            │ classify + history│             │ export   │
//!  └──────────────┘            └───────────────────┘             └──────────┘
//!  ┌──────────────┐   alerts   ┌───────────────────┐  new alerts
//!  │ REST API     │───────────▶│ AlertNotifier     │────────────▶ console
//!  └──────────────┘            └───────────────────┘
//! ```
//!
//! The runtime lives in `urbanflow-core` and the HTTP sources in
//! `urbanflow-adapters`. This crate adds what a front end needs on top:
//!
//! - **[`settings`]**: layered configuration (defaults, TOML file, environment)
//! - **[`view`]**: marker filtering, status tallies, critical list, sparklines
//! - **[`export`]**: one-shot JSON export of a snapshot
//!
//! ## Usage
//!
//! ```bash
//! # Simulated readings for the Vienna reference sensors
//! urbanflow
//!
//! # Live API, only congested sensors on Ringstrasse
//! urbanflow --mode live --api-id iianki73yo --status congested --search ring
//!
//! # One cycle to a JSON file
//! urbanflow --export traffic.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use urbanflow::view::{summary_line, MarkerFilter};
//! use urbanflow_core::{CongestionStatus, TrafficAggregator};
//!
//! # tokio_test::block_on(async {
//! let aggregator = TrafficAggregator::builder().build();
//! let snapshot = aggregator.poll_once().await.unwrap();
//!
//! let filter = MarkerFilter::new().with_status(CongestionStatus::Congested);
//! let jammed = filter.visible(aggregator.sensors(), Some(&snapshot));
//! println!("{} ({} jammed)", summary_line(&snapshot), jammed.len());
//! # });
//! ```

pub mod export;
pub mod settings;
pub mod view;

pub use export::{export_document, export_to_file};
pub use settings::{ApiSettings, Settings};
pub use view::{critical_records, render_sparkline, sparkline_levels, status_tallies, MarkerFilter};
