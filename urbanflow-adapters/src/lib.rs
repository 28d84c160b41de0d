//! # urbanflow-adapters
//!
//! Sources that read traffic data and alerts from the UrbanFlow REST API.
//!
//! The API sits behind an API gateway; every resource lives under
//! `{base_url}/{api_id}/{stage}/_user_request_/{endpoint}`, and a single
//! sensor is selected with `?street_id={id}`. [`ApiEndpoints`] builds those
//! URLs; the `http` feature adds the reqwest-backed sources.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "http")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use urbanflow_adapters::{ApiEndpoints, HttpTrafficSource};
//! use urbanflow_core::TrafficAggregator;
//!
//! let endpoints = ApiEndpoints::new("http://localhost:4566/restapis", "abc123", "dev");
//! let source = HttpTrafficSource::builder().endpoints(endpoints).build()?;
//!
//! let aggregator = TrafficAggregator::builder().source(source).build();
//! aggregator.start();
//! # Ok(())
//! # }
//! ```

pub mod endpoints;
pub mod error;

#[cfg(feature = "http")]
mod client;

#[cfg(feature = "http")]
pub mod alerts;

#[cfg(feature = "http")]
pub mod traffic;

pub use endpoints::ApiEndpoints;
pub use error::AdapterError;

#[cfg(feature = "http")]
pub use alerts::{HttpAlertSource, HttpAlertSourceBuilder};
#[cfg(feature = "http")]
pub use traffic::{HttpTrafficSource, HttpTrafficSourceBuilder};

// Re-export types for convenience
pub use urbanflow_types::{Alert, RawReading};
