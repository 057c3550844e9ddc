// Checkmk Query Engine
// Author: Gabriel Demetrios Lafis

//! # Checkmk Query Engine
//!
//! Translation and normalization core of a Checkmk dashboard data source.
//!
//! ## Features
//!
//! - Versioned request specifications with legacy context/params migration
//! - Dashboard variable substitution
//! - Legacy context and live-query filter builders
//! - Graph request builders for the web API and REST API dialects
//! - Edition aware validation of request specifications
//! - Response classification and reshaping into time-indexed frames
//! - HTTP service exposing the translation operations
//!
//! ## Example
//!
//! ```rust
//! use checkmk_query_engine::{
//!     encode::{build_graph_spec, TimeRange},
//!     spec::{Aggregation, Edition, GraphType, RequestSpec},
//!     utils::validate,
//! };
//!
//! let spec = RequestSpec::default_query()
//!     .with_graph_type(GraphType::SingleMetric)
//!     .with_aggregation(Aggregation::Sum)
//!     .with_graph("load1");
//!
//! validate(&spec, Edition::Commercial).unwrap();
//!
//! let request = build_graph_spec(&spec, TimeRange::new(1000, 2000), Edition::Commercial, None).unwrap();
//! assert!(request.to_body().unwrap().starts_with("request="));
//! ```

pub mod spec;
pub mod encode;
pub mod response;
pub mod backend;
pub mod api;
pub mod utils;

// Re-export main types
pub use spec::{Edition, RequestSpec};
pub use response::Frame;
pub use backend::{Backend, Transport};
pub use api::Server;
pub use utils::Config;
