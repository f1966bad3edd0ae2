//! Freightflow Route Engine
//!
//! Computes recommended multi-modal freight routes between two cities.
//! Builds a directed network of airports and seaports from scheduled
//! flight and shipping lanes, attaches road legs via a live routing
//! service, and ranks a small set of Pareto-favorable options by cost,
//! time, emissions, or a balanced blend.

pub mod candidates;
pub mod config;
pub mod container;
pub mod data;
pub mod engine;
pub mod eval;
pub mod geocode;
pub mod graph;
pub mod net;
pub mod optimizer;
pub mod rank;
pub mod road;

pub use config::Config;
pub use engine::{PlanRequest, Priority, RouteOption, RoutePlanner};
pub use eval::{GoodsType, LegEval, RouteEval};
pub use geocode::{Coords, Geocoder};
pub use graph::{Network, TransportMode};

use thiserror::Error;

/// The top-level error type for the route engine.
///
/// Degraded upstream responses (geocode misses, absent road routes) are
/// not errors; they surface as fallback coordinates or missing edges.
/// Only missing input tables, malformed core arguments, and unparseable
/// configuration reach callers through this enum.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("input table {path}: {source}")]
    Table {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid request: {0}")]
    Request(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;
