//! Multi-exchange spot price aggregation and cross-exchange arbitrage detection.

pub mod api;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod pipeline;
pub mod telemetry;
