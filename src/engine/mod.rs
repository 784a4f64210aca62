// Engine: canonical records + arbitrage detection
pub mod types;
pub mod arbitrage;

pub use arbitrage::ArbitrageEngine;
pub use types::*;
