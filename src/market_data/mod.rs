// Market data module entrypoint
pub mod adapters;       // per-exchange fetch + normalise
pub mod normaliser;     // symbol / price canonicalisation rules
pub mod aggregator;     // concurrent fan-out and merge

pub use aggregator::{Aggregation, Aggregator};
