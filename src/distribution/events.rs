use std::sync::Arc;

use serde::Serialize;

use crate::distribution::state::Published;
use crate::engine::types::{ArbitrageOpportunity, SnapshotSet};

/// Change notification pushed after every cycle. Always a full replacement,
/// never a delta.
///
/// Serialises as `{"type":"prices","data":{...}}` / `{"type":"arbitrage","data":[...]}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PublishEvent {
    #[serde(rename = "prices")]
    PricesUpdated(Arc<SnapshotSet>),
    #[serde(rename = "arbitrage")]
    OpportunitiesUpdated(Arc<Vec<ArbitrageOpportunity>>),
}

impl PublishEvent {
    /// The two events that bring a fresh subscriber up to `published`.
    pub fn replay(published: &Published) -> [PublishEvent; 2] {
        [
            PublishEvent::PricesUpdated(Arc::clone(&published.prices)),
            PublishEvent::OpportunitiesUpdated(Arc::clone(&published.opportunities)),
        ]
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope() {
        let prices = PublishEvent::PricesUpdated(Arc::new(SnapshotSet::new()));
        assert_eq!(prices.to_json().unwrap(), r#"{"type":"prices","data":{}}"#);

        let arb = PublishEvent::OpportunitiesUpdated(Arc::new(vec![]));
        assert_eq!(arb.to_json().unwrap(), r#"{"type":"arbitrage","data":[]}"#);
    }
}
