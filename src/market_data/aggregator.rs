// Fan out to every adapter, wait for all of them, merge into one SnapshotSet.

use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::types::{PriceMap, SnapshotSet, SymbolSnapshot};
use crate::market_data::adapters::{ExchangeAdapter, PollOutcome, SourceReport};

/// Result of one fan-out: the merged market plus per-exchange diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub snapshots: SnapshotSet,
    pub sources: Vec<SourceReport>,
}

impl Aggregation {
    /// Every adapter came back empty-handed.
    pub fn is_degraded(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(|s| !s.is_ok() || s.pairs == 0)
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn ExchangeAdapter>>,
    timeout: Duration,
}

impl Aggregator {
    /// `timeout` bounds each adapter independently; a late adapter counts as failed.
    pub fn new(adapters: Vec<Arc<dyn ExchangeAdapter>>, timeout: Duration) -> Self {
        Self { adapters, timeout }
    }

    pub fn adapters(&self) -> &[Arc<dyn ExchangeAdapter>] {
        &self.adapters
    }

    #[instrument(level = "debug", skip(self), fields(adapters = self.adapters.len()))]
    pub async fn collect(&self) -> Aggregation {
        // One task per adapter so a panicking adapter is contained like any other fault.
        let tasks = self.adapters.iter().map(|adapter| {
            let adapter = Arc::clone(adapter);
            let timeout = self.timeout;
            let name = adapter.name().to_string();
            let handle = tokio::spawn(async move {
                match tokio::time::timeout(timeout, adapter.poll()).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(exchange = adapter.name(), timeout_ms = timeout.as_millis() as u64, "Exchange poll timed out");
                        PollOutcome::timed_out(adapter.name(), timeout)
                    }
                }
            });
            async move {
                handle.await.unwrap_or_else(|e| {
                    error!(exchange = %name, error = %e, "Adapter task aborted");
                    PollOutcome::failed(&name, format!("adapter task aborted: {e}"), Duration::ZERO)
                })
            }
        });

        // join_all keeps configuration order regardless of completion order.
        let outcomes = futures::future::join_all(tasks).await;

        let snapshots = validate(merge(outcomes.iter().map(|o| &o.prices)));
        let sources: Vec<SourceReport> = outcomes.into_iter().map(|o| o.report).collect();

        let aggregation = Aggregation { snapshots, sources };
        if aggregation.is_degraded() {
            warn!("Degraded cycle: no exchange returned data");
        } else {
            info!(
                symbols = aggregation.snapshots.len(),
                sources = %aggregation.sources.iter().map(|s| format!("{}={}", s.exchange, s.pairs)).join(", "),
                "Aggregated prices"
            );
        }
        aggregation
    }
}

/// Fold adapter outputs into one collection, in the order given.
/// Observations land in each symbol's snapshot in that same order.
pub fn merge<'a>(outputs: impl IntoIterator<Item = &'a PriceMap>) -> SnapshotSet {
    let mut snapshots = SnapshotSet::new();
    for prices in outputs {
        for (symbol, observation) in prices {
            snapshots
                .entry(symbol.clone())
                .or_insert_with(|| SymbolSnapshot::new(symbol.clone()))
                .upsert(observation.clone());
        }
    }
    snapshots
}

/// Second line of defence: drop invalid observations and any symbol left empty.
pub fn validate(mut snapshots: SnapshotSet) -> SnapshotSet {
    snapshots.retain(|symbol, snapshot| {
        let dropped = snapshot.retain_valid();
        if dropped > 0 {
            debug!(symbol = %symbol, dropped, "Dropped invalid observations");
        }
        !snapshot.is_empty()
    });
    snapshots
}
