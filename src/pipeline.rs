// Pipeline orchestrates aggregator -> engine -> distribution state

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::distribution::{DistributionState, Published};
use crate::engine::ArbitrageEngine;
use crate::market_data::adapters::SourceReport;
use crate::market_data::{Aggregation, Aggregator};

/// What one cycle produced; the same value the distribution state now serves.
pub type CycleOutput = Arc<Published>;

pub struct Pipeline {
    aggregator: Aggregator,
    engine: ArbitrageEngine,
    state: Arc<DistributionState>,
    /// Last completed cycle number; held for the whole cycle so runs never interleave.
    cycle: Mutex<u64>,
}

impl Pipeline {
    pub fn new(aggregator: Aggregator, engine: ArbitrageEngine, state: Arc<DistributionState>) -> Self {
        Self { aggregator, engine, state, cycle: Mutex::new(0) }
    }

    pub fn state(&self) -> &Arc<DistributionState> {
        &self.state
    }

    /// Aggregate, detect, publish. A concurrent caller waits for the running
    /// cycle to finish and then runs its own.
    pub async fn run_cycle(&self) -> CycleOutput {
        let mut cycle = self.cycle.lock().await;
        *cycle += 1;
        let started = Instant::now();

        let Aggregation { snapshots, sources } = self.aggregator.collect().await;
        let detected_at = Utc::now();
        let opportunities = self.engine.detect(&snapshots, detected_at);

        let elapsed = started.elapsed();
        record_cycle_metrics(elapsed, snapshots.len(), opportunities.len(), &sources);

        let published = self.state.publish(*cycle, snapshots, opportunities, sources, detected_at);
        if published.prices.is_empty() {
            warn!(cycle = published.cycle, "Published empty cycle");
        }
        info!(
            cycle = published.cycle,
            symbols = published.prices.len(),
            opportunities = published.opportunities.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Cycle complete"
        );
        published
    }

    /// Run one cycle now, then every `every`, until `shutdown` flips to true
    /// or its sender is dropped. A cycle that overruns skips the missed ticks.
    pub fn spawn_scheduler(self: Arc<Self>, every: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = every.as_secs_f64(), "Scheduler started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_cycle().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Scheduler stopped");
        })
    }
}

fn record_cycle_metrics(elapsed: Duration, symbols: usize, opportunities: usize, sources: &[SourceReport]) {
    metrics::counter!("arbx_cycles_total").increment(1);
    metrics::histogram!("arbx_cycle_duration_ms").record(elapsed.as_secs_f64() * 1_000.0);
    metrics::gauge!("arbx_symbols").set(symbols as f64);
    metrics::gauge!("arbx_opportunities").set(opportunities as f64);
    for source in sources.iter().filter(|s| !s.is_ok()) {
        metrics::counter!("arbx_source_failures_total", "exchange" => source.exchange.clone()).increment(1);
    }
}
