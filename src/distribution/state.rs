use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::distribution::events::PublishEvent;
use crate::engine::types::{ArbitrageOpportunity, SnapshotSet};
use crate::market_data::adapters::SourceReport;

/// One complete cycle's output. Immutable once published.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Published {
    pub cycle: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    pub prices: Arc<SnapshotSet>,
    pub opportunities: Arc<Vec<ArbitrageOpportunity>>,
    pub sources: Arc<Vec<SourceReport>>,
}

impl Published {
    fn empty() -> Self {
        Self {
            cycle: 0,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            prices: Arc::default(),
            opportunities: Arc::default(),
            sources: Arc::default(),
        }
    }
}

/// Process-wide latest snapshot. Readers take a cheap `Arc` of whatever is
/// currently published; the writer swaps in a whole new value per cycle.
pub struct DistributionState {
    current: ArcSwap<Published>,
    events: broadcast::Sender<PublishEvent>,
}

impl DistributionState {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(2));
        Self {
            current: ArcSwap::from_pointee(Published::empty()),
            events,
        }
    }

    pub fn current(&self) -> Arc<Published> {
        self.current.load_full()
    }

    pub fn current_prices(&self) -> Arc<SnapshotSet> {
        Arc::clone(&self.current.load().prices)
    }

    pub fn current_opportunities(&self) -> Arc<Vec<ArbitrageOpportunity>> {
        Arc::clone(&self.current.load().opportunities)
    }

    pub fn current_sources(&self) -> Arc<Vec<SourceReport>> {
        Arc::clone(&self.current.load().sources)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Swap in a new cycle and notify subscribers: prices first, then opportunities.
    /// Callers must not publish concurrently; the pipeline serialises cycles.
    pub fn publish(
        &self,
        cycle: u64,
        prices: SnapshotSet,
        opportunities: Vec<ArbitrageOpportunity>,
        sources: Vec<SourceReport>,
        updated_at: DateTime<Utc>,
    ) -> Arc<Published> {
        let published = Arc::new(Published {
            cycle,
            updated_at,
            prices: Arc::new(prices),
            opportunities: Arc::new(opportunities),
            sources: Arc::new(sources),
        });
        self.current.store(Arc::clone(&published));

        // Err only means nobody is listening right now.
        let delivered = self
            .events
            .send(PublishEvent::PricesUpdated(Arc::clone(&published.prices)))
            .unwrap_or(0);
        let _ = self
            .events
            .send(PublishEvent::OpportunitiesUpdated(Arc::clone(&published.opportunities)));
        trace!(cycle, subscribers = delivered, "Published cycle");

        published
    }
}
