use chrono::{DateTime, Utc};
use tracing::{debug, instrument, trace};

use crate::engine::types::{ArbitrageOpportunity, PriceObservation, SnapshotSet, SymbolSnapshot};

/// Minimum spread (in percent) worth reporting. Roughly a round trip of taker fees.
pub const DEFAULT_MIN_PROFIT_PCT: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct ArbitrageEngine {
    min_profit_pct: f64,
}

impl Default for ArbitrageEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PROFIT_PCT)
    }
}

impl ArbitrageEngine {
    pub fn new(min_profit_pct: f64) -> Self {
        Self { min_profit_pct }
    }

    pub fn min_profit_pct(&self) -> f64 {
        self.min_profit_pct
    }

    /// Scan every symbol and return the opportunities ranked by profit, best first.
    #[instrument(level = "debug", skip_all, fields(symbols = snapshots.len()))]
    pub fn detect(&self, snapshots: &SnapshotSet, detected_at: DateTime<Utc>) -> Vec<ArbitrageOpportunity> {
        let mut opportunities: Vec<ArbitrageOpportunity> = snapshots
            .values()
            .filter_map(|snapshot| self.evaluate(snapshot, detected_at))
            .collect();
        rank(&mut opportunities);
        debug!(found = opportunities.len(), "Arbitrage scan complete");
        opportunities
    }

    /// Best buy/sell pair for one symbol, if it clears the profit threshold.
    pub fn evaluate(&self, snapshot: &SymbolSnapshot, detected_at: DateTime<Utc>) -> Option<ArbitrageOpportunity> {
        if snapshot.len() < 2 {
            return None;
        }

        // Adapters and the aggregator already filter these; a bad quote here only costs its symbol.
        let valid: Vec<&PriceObservation> = snapshot
            .observations
            .iter()
            .filter(|o| o.price.is_finite() && o.price > 0.0)
            .collect();
        if valid.len() < 2 {
            trace!(symbol = %snapshot.symbol, "Not enough valid quotes");
            return None;
        }

        let (buy, sell) = extremes(&valid)?;
        if buy.exchange == sell.exchange {
            return None;
        }

        let spread = sell.price - buy.price;
        let profit_percentage = spread / buy.price * 100.0;
        // Negated comparison so a NaN never slips through.
        if !(profit_percentage > self.min_profit_pct) {
            return None;
        }

        trace!(
            symbol = %snapshot.symbol,
            buy = %buy.exchange,
            sell = %sell.exchange,
            profit_percentage,
            "Opportunity found"
        );

        Some(ArbitrageOpportunity {
            symbol: snapshot.symbol.clone(),
            buy_exchange: buy.exchange.clone(),
            buy_price: buy.price,
            sell_exchange: sell.exchange.clone(),
            sell_price: sell.price,
            profit_percentage,
            profit_absolute: spread,
            detected_at,
            all_prices: snapshot.clone(),
        })
    }
}

// Cheapest and dearest quote. On equal prices the first one in iteration order
// wins on both sides; this is stable but carries no meaning.
fn extremes<'a>(valid: &[&'a PriceObservation]) -> Option<(&'a PriceObservation, &'a PriceObservation)> {
    let (first, rest) = valid.split_first()?;
    let (mut min, mut max) = (*first, *first);
    for &obs in rest {
        if obs.price < min.price {
            min = obs;
        }
        if obs.price > max.price {
            max = obs;
        }
    }
    Some((min, max))
}

/// Sort best-first by profit percentage. Ties keep no particular order.
pub fn rank(opportunities: &mut [ArbitrageOpportunity]) {
    opportunities.sort_by(|a, b| b.profit_percentage.total_cmp(&a.profit_percentage));
}
