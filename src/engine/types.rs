use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prices at or below this are treated as dust/garbage quotes and never stored.
pub const MIN_PRICE: f64 = 0.001;

pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > MIN_PRICE
}

// One exchange's quote for one canonical symbol at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceObservation {
    pub exchange: String,
    pub symbol: String,
    pub price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    /// Returns `None` when the price fails the ingestion invariant.
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        price: f64,
        observed_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !is_valid_price(price) {
            return None;
        }
        Some(Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            price,
            observed_at,
        })
    }

    pub fn is_valid(&self) -> bool {
        is_valid_price(self.price)
    }
}

/// All current observations for one canonical symbol, at most one per exchange.
///
/// Observations keep the order they were merged in; the arbitrage engine relies
/// on that order to break equal-price ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub observations: Vec<PriceObservation>,
}

impl SymbolSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), observations: Vec::new() }
    }

    /// Insert or replace this exchange's observation. A replacement keeps the
    /// exchange's original position. Observations for another symbol are refused.
    pub fn upsert(&mut self, observation: PriceObservation) -> bool {
        if observation.symbol != self.symbol {
            return false;
        }
        match self.observations.iter_mut().find(|o| o.exchange == observation.exchange) {
            Some(existing) => *existing = observation,
            None => self.observations.push(observation),
        }
        true
    }

    /// Drop observations that fail the price invariant, returning how many went.
    pub fn retain_valid(&mut self) -> usize {
        let before = self.observations.len();
        self.observations.retain(PriceObservation::is_valid);
        before - self.observations.len()
    }

    pub fn get(&self, exchange: &str) -> Option<&PriceObservation> {
        self.observations.iter().find(|o| o.exchange == exchange)
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &str> {
        self.observations.iter().map(|o| o.exchange.as_str())
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// One adapter's output for a cycle: canonical symbol -> observation.
pub type PriceMap = HashMap<String, PriceObservation>;

/// The whole market for a cycle, keyed by canonical symbol.
pub type SnapshotSet = BTreeMap<String, SymbolSnapshot>;

// A detected buy-low/sell-high spread for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageOpportunity {
    pub symbol: String,
    pub buy_exchange: String,
    pub buy_price: f64,
    pub sell_exchange: String,
    pub sell_price: f64,
    pub profit_percentage: f64,
    /// Spread per unit of base asset, in quote currency.
    pub profit_absolute: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub detected_at: DateTime<Utc>,
    pub all_prices: SymbolSnapshot,
}
