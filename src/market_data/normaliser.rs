// Convert exchange wire symbols/prices into the canonical schema.
// Every adapter funnels its tickers through here so the rules live in one place.

use serde::Deserialize;

use crate::engine::types::is_valid_price;

pub const CANONICAL_QUOTE: &str = "USDT";
const USD_QUOTE: &str = "USD";
const SEPARATORS: [char; 3] = ['-', '_', '/'];
// Binance-style leveraged tokens: BTCUPUSDT, ETHDOWNUSDT
const LEVERAGED_MARKERS: [&str; 2] = ["UP", "DOWN"];

/// How an exchange's quote currencies map onto the canonical `USDT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotePolicy {
    /// Only native USDT pairs are accepted.
    UsdtOnly,
    /// USD pairs stand in for USDT. This assumes the peg holds; it is an
    /// approximation for exchanges with thin or no USDT books.
    UsdAsUsdt,
}

/// Where a canonical USDT quote came from. A native quote outranks a USD stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QuoteKind {
    UsdProxy,
    Native,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub symbol: String,
    pub quote: QuoteKind,
}

/// Prices arrive as JSON strings on most venues and as numbers on a few.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
    /// Any other JSON type (bool, object, array). Unparsable, but it must not
    /// fail the whole payload.
    Other(serde_json::Value),
}

impl RawPrice {
    pub fn parse(&self) -> Option<f64> {
        match self {
            RawPrice::Number(n) => Some(*n),
            RawPrice::Text(s) => s.trim().parse::<f64>().ok(),
            RawPrice::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normaliser {
    pub policy: QuotePolicy,
}

impl Normaliser {
    pub fn new(policy: QuotePolicy) -> Self {
        Self { policy }
    }

    /// Canonical `BASEUSDT` for a raw pair, or `None` if the pair is not a
    /// USDT spot market under this exchange's policy.
    pub fn canonical_symbol(&self, raw: &str) -> Option<Canonical> {
        let symbol = strip_separators(&raw.trim().to_uppercase());

        let (base, quote) = if let Some(base) = symbol.strip_suffix(CANONICAL_QUOTE) {
            (base, QuoteKind::Native)
        } else if self.policy == QuotePolicy::UsdAsUsdt {
            (symbol.strip_suffix(USD_QUOTE)?, QuoteKind::UsdProxy)
        } else {
            return None;
        };

        if base.is_empty() || is_leveraged_base(base) {
            return None;
        }

        Some(Canonical { symbol: format!("{base}{CANONICAL_QUOTE}"), quote })
    }

    /// Parsed price, if it passes the ingestion invariant.
    pub fn price(&self, raw: &RawPrice) -> Option<f64> {
        raw.parse().and_then(validate_price)
    }
}

pub fn strip_separators(raw: &str) -> String {
    raw.chars().filter(|c| !SEPARATORS.contains(c)).collect()
}

/// Leveraged/derivative tokens do not represent spot arbitrage.
/// Narrower than a substring match (which would also drop e.g. `SUPER`) and applied to every exchange.
pub fn is_leveraged_base(base: &str) -> bool {
    LEVERAGED_MARKERS
        .iter()
        .any(|marker| base.len() > marker.len() && base.ends_with(marker))
}

pub fn validate_price(price: f64) -> Option<f64> {
    is_valid_price(price).then_some(price)
}
