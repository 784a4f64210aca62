// MEXC spot: GET /api/v3/ticker/price, Binance-compatible shape.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeAdapter, PriceCollector, RestEndpoint};
use crate::engine::types::PriceMap;
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuotePolicy, RawPrice};

#[derive(Debug, Deserialize)]
struct MexcTicker {
    symbol: String,
    #[serde(default)]
    price: Option<RawPrice>,
}

pub struct MexcAdapter {
    name: String,
    endpoint: RestEndpoint,
    normaliser: Normaliser,
}

impl MexcAdapter {
    pub fn new(name: impl Into<String>, endpoint: RestEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            normaliser: Normaliser::new(QuotePolicy::UsdtOnly),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for MexcAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.endpoint.get_text().await
    }

    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        let tickers: Vec<MexcTicker> = serde_json::from_str(body)?;
        let mut collector = PriceCollector::new(&self.name, &self.normaliser, observed_at);
        for ticker in &tickers {
            collector.offer(&ticker.symbol, ticker.price.as_ref());
        }
        Ok(collector.finish())
    }
}
