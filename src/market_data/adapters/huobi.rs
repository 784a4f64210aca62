// Huobi (HTX): GET /market/tickers
// {"status":"ok","ts":1700000000000,"data":[{"symbol":"btcusdt","close":65000.1,...}]}
// Symbols are lowercase and prices are JSON numbers.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeAdapter, PriceCollector, RestEndpoint};
use crate::engine::types::PriceMap;
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuotePolicy, RawPrice};

#[derive(Debug, Deserialize)]
struct HuobiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "err-msg")]
    err_msg: Option<String>,
    #[serde(default)]
    data: Vec<HuobiTicker>,
}

#[derive(Debug, Deserialize)]
struct HuobiTicker {
    symbol: String,
    #[serde(default)]
    close: Option<RawPrice>,
}

pub struct HuobiAdapter {
    name: String,
    endpoint: RestEndpoint,
    normaliser: Normaliser,
}

impl HuobiAdapter {
    pub fn new(name: impl Into<String>, endpoint: RestEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            normaliser: Normaliser::new(QuotePolicy::UsdtOnly),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for HuobiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.endpoint.get_text().await
    }

    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        let response: HuobiResponse = serde_json::from_str(body)?;
        if response.status.as_deref() == Some("error") {
            return Err(AdapterError::Exchange(response.err_msg.unwrap_or_else(|| "unknown error".into())));
        }

        let mut collector = PriceCollector::new(&self.name, &self.normaliser, observed_at);
        for ticker in &response.data {
            collector.offer(&ticker.symbol, ticker.close.as_ref());
        }
        Ok(collector.finish())
    }
}
