// KuCoin: GET /api/v1/market/allTickers
// {"code":"200000","data":{"time":1700000000000,"ticker":[{"symbol":"BTC-USDT","last":"65000.1"}]}}

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeAdapter, PriceCollector, RestEndpoint};
use crate::engine::types::PriceMap;
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuotePolicy, RawPrice};

const SUCCESS_CODE: &str = "200000";

#[derive(Debug, Deserialize)]
struct KucoinResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<KucoinData>,
}

#[derive(Debug, Deserialize)]
struct KucoinData {
    #[serde(default)]
    ticker: Vec<KucoinTicker>,
}

#[derive(Debug, Deserialize)]
struct KucoinTicker {
    symbol: String,
    #[serde(default)]
    last: Option<RawPrice>,
}

pub struct KucoinAdapter {
    name: String,
    endpoint: RestEndpoint,
    normaliser: Normaliser,
}

impl KucoinAdapter {
    pub fn new(name: impl Into<String>, endpoint: RestEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            normaliser: Normaliser::new(QuotePolicy::UsdtOnly),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for KucoinAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.endpoint.get_text().await
    }

    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        let response: KucoinResponse = serde_json::from_str(body)?;
        if let Some(code) = response.code.as_deref().filter(|c| *c != SUCCESS_CODE) {
            let msg = response.msg.unwrap_or_default();
            return Err(AdapterError::Exchange(format!("code {code}: {msg}")));
        }
        let data = response
            .data
            .ok_or_else(|| AdapterError::Exchange("missing data".into()))?;

        let mut collector = PriceCollector::new(&self.name, &self.normaliser, observed_at);
        for ticker in &data.ticker {
            collector.offer(&ticker.symbol, ticker.last.as_ref());
        }
        Ok(collector.finish())
    }
}
