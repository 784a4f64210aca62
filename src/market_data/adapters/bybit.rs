// Bybit v5: GET /v5/market/tickers?category=spot
// {"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[{"symbol":"BTCUSDT","lastPrice":"65000"}]}}

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeAdapter, PriceCollector, RestEndpoint};
use crate::engine::types::PriceMap;
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuotePolicy, RawPrice};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse {
    #[serde(default)]
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<BybitResult>,
}

#[derive(Debug, Deserialize)]
struct BybitResult {
    #[serde(default)]
    list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    symbol: String,
    #[serde(default)]
    last_price: Option<RawPrice>,
}

pub struct BybitAdapter {
    name: String,
    endpoint: RestEndpoint,
    normaliser: Normaliser,
}

impl BybitAdapter {
    pub fn new(name: impl Into<String>, endpoint: RestEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            normaliser: Normaliser::new(QuotePolicy::UsdtOnly),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for BybitAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.endpoint.get_text().await
    }

    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        let response: BybitResponse = serde_json::from_str(body)?;
        if response.ret_code != 0 {
            return Err(AdapterError::Exchange(format!("retCode {}: {}", response.ret_code, response.ret_msg)));
        }
        let tickers = response
            .result
            .ok_or_else(|| AdapterError::Exchange("missing result".into()))?
            .list;

        let mut collector = PriceCollector::new(&self.name, &self.normaliser, observed_at);
        for ticker in &tickers {
            collector.offer(&ticker.symbol, ticker.last_price.as_ref());
        }
        Ok(collector.finish())
    }
}
