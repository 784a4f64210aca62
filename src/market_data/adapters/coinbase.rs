// Coinbase: GET /products/tickers -> {"BTC-USD": {"price": "65000.00", ...}, "BTC-USDT": {...}}
// Most Coinbase books are USD-quoted, so USD stands in for USDT unless a native
// USDT book exists for the same base.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeAdapter, PriceCollector, RestEndpoint};
use crate::engine::types::PriceMap;
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuotePolicy, RawPrice};

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    #[serde(default)]
    price: Option<RawPrice>,
}

pub struct CoinbaseAdapter {
    name: String,
    endpoint: RestEndpoint,
    normaliser: Normaliser,
}

impl CoinbaseAdapter {
    pub fn new(name: impl Into<String>, endpoint: RestEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            normaliser: Normaliser::new(QuotePolicy::UsdAsUsdt),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for CoinbaseAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.endpoint.get_text().await
    }

    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        let products: BTreeMap<String, CoinbaseTicker> = serde_json::from_str(body)?;
        let mut collector = PriceCollector::new(&self.name, &self.normaliser, observed_at);
        for (product_id, ticker) in &products {
            collector.offer(product_id, ticker.price.as_ref());
        }
        Ok(collector.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::adapters::test_endpoint;

    #[test]
    fn test_normalize() {
        let body = r#"{
            "BTC-USD": {"price": "65100.00", "volume": "1234.5"},
            "BTC-USDT": {"price": "65080.00"},
            "ETH-USD": {"price": "3105.10"},
            "ETH-EUR": {"price": "2890.00"},
            "SOL-USDC": {"price": "150.0"},
            "DOGE-USD": {"price": null}
        }"#;
        let adapter = CoinbaseAdapter::new("Coinbase", test_endpoint());
        let prices = adapter.normalize(body, Utc::now()).unwrap();

        assert_eq!(prices.len(), 2);
        // native USDT book wins over the USD stand-in
        assert_eq!(prices["BTCUSDT"].price, 65080.0);
        assert_eq!(prices["ETHUSDT"].price, 3105.1);
        assert_eq!(prices["ETHUSDT"].symbol, "ETHUSDT");
    }

    #[test]
    fn test_error_object_is_a_fault() {
        let adapter = CoinbaseAdapter::new("Coinbase", test_endpoint());
        assert!(adapter.normalize(r#"{"message":"NotFound"}"#, Utc::now()).is_err());
    }
}
