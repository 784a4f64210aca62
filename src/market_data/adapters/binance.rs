// Binance spot: GET /api/v3/ticker/price -> [{"symbol":"BTCUSDT","price":"65000.01"}, ...]

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeAdapter, PriceCollector, RestEndpoint};
use crate::engine::types::PriceMap;
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuotePolicy, RawPrice};

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    symbol: String,
    #[serde(default)]
    price: Option<RawPrice>,
}

pub struct BinanceAdapter {
    name: String,
    endpoint: RestEndpoint,
    normaliser: Normaliser,
}

impl BinanceAdapter {
    pub fn new(name: impl Into<String>, endpoint: RestEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            normaliser: Normaliser::new(QuotePolicy::UsdtOnly),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.endpoint.get_text().await
    }

    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        let tickers: Vec<BinanceTicker> = serde_json::from_str(body)?;
        let mut collector = PriceCollector::new(&self.name, &self.normaliser, observed_at);
        for ticker in &tickers {
            collector.offer(&ticker.symbol, ticker.price.as_ref());
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
        let body = r#"[
            {"symbol":"BTCUSDT","price":"65000.10000000"},
            {"symbol":"ETHBTC","price":"0.05000000"},
            {"symbol":"BTCUPUSDT","price":"12.00000000"},
            {"symbol":"ETHDOWNUSDT","price":"3.10000000"},
            {"symbol":"SHIBUSDT","price":"0.00001800"},
            {"symbol":"SOLUSDT","price":"not-a-number"},
            {"symbol":"BNBUSDT"},
            {"symbol":"ETHUSDT","price":"3100.5"}
        ]"#;
        let adapter = BinanceAdapter::new("Binance", test_endpoint());
        let prices = adapter.normalize(body, Utc::now()).unwrap();

        let mut symbols: Vec<_> = prices.keys().cloned().collect();
        symbols.sort();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(prices["BTCUSDT"].price, 65000.1);
        assert_eq!(prices["BTCUSDT"].exchange, "Binance");
        assert_eq!(prices["ETHUSDT"].symbol, "ETHUSDT");
    }

    #[test]
    fn test_bad_price_type_skips_only_that_ticker() {
        let body = r#"[
            {"symbol":"BTCUSDT","price":"65000.1"},
            {"symbol":"ETHUSDT","price":true},
            {"symbol":"SOLUSDT","price":{"value":"150"}},
            {"symbol":"XRPUSDT","price":"0.52"}
        ]"#;
        let adapter = BinanceAdapter::new("Binance", test_endpoint());
        let prices = adapter.normalize(body, Utc::now()).unwrap();

        let mut symbols: Vec<_> = prices.keys().cloned().collect();
        symbols.sort();
        assert_eq!(symbols, vec!["BTCUSDT", "XRPUSDT"]);
        assert_eq!(prices["BTCUSDT"].price, 65000.1);
    }

    #[test]
    fn test_malformed_payload() {
        let adapter = BinanceAdapter::new("Binance", test_endpoint());
        let err = adapter.normalize(r#"{"code":-1003,"msg":"Too many requests"}"#, Utc::now());
        assert!(matches!(err, Err(AdapterError::Decode(_))));
    }
}
