// Kraken: GET /0/public/Ticker -> {"error":[],"result":{"XXBTZUSD":{"c":["65000.1","0.01"],...}}}
// `c` is the last trade as [price, lot volume].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{ExchangeAdapter, PriceCollector, RestEndpoint};
use crate::engine::types::PriceMap;
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuotePolicy, RawPrice};

#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: BTreeMap<String, KrakenTicker>,
}

#[derive(Debug, Deserialize)]
struct KrakenTicker {
    #[serde(default)]
    c: Vec<RawPrice>,
}

/// Kraken's asset aliases, first occurrence of each only.
///
/// This is deliberately shallow: legacy pairs such as `XXBTZUSD` come out as
/// `XBTCUSDT`, not `BTCUSDT`, and so never line up with other venues. Only the
/// newer unprefixed pairs (`XBTUSDT`, `SOLUSD`) produce comparable symbols.
pub fn kraken_alias(pair: &str) -> String {
    pair.to_uppercase().replacen("XBT", "BTC", 1).replacen("ZUSD", "USD", 1)
}

pub struct KrakenAdapter {
    name: String,
    endpoint: RestEndpoint,
    normaliser: Normaliser,
}

impl KrakenAdapter {
    pub fn new(name: impl Into<String>, endpoint: RestEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            normaliser: Normaliser::new(QuotePolicy::UsdAsUsdt),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for KrakenAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.endpoint.get_text().await
    }

    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        let response: KrakenResponse = serde_json::from_str(body)?;
        if !response.error.is_empty() {
            return Err(AdapterError::Exchange(response.error.join("; ")));
        }

        let mut collector = PriceCollector::new(&self.name, &self.normaliser, observed_at);
        for (pair, ticker) in &response.result {
            collector.offer(&kraken_alias(pair), ticker.c.first());
        }
        Ok(collector.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::adapters::test_endpoint;

    #[test]
    fn test_alias() {
        assert_eq!(kraken_alias("XBTUSDT"), "BTCUSDT");
        assert_eq!(kraken_alias("XXBTZUSD"), "XBTCUSD");
        assert_eq!(kraken_alias("XETHZUSD"), "XETHUSD");
        assert_eq!(kraken_alias("solusd"), "SOLUSD");
    }

    #[test]
    fn test_normalize() {
        let body = r#"{"error":[],"result":{
            "XBTUSDT":{"a":["65001.0","1","1.000"],"c":["65000.1","0.0100"]},
            "XXBTZUSD":{"c":["65010.0","0.5"]},
            "SOLUSD":{"c":["150.25","3"]},
            "ETHUSDT":{"c":["3100.0","1"]},
            "ETHUSD":{"c":["3101.0","1"]},
            "XETHXXBT":{"c":["0.0477","1"]},
            "ADAUSD":{"c":[]}
        }}"#;
        let adapter = KrakenAdapter::new("Kraken", test_endpoint());
        let prices = adapter.normalize(body, Utc::now()).unwrap();

        let mut symbols: Vec<_> = prices.keys().cloned().collect();
        symbols.sort();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT", "XBTCUSDT"]);
        assert_eq!(prices["BTCUSDT"].price, 65000.1);
        assert_eq!(prices["SOLUSDT"].price, 150.25);
        assert_eq!(prices["ETHUSDT"].price, 3100.0);
        assert_eq!(prices["XBTCUSDT"].price, 65010.0);
    }

    #[test]
    fn test_bad_price_type_skips_only_that_pair() {
        let body = r#"{"error":[],"result":{
            "DOTUSD":{"c":[false,"1"]},
            "SOLUSD":{"c":["150.25","3"]}
        }}"#;
        let adapter = KrakenAdapter::new("Kraken", test_endpoint());
        let prices = adapter.normalize(body, Utc::now()).unwrap();
        assert_eq!(prices.keys().collect::<Vec<_>>(), vec!["SOLUSDT"]);
    }

    #[test]
    fn test_error_payload() {
        let adapter = KrakenAdapter::new("Kraken", test_endpoint());
        let err = adapter
            .normalize(r#"{"error":["EGeneral:Too many requests"]}"#, Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("Too many requests"));
    }
}
