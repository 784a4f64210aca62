// Shared trait + plumbing for exchange adapters

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::{ExchangeConfig, ExchangeKind, Settings};
use crate::engine::types::{PriceMap, PriceObservation};
use crate::error::AdapterError;
use crate::market_data::normaliser::{Normaliser, QuoteKind, RawPrice};

pub mod rest;
pub mod binance;
pub mod bybit;
pub mod coinbase;
pub mod huobi;
pub mod kraken;
pub mod kucoin;
pub mod mexc;
#[cfg(test)]
pub(crate) mod testing;

pub use rest::RestEndpoint;

/// One exchange's ticker feed. Implementors supply the wire fetch and the
/// exchange-specific normalisation; `poll` is the fault-isolating entry point.
#[async_trait::async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Display name, used as `PriceObservation::exchange`.
    fn name(&self) -> &str;

    /// Raw ticker payload.
    async fn fetch(&self) -> Result<String, AdapterError>;

    /// Canonical prices out of a raw payload.
    fn normalize(&self, body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError>;

    /// Fetch + normalise. Never fails: any fault becomes an empty map and a
    /// `Failed` report.
    async fn poll(&self) -> PollOutcome {
        let started = Instant::now();
        let result = match self.fetch().await {
            Ok(body) => self.normalize(&body, Utc::now()),
            Err(e) => Err(e),
        };
        let latency = started.elapsed();

        match result {
            Ok(prices) => {
                info!(exchange = self.name(), pairs = prices.len(), latency_ms = latency.as_millis() as u64, "Exchange polled");
                PollOutcome::ok(self.name(), prices, latency)
            }
            Err(e) => {
                warn!(exchange = self.name(), error = %e, "Exchange poll failed");
                PollOutcome::failed(self.name(), e.to_string(), latency)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SourceStatus {
    Ok,
    Failed { reason: String },
    TimedOut,
}

/// Per-exchange diagnostics for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub exchange: String,
    pub status: SourceStatus,
    pub pairs: usize,
    pub latency_ms: u64,
}

impl SourceReport {
    pub fn is_ok(&self) -> bool {
        self.status == SourceStatus::Ok
    }
}

#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub report: SourceReport,
    pub prices: PriceMap,
}

impl PollOutcome {
    pub fn ok(exchange: &str, prices: PriceMap, latency: Duration) -> Self {
        Self {
            report: SourceReport {
                exchange: exchange.to_string(),
                status: SourceStatus::Ok,
                pairs: prices.len(),
                latency_ms: latency.as_millis() as u64,
            },
            prices,
        }
    }

    pub fn failed(exchange: &str, reason: String, latency: Duration) -> Self {
        Self::empty(exchange, SourceStatus::Failed { reason }, latency)
    }

    pub fn timed_out(exchange: &str, waited: Duration) -> Self {
        Self::empty(exchange, SourceStatus::TimedOut, waited)
    }

    fn empty(exchange: &str, status: SourceStatus, latency: Duration) -> Self {
        Self {
            report: SourceReport {
                exchange: exchange.to_string(),
                status,
                pairs: 0,
                latency_ms: latency.as_millis() as u64,
            },
            prices: PriceMap::new(),
        }
    }
}

/// Accumulates one payload's tickers into a `PriceMap`.
///
/// A symbol reported twice keeps the later ticker, except that a native USDT
/// quote is never displaced by a USD stand-in.
pub struct PriceCollector<'a> {
    exchange: &'a str,
    normaliser: &'a Normaliser,
    observed_at: DateTime<Utc>,
    prices: PriceMap,
    quotes: HashMap<String, QuoteKind>,
    rejected: usize,
}

impl<'a> PriceCollector<'a> {
    pub fn new(exchange: &'a str, normaliser: &'a Normaliser, observed_at: DateTime<Utc>) -> Self {
        Self {
            exchange,
            normaliser,
            observed_at,
            prices: PriceMap::new(),
            quotes: HashMap::new(),
            rejected: 0,
        }
    }

    /// Returns whether the ticker made it into the map.
    pub fn offer(&mut self, raw_symbol: &str, raw_price: Option<&RawPrice>) -> bool {
        let Some(canonical) = self.normaliser.canonical_symbol(raw_symbol) else {
            return false;
        };
        let Some(price) = raw_price.and_then(|p| self.normaliser.price(p)) else {
            self.rejected += 1;
            trace!(exchange = self.exchange, symbol = raw_symbol, price = ?raw_price, "Rejected price");
            return false;
        };
        if matches!(self.quotes.get(&canonical.symbol), Some(existing) if *existing > canonical.quote) {
            return false;
        }
        let Some(observation) = PriceObservation::new(self.exchange, canonical.symbol.clone(), price, self.observed_at) else {
            return false;
        };
        self.quotes.insert(canonical.symbol.clone(), canonical.quote);
        self.prices.insert(canonical.symbol, observation);
        true
    }

    pub fn finish(self) -> PriceMap {
        debug!(exchange = self.exchange, accepted = self.prices.len(), rejected = self.rejected, "Normalised tickers");
        self.prices
    }
}

pub fn build_adapter(cfg: &ExchangeConfig, client: &reqwest::Client) -> Arc<dyn ExchangeAdapter> {
    let endpoint = RestEndpoint::new(client.clone(), cfg.url.clone());
    let name = cfg.name.clone();
    match cfg.kind {
        ExchangeKind::Binance => Arc::new(binance::BinanceAdapter::new(name, endpoint)),
        ExchangeKind::Coinbase => Arc::new(coinbase::CoinbaseAdapter::new(name, endpoint)),
        ExchangeKind::Kraken => Arc::new(kraken::KrakenAdapter::new(name, endpoint)),
        ExchangeKind::Kucoin => Arc::new(kucoin::KucoinAdapter::new(name, endpoint)),
        ExchangeKind::Huobi => Arc::new(huobi::HuobiAdapter::new(name, endpoint)),
        ExchangeKind::Bybit => Arc::new(bybit::BybitAdapter::new(name, endpoint)),
        ExchangeKind::Mexc => Arc::new(mexc::MexcAdapter::new(name, endpoint)),
    }
}

/// Adapters for every enabled exchange, in configuration order.
pub fn build_adapters(settings: &Settings, client: &reqwest::Client) -> Vec<Arc<dyn ExchangeAdapter>> {
    settings
        .enabled_exchanges()
        .map(|cfg| build_adapter(cfg, client))
        .collect()
}

#[cfg(test)]
pub(crate) fn test_endpoint() -> RestEndpoint {
    RestEndpoint::new(reqwest::Client::new(), "http://127.0.0.1:9/unused")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::normaliser::QuotePolicy;

    #[test]
    fn test_collector_native_beats_proxy() {
        let n = Normaliser::new(QuotePolicy::UsdAsUsdt);
        let now = Utc::now();

        let mut c = PriceCollector::new("Coinbase", &n, now);
        assert!(c.offer("BTC-USDT", Some(&RawPrice::Text("100".into()))));
        assert!(!c.offer("BTC-USD", Some(&RawPrice::Text("101".into()))));
        assert_eq!(c.finish()["BTCUSDT"].price, 100.0);

        // same outcome when the proxy is seen first
        let mut c = PriceCollector::new("Coinbase", &n, now);
        assert!(c.offer("BTC-USD", Some(&RawPrice::Text("101".into()))));
        assert!(c.offer("BTC-USDT", Some(&RawPrice::Text("100".into()))));
        assert_eq!(c.finish()["BTCUSDT"].price, 100.0);
    }

    #[test]
    fn test_collector_later_duplicate_wins() {
        let n = Normaliser::new(QuotePolicy::UsdtOnly);
        let mut c = PriceCollector::new("KuCoin", &n, Utc::now());
        c.offer("BTC-USDT", Some(&RawPrice::Number(100.0)));
        c.offer("BTC_USDT", Some(&RawPrice::Number(105.0)));
        let prices = c.finish();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["BTCUSDT"].price, 105.0);
        assert_eq!(prices["BTCUSDT"].exchange, "KuCoin");
    }

    #[test]
    fn test_collector_rejects_bad_prices() {
        let n = Normaliser::new(QuotePolicy::UsdtOnly);
        let mut c = PriceCollector::new("Binance", &n, Utc::now());
        assert!(!c.offer("AAAUSDT", None));
        assert!(!c.offer("BBBUSDT", Some(&RawPrice::Text("0".into()))));
        assert!(!c.offer("CCCUSDT", Some(&RawPrice::Text("0.0009".into()))));
        assert!(c.offer("DDDUSDT", Some(&RawPrice::Text("0.0011".into()))));
        let prices = c.finish();
        assert_eq!(prices.keys().collect::<Vec<_>>(), vec!["DDDUSDT"]);
    }

    #[test]
    fn test_build_adapters_follows_config() {
        let mut settings = Settings::default();
        for cfg in settings.exchanges.iter_mut() {
            cfg.enabled = matches!(cfg.kind, ExchangeKind::Kraken | ExchangeKind::Mexc);
        }
        let adapters = build_adapters(&settings, &reqwest::Client::new());
        let names: Vec<_> = adapters.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["Kraken", "MEXC"]);
    }

    fn binance_at(url: String) -> binance::BinanceAdapter {
        let client = rest::build_client(Duration::from_secs(5), "arbx-test").unwrap();
        binance::BinanceAdapter::new("Binance", RestEndpoint::new(client, url))
    }

    #[tokio::test]
    async fn test_poll_ok_over_http() {
        let body = r#"[
            {"symbol":"BTCUSDT","price":"65000.1"},
            {"symbol":"ETHUSDT","price":"3100.5"},
            {"symbol":"ETHBTC","price":"0.05"}
        ]"#;
        let url = testing::spawn_ticker_server(reqwest::StatusCode::OK, body).await;
        let outcome = binance_at(url).poll().await;

        assert_eq!(outcome.report.status, SourceStatus::Ok);
        assert_eq!(outcome.report.pairs, 2);
        assert_eq!(outcome.prices["ETHUSDT"].price, 3100.5);
    }

    #[tokio::test]
    async fn test_poll_server_error_is_failed() {
        let url = testing::spawn_ticker_server(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
        let outcome = binance_at(url).poll().await;

        match &outcome.report.status {
            SourceStatus::Failed { reason } => assert!(reason.contains("500"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(outcome.report.pairs, 0);
        assert!(outcome.prices.is_empty());
    }

    #[tokio::test]
    async fn test_poll_connection_refused_is_failed() {
        let outcome = binance_at(testing::refused_url().await).poll().await;
        assert!(matches!(outcome.report.status, SourceStatus::Failed { .. }));
        assert!(outcome.prices.is_empty());
    }

    #[test]
    fn test_source_report_wire_shape() {
        let outcome = PollOutcome::failed("Kraken", "boom".into(), Duration::from_millis(12));
        let v = serde_json::to_value(&outcome.report).unwrap();
        assert_eq!(v["exchange"], "Kraken");
        assert_eq!(v["status"]["state"], "failed");
        assert_eq!(v["status"]["reason"], "boom");
        assert_eq!(v["latencyMs"], 12);
    }
}
