// In-memory adapters and a local ticker server for adapter, aggregator, pipeline and API tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;

use crate::engine::types::{PriceMap, PriceObservation};
use crate::error::AdapterError;
use crate::market_data::adapters::ExchangeAdapter;

pub enum Behaviour {
    Quotes(Vec<(&'static str, f64)>),
    ParseError,
    Slow(Duration),
    Panic,
}

pub struct FakeAdapter {
    name: &'static str,
    behaviour: Behaviour,
    polls: AtomicUsize,
}

impl FakeAdapter {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for FakeAdapter {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(String::new())
            }
            Behaviour::Panic => panic!("adapter blew up"),
            _ => Ok(String::new()),
        }
    }

    fn normalize(&self, _body: &str, observed_at: DateTime<Utc>) -> Result<PriceMap, AdapterError> {
        match &self.behaviour {
            Behaviour::Quotes(quotes) => Ok(quotes
                .iter()
                .map(|(symbol, price)| {
                    let obs = PriceObservation {
                        exchange: self.name.to_string(),
                        symbol: symbol.to_string(),
                        price: *price,
                        observed_at,
                    };
                    (symbol.to_string(), obs)
                })
                .collect()),
            Behaviour::ParseError => Err(AdapterError::Decode(serde_json::from_str::<u8>("{").unwrap_err())),
            _ => Ok(PriceMap::new()),
        }
    }
}

pub fn fake_adapter(name: &'static str, behaviour: Behaviour) -> Arc<FakeAdapter> {
    Arc::new(FakeAdapter { name, behaviour, polls: AtomicUsize::new(0) })
}

pub fn fake(name: &'static str, behaviour: Behaviour) -> Arc<dyn ExchangeAdapter> {
    fake_adapter(name, behaviour)
}

/// Local HTTP server answering every GET on `/ticker` with `status` and `body`.
/// Returns the full ticker URL.
pub async fn spawn_ticker_server(status: StatusCode, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/ticker", get(move || async move { (status, body) }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/ticker")
}

/// A URL on a port nothing listens on, so connecting is refused.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/ticker")
}
