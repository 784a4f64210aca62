use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::AppState;
use crate::config::ExchangeConfig;
use crate::engine::types::{ArbitrageOpportunity, SnapshotSet};
use crate::market_data::adapters::SourceReport;

/// Public metadata for one configured exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeInfo {
    pub name: String,
    pub url: String,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
}

impl From<&ExchangeConfig> for ExchangeInfo {
    fn from(cfg: &ExchangeConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            url: cfg.website.clone().unwrap_or_else(|| cfg.url.clone()),
            logo: cfg.logo.clone(),
            description: cfg.description.clone(),
            enabled: cfg.enabled,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub cycle: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    pub symbols: usize,
    pub opportunities: usize,
    pub sources: Arc<Vec<SourceReport>>,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn prices(State(app): State<AppState>) -> Json<Arc<SnapshotSet>> {
    Json(app.state.current_prices())
}

pub async fn arbitrage(State(app): State<AppState>) -> Json<Arc<Vec<ArbitrageOpportunity>>> {
    Json(app.state.current_opportunities())
}

pub async fn exchanges(State(app): State<AppState>) -> Json<Arc<Vec<ExchangeInfo>>> {
    Json(Arc::clone(&app.exchanges))
}

pub async fn status(State(app): State<AppState>) -> Json<StatusView> {
    let current = app.state.current();
    Json(StatusView {
        cycle: current.cycle,
        updated_at: current.updated_at,
        symbols: current.prices.len(),
        opportunities: current.opportunities.len(),
        sources: Arc::clone(&current.sources),
    })
}
