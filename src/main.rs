use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use arbx_rs::api::{self, AppState};
use arbx_rs::config::Settings;
use arbx_rs::distribution::{DistributionState, DEFAULT_EVENT_CAPACITY};
use arbx_rs::engine::ArbitrageEngine;
use arbx_rs::market_data::adapters::build_adapters;
use arbx_rs::market_data::adapters::rest::build_client;
use arbx_rs::market_data::Aggregator;
use arbx_rs::pipeline::Pipeline;
use arbx_rs::telemetry;

#[derive(Debug, Parser)]
#[command(name = "arbx", version, about = "Cross-exchange spot arbitrage monitor")]
struct Args {
    /// TOML settings file (defaults to ./arbx.toml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// HTTP listen port
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Seconds between aggregation cycles
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Run a single cycle, print opportunities as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(secs) = args.interval_secs {
        settings.poll.interval_secs = secs;
    }
    settings.validate().context("invalid settings")?;

    telemetry::init_tracing(&settings.log.filter);
    telemetry::init_metrics(settings.server.metrics_port);

    let client = build_client(settings.adapter_timeout(), &settings.poll.user_agent)
        .context("building HTTP client")?;
    let aggregator = Aggregator::new(build_adapters(&settings, &client), settings.adapter_timeout());
    let engine = ArbitrageEngine::new(settings.arbitrage.min_profit_pct);
    info!(
        exchanges = %aggregator.adapters().iter().map(|a| a.name()).join(", "),
        min_profit_pct = engine.min_profit_pct(),
        "Adapters ready"
    );

    let state = Arc::new(DistributionState::new(DEFAULT_EVENT_CAPACITY));
    let pipeline = Arc::new(Pipeline::new(aggregator, engine, Arc::clone(&state)));

    if args.once {
        let published = pipeline.run_cycle().await;
        println!("{}", serde_json::to_string_pretty(published.opportunities.as_ref())?);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Arc::clone(&pipeline).spawn_scheduler(settings.poll_interval(), shutdown_rx);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "API server listening");

    let app = AppState::new(state, &settings);
    api::serve(listener, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
        }
        info!("Shutdown requested");
    })
    .await
    .context("server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        warn!(error = %e, "Scheduler task ended abnormally");
    }
    info!("Bye");
    Ok(())
}
