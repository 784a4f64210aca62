use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(port: u16) {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .expect("prometheus exporter install");

    describe_metrics();
    tracing::info!(port, "Prometheus exporter listening on /metrics");
    metrics::gauge!("arbx_up").set(1.0);
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(_port: u16) { /* no-op */ }

#[cfg(feature = "metrics-exporter")]
fn describe_metrics() {
    use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

    describe_counter!("arbx_cycles_total", "Completed aggregation cycles");
    describe_histogram!("arbx_cycle_duration_ms", Unit::Milliseconds, "Aggregate + detect wall time per cycle");
    describe_gauge!("arbx_symbols", "Symbols in the latest published snapshot");
    describe_gauge!("arbx_opportunities", "Opportunities in the latest published snapshot");
    describe_counter!("arbx_source_failures_total", "Exchange polls that failed or timed out");
}
