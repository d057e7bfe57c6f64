use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// 初始化 Prometheus metrics exporter
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_metrics();

    tracing::info!("Metrics exporter started on http://{}/metrics", addr);
    Ok(())
}

/// 描述所有指标
fn describe_metrics() {
    describe_counter!(
        "thermo_ingest_accepted_total",
        "Total number of readings accepted by the collector"
    );
    describe_counter!(
        "thermo_ingest_rejected_total",
        "Total number of ingest requests rejected, by reason"
    );
    describe_gauge!("thermo_series_len", "Number of readings currently retained");
}

/// 记录接收成功
pub fn record_accepted(series_len: usize) {
    counter!("thermo_ingest_accepted_total", 1);
    gauge!("thermo_series_len", series_len as f64);
}

/// 记录拒绝
pub fn record_rejected(reason: &'static str) {
    counter!("thermo_ingest_rejected_total", 1, "reason" => reason);
}
