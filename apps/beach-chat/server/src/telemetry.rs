use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use beach_chat_core::logging::{self, LogConfig};

/// Installs the tracing subscriber and, when an address is given, the
/// Prometheus exporter. Must run inside the tokio runtime.
pub fn init(log: &LogConfig, metrics_addr: Option<SocketAddr>) -> Result<()> {
    logging::init(log).context("failed to initialise tracing subscriber")?;

    if let Some(addr) = metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus metrics exporter")?;
        info!(metrics_addr = %addr, "Prometheus exporter listening");
    }

    Ok(())
}
