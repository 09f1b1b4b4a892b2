use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;

use beach_chat_server::{telemetry, ChatServer, Cli, ServerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::try_from(cli)?;
    telemetry::init(&config.log, config.metrics_addr)?;

    info!(
        listen_addr = %config.listen_addr,
        max_clients = config.max_clients,
        history_size = config.history_size,
        "starting beach-chat server"
    );

    let server = ChatServer::bind(&config).await?;
    let local_addr = server.local_addr().context("listener has no local address")?;
    info!("listening on {local_addr}");

    server.run_until(shutdown_signal()).await;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
