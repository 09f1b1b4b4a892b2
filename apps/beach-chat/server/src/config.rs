use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use beach_chat_core::logging::{LogConfig, LogLevel};
use beach_chat_core::{DEFAULT_ADDR, HISTORY_CAPACITY, MAX_CLIENTS};

const DEFAULT_OUTBOUND_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_clients: usize,
    pub history_size: usize,
    pub outbound_buffer: usize,
    pub metrics_addr: Option<SocketAddr>,
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], beach_chat_core::DEFAULT_PORT)),
            max_clients: MAX_CLIENTS,
            history_size: HISTORY_CAPACITY,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            metrics_addr: None,
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "beach-chat-server",
    author,
    version,
    about = "Relay chat lines between terminal clients with per-slot colours and history replay"
)]
pub struct Cli {
    /// Address to bind the chat listener to.
    #[arg(long, env = "BEACH_CHAT_LISTEN_ADDR", default_value = DEFAULT_ADDR)]
    pub listen_addr: String,

    /// Number of client slots served at once; further connections wait.
    #[arg(long, env = "BEACH_CHAT_MAX_CLIENTS", default_value_t = MAX_CLIENTS)]
    pub max_clients: usize,

    /// Chat lines retained for replay to newly joined clients.
    #[arg(long, env = "BEACH_CHAT_HISTORY_SIZE", default_value_t = HISTORY_CAPACITY)]
    pub history_size: usize,

    /// Frames queued per client before further frames are dropped.
    #[arg(long, env = "BEACH_CHAT_OUTBOUND_BUFFER", default_value_t = DEFAULT_OUTBOUND_BUFFER)]
    pub outbound_buffer: usize,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "BEACH_CHAT_METRICS_ADDR")]
    pub metrics_addr: Option<String>,

    #[arg(
        long = "log-level",
        value_enum,
        env = "BEACH_CHAT_LOG_LEVEL",
        default_value_t = LogLevel::Info,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub log_level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "BEACH_CHAT_LOG_FILE",
        help = "Write structured logs to the specified file instead of stderr"
    )]
    pub log_file: Option<PathBuf>,
}

impl TryFrom<Cli> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let listen_addr: SocketAddr = cli
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", cli.listen_addr))?;
        let metrics_addr = cli
            .metrics_addr
            .as_deref()
            .map(|addr| {
                addr.parse::<SocketAddr>()
                    .with_context(|| format!("invalid metrics address: {addr}"))
            })
            .transpose()?;

        if cli.max_clients == 0 {
            bail!("max clients must be at least 1");
        }
        // A joiner's whole replay is queued in one go.
        if cli.outbound_buffer <= cli.history_size {
            bail!(
                "outbound buffer ({}) must exceed history size ({})",
                cli.outbound_buffer,
                cli.history_size
            );
        }

        Ok(ServerConfig {
            listen_addr,
            max_clients: cli.max_clients,
            history_size: cli.history_size,
            outbound_buffer: cli.outbound_buffer,
            metrics_addr,
            log: LogConfig {
                level: cli.log_level,
                file: cli.log_file,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec!["beach-chat-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_from(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn defaults_match_wire_contract() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.max_clients, 10);
        assert_eq!(config.history_size, 100);
        assert!(config.metrics_addr.is_none());
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn rejects_bad_listen_address() {
        let err = parse(&["--listen-addr", "not-an-addr"]).unwrap_err();
        assert!(err.to_string().contains("invalid listen address"));
    }

    #[test]
    fn rejects_buffer_smaller_than_history() {
        let err = parse(&["--history-size", "300"]).unwrap_err();
        assert!(err.to_string().contains("must exceed history size"));
    }

    #[test]
    fn rejects_zero_clients() {
        assert!(parse(&["--max-clients", "0"]).is_err());
    }

    #[test]
    fn parses_metrics_address() {
        let config = parse(&["--metrics-addr", "127.0.0.1:9100"]).unwrap();
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }
}
