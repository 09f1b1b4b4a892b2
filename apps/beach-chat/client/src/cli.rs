use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use beach_chat_core::logging::{LogConfig, LogLevel};
use beach_chat_core::DEFAULT_ADDR;

use crate::reconnect::ReconnectPolicy;

#[derive(Debug, Parser)]
#[command(
    name = "beach-chat",
    author,
    version,
    about = "Terminal client for a beach-chat server"
)]
pub struct Cli {
    /// Server address to connect to.
    #[arg(long, env = "BEACH_CHAT_SERVER", default_value = DEFAULT_ADDR)]
    pub server: String,

    /// Give up reconnecting after this many seconds.
    #[arg(long, env = "BEACH_CHAT_RECONNECT_TIMEOUT_SECS", default_value_t = 180)]
    pub reconnect_timeout_secs: u64,

    /// Seconds to wait between reconnect attempts.
    #[arg(
        long,
        env = "BEACH_CHAT_RECONNECT_INTERVAL_SECS",
        default_value_t = 2,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub reconnect_interval_secs: u64,

    #[arg(
        long = "log-level",
        value_enum,
        env = "BEACH_CHAT_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub log_level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "BEACH_CHAT_LOG_FILE",
        help = "Write logs to this file; nothing is logged without it"
    )]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            timeout: Duration::from_secs(self.reconnect_timeout_secs),
            interval: Duration::from_secs(self.reconnect_interval_secs),
        }
    }

    /// Logging shares the terminal with the chat, so it is file-only.
    pub fn log_config(&self) -> Option<LogConfig> {
        self.log_file.as_ref().map(|file| LogConfig {
            level: self.log_level,
            file: Some(file.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_contract() {
        let cli = Cli::parse_from(["beach-chat"]);
        assert_eq!(cli.server, DEFAULT_ADDR);
        assert_eq!(cli.policy(), ReconnectPolicy::default());
        assert!(cli.log_config().is_none());
    }

    #[test]
    fn log_file_enables_logging() {
        let cli = Cli::parse_from([
            "beach-chat",
            "--log-file",
            "/tmp/chat.log",
            "--log-level",
            "debug",
        ]);
        let config = cli.log_config().unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.file.as_deref(), Some(std::path::Path::new("/tmp/chat.log")));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["beach-chat", "--reconnect-interval-secs", "0"]).is_err());
    }
}
