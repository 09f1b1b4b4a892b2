use std::io;
use std::time::Duration;

use beach_chat_core::logging::InitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to {addr}: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("reconnection gave up after {attempts} attempts in {elapsed:?}")]
    ReconnectTimedOut { attempts: u32, elapsed: Duration },
    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),
    #[error(transparent)]
    Logging(#[from] InitError),
    #[error(transparent)]
    Io(#[from] io::Error),
}
