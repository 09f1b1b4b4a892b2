use std::io::Write;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::connector::Connector;
use crate::error::ClientError;
use crate::screen::{Notice, Screen};
use crate::terminal::RawTerminal;

pub const DEFAULT_RECONNECT_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Total time allowed before giving up.
    pub timeout: Duration,
    /// Pause between failed attempts.
    pub interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RECONNECT_TIMEOUT,
            interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectState {
    #[default]
    Idle,
    Attempting {
        attempts: u32,
    },
    Succeeded {
        attempts: u32,
        elapsed: Duration,
    },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
    },
}

#[derive(Debug)]
pub enum ReconnectOutcome<S> {
    Succeeded {
        stream: S,
        attempts: u32,
        elapsed: Duration,
    },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
    },
}

/// Bounded retry loop run after the connection to the server is lost.
///
/// On entry the terminal is put back in cooked mode. Each attempt dials a
/// fresh connection and resends the display name; success restores raw mode.
/// The elapsed time is checked before every attempt, so with the default
/// policy attempts happen at t = 0, 2, ..., 178 and the check at t = 180
/// gives up.
#[derive(Debug, Default)]
pub struct ReconnectController {
    policy: ReconnectPolicy,
    state: ReconnectState,
}

impl ReconnectController {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ReconnectState::Idle,
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    pub async fn run<C, T, W>(
        &mut self,
        connector: &C,
        name: &str,
        terminal: &mut T,
        screen: &mut Screen<W>,
    ) -> Result<ReconnectOutcome<C::Stream>, ClientError>
    where
        C: Connector,
        T: RawTerminal,
        W: Write,
    {
        terminal.release().map_err(ClientError::Terminal)?;
        screen.notice(Notice::Disconnected)?;

        let started = Instant::now();
        let mut attempts = 0u32;
        self.state = ReconnectState::Attempting { attempts };

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.policy.timeout {
                warn!(attempts, ?elapsed, server = %connector.target(), "reconnect timed out");
                screen.notice(Notice::ReconnectTimedOut {
                    after: self.policy.timeout,
                })?;
                self.state = ReconnectState::TimedOut { attempts, elapsed };
                return Ok(ReconnectOutcome::TimedOut { attempts, elapsed });
            }

            attempts += 1;
            self.state = ReconnectState::Attempting { attempts };
            match Self::dial(connector, name).await {
                Ok(stream) => {
                    let elapsed = started.elapsed();
                    terminal.acquire().map_err(ClientError::Terminal)?;
                    screen.notice(Notice::Reconnected)?;
                    info!(attempts, ?elapsed, "reconnected");
                    self.state = ReconnectState::Succeeded { attempts, elapsed };
                    return Ok(ReconnectOutcome::Succeeded {
                        stream,
                        attempts,
                        elapsed,
                    });
                }
                Err(err) => {
                    debug!(attempts, error = %err, "reconnect attempt failed");
                    let remaining = self.policy.timeout.saturating_sub(started.elapsed());
                    screen.notice(Notice::Reconnecting {
                        remaining_secs: remaining.as_secs(),
                    })?;
                }
            }
            sleep(self.policy.interval).await;
        }
    }

    async fn dial<C: Connector>(connector: &C, name: &str) -> std::io::Result<C::Stream> {
        let mut stream = connector.connect().await?;
        stream.write_all(name.as_bytes()).await?;
        stream.flush().await?;
        Ok(stream)
    }
}
