use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use beach_chat_core::MAX_MESSAGE_LEN;

use crate::config::ServerConfig;
use crate::engine::{ChatEngine, DisconnectReason};
use crate::session::{ConnectionId, PeerHandle, SlotId};

const EVENT_CHANNEL_DEPTH: usize = 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
}

/// Readiness reported by a connection's reader task.
#[derive(Debug)]
pub enum SlotEvent {
    Message {
        slot: SlotId,
        id: ConnectionId,
        bytes: Bytes,
    },
    Closed {
        slot: SlotId,
        id: ConnectionId,
        reason: DisconnectReason,
    },
}

/// Single-task event loop that owns the listener and the chat engine.
pub struct ChatServer {
    listener: TcpListener,
    engine: ChatEngine,
    events_tx: mpsc::Sender<SlotEvent>,
    events_rx: mpsc::Receiver<SlotEvent>,
    outbound_buffer: usize,
}

impl ChatServer {
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen_addr,
                source,
            })?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        Ok(Self {
            listener,
            engine: ChatEngine::new(config.max_clients, config.history_size),
            events_tx,
            events_rx,
            outbound_buffer: config.outbound_buffer,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until `shutdown` resolves.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(occupied = self.engine.table().occupied(), "shutdown requested");
                    break;
                }
                // Not armed while every slot is taken: extra connections stay
                // in the listen backlog until someone leaves.
                accepted = self.listener.accept(), if self.engine.has_free_slot() => {
                    match accepted {
                        Ok((stream, addr)) => self.admit(stream, addr),
                        Err(err) => back_off_after_accept_error(&err).await,
                    }
                }
                Some(event) = self.events_rx.recv() => self.dispatch(event),
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.outbound_buffer);
        let id = ConnectionId::new();

        let slot = match self.engine.accept(PeerHandle::new(id, Some(addr), outbound_tx)) {
            Ok(slot) => slot,
            Err(err) => {
                warn!(peer_addr = %addr, error = %err, "dropping connection");
                return;
            }
        };

        tokio::spawn(write_loop(write_half, outbound_rx, slot, id));
        let reader = tokio::spawn(read_loop(read_half, slot, id, self.events_tx.clone()));
        self.engine.attach_reader(slot, id, reader);
        info!(slot = %slot, peer_addr = %addr, "client connected");
    }

    fn dispatch(&mut self, event: SlotEvent) {
        match event {
            SlotEvent::Message { slot, id, bytes } => {
                let outcome = self.engine.on_message(slot, id, &bytes);
                debug!(slot = %slot, outcome = ?outcome, "message handled");
            }
            SlotEvent::Closed { slot, id, reason } => {
                self.engine.on_closed(slot, id, reason);
            }
        }
    }
}

/// Persistent failures such as running out of descriptors would otherwise
/// spin the loop.
async fn back_off_after_accept_error(err: &io::Error) {
    warn!(error = %err, backoff_ms = ACCEPT_BACKOFF.as_millis() as u64, "accept failed");
    sleep(ACCEPT_BACKOFF).await;
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    slot: SlotId,
    id: ConnectionId,
    events: mpsc::Sender<SlotEvent>,
) {
    let mut buf = vec![0u8; MAX_MESSAGE_LEN - 1];
    loop {
        let event = match reader.read(&mut buf).await {
            Ok(0) => SlotEvent::Closed {
                slot,
                id,
                reason: DisconnectReason::Eof,
            },
            Ok(n) => SlotEvent::Message {
                slot,
                id,
                bytes: Bytes::copy_from_slice(&buf[..n]),
            },
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => SlotEvent::Closed {
                slot,
                id,
                reason: DisconnectReason::Error(err.kind()),
            },
        };
        let closing = matches!(event, SlotEvent::Closed { .. });
        if events.send(event).await.is_err() || closing {
            break;
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
    slot: SlotId,
    id: ConnectionId,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(err) = writer.write_all(&frame).await {
            debug!(slot = %slot, connection_id = %id, error = %err, "send failed");
            return;
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test_timeout::tokio_timeout_test(10, paused)]
    async fn accept_error_pauses_the_loop() {
        let started = Instant::now();
        back_off_after_accept_error(&io::Error::from_raw_os_error(24)).await;
        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }
}
