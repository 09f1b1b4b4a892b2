use std::io;

use bytes::Bytes;
use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use beach_chat_core::{format_chat_line, is_quit, normalize_inbound};

use crate::history::HistoryRing;
use crate::session::{
    ClientSlot, ConnectionId, Delivery, PeerHandle, SessionError, SessionTable, SlotId,
};

/// Why a slot was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed its side of the connection.
    Eof,
    /// Reading from the peer failed.
    Error(io::ErrorKind),
    /// The peer sent the quit sentinel.
    Quit,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DisconnectReason::Eof => "eof",
            DisconnectReason::Error(_) => "error",
            DisconnectReason::Quit => "quit",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastMetrics {
    pub delivered: usize,
    pub bytes: usize,
    pub dropped: usize,
    pub closed: usize,
}

/// What the engine did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// First message of a slot: recorded as its name and answered with history.
    Joined { name: String, replayed: usize },
    /// Chat line stored in history and fanned out to the other slots.
    Broadcast(BroadcastMetrics),
    /// Quit sentinel; the slot has been freed.
    Quit { name: String },
    /// The message came from a connection that no longer owns its slot.
    Stale,
}

/// Owns the session table and history ring and applies every connection
/// event to them. All mutation happens through `&mut self`, so the event loop
/// driving it is the only place state changes.
#[derive(Debug)]
pub struct ChatEngine {
    table: SessionTable,
    history: HistoryRing,
}

impl ChatEngine {
    pub fn new(max_clients: usize, history_capacity: usize) -> Self {
        Self {
            table: SessionTable::new(max_clients),
            history: HistoryRing::new(history_capacity),
        }
    }

    pub fn table(&self) -> &SessionTable {
        &self.table
    }

    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    pub fn has_free_slot(&self) -> bool {
        self.table.has_free_slot()
    }

    /// Binds `peer` to the lowest free slot, unjoined.
    pub fn accept(&mut self, peer: PeerHandle) -> Result<SlotId, SessionError> {
        let connection_id = peer.id();
        let addr = peer.addr();
        let slot = self.table.allocate(peer)?;
        counter!("beach_chat_connections_accepted_total").increment(1);
        gauge!("beach_chat_active_slots").set(self.table.occupied() as f64);
        debug!(
            slot = %slot,
            connection_id = %connection_id,
            peer_addr = ?addr,
            occupied = self.table.occupied(),
            "connection bound to slot"
        );
        Ok(slot)
    }

    /// Records the reader task serving `slot` so teardown can stop it.
    pub fn attach_reader(&mut self, slot: SlotId, id: ConnectionId, reader: JoinHandle<()>) {
        match self.table.occupant_mut(slot, id) {
            Some(entry) => entry.peer_mut().attach_reader(reader),
            None => reader.abort(),
        }
    }

    /// Applies one read from `slot`.
    pub fn on_message(&mut self, slot: SlotId, id: ConnectionId, bytes: &[u8]) -> MessageOutcome {
        let message = normalize_inbound(bytes);
        let Some(entry) = self.table.occupant_mut(slot, id) else {
            debug!(slot = %slot, connection_id = %id, "dropping message from stale connection");
            return MessageOutcome::Stale;
        };

        if !entry.joined() {
            entry.join(message.clone());
            let mut replayed = 0usize;
            for frame in self.history.replay_frames() {
                match entry.peer().deliver(frame) {
                    Delivery::Queued => replayed += 1,
                    Delivery::Dropped => {
                        counter!("beach_chat_frames_dropped_total").increment(1);
                    }
                    Delivery::Closed => break,
                }
            }
            counter!("beach_chat_members_joined_total").increment(1);
            info!(slot = %slot, name = %message, replayed, "new member added to the chat");
            return MessageOutcome::Joined {
                name: message,
                replayed,
            };
        }

        let name = entry.label().to_owned();
        if is_quit(&message) {
            info!(slot = %slot, name = %name, "member said quit, closing connection");
            self.teardown(slot, DisconnectReason::Quit);
            return MessageOutcome::Quit { name };
        }

        let line = format_chat_line(entry.color(), &name, &message);
        info!(slot = %slot, name = %name, message = %message, "chat message");
        self.history.push(line.clone());
        let metrics = self.broadcast(slot, line);
        counter!("beach_chat_messages_broadcast_total").increment(1);
        MessageOutcome::Broadcast(metrics)
    }

    /// Tears down `slot` after its reader hit EOF or an error.
    pub fn on_closed(
        &mut self,
        slot: SlotId,
        id: ConnectionId,
        reason: DisconnectReason,
    ) -> Option<ClientSlot> {
        self.table.occupant_mut(slot, id)?;
        self.teardown(slot, reason)
    }

    fn teardown(&mut self, slot: SlotId, reason: DisconnectReason) -> Option<ClientSlot> {
        let occupant = self.table.release(slot)?;
        counter!("beach_chat_disconnects_total", "reason" => reason.as_str()).increment(1);
        gauge!("beach_chat_active_slots").set(self.table.occupied() as f64);
        match reason {
            DisconnectReason::Error(kind) => warn!(
                slot = %slot,
                name = %occupant.label(),
                error = ?kind,
                "connection failed; slot freed"
            ),
            _ => info!(
                slot = %slot,
                name = %occupant.label(),
                reason = reason.as_str(),
                "member disconnected"
            ),
        }
        Some(occupant)
    }

    /// Queues `line` for every occupied slot except `origin`, in slot order.
    fn broadcast(&self, origin: SlotId, line: String) -> BroadcastMetrics {
        let mut metrics = BroadcastMetrics::default();
        let frame = Bytes::from(line);
        for (slot, entry) in self.table.iter() {
            if slot == origin {
                continue;
            }
            match entry.peer().deliver(frame.clone()) {
                Delivery::Queued => {
                    metrics.delivered += 1;
                    metrics.bytes += frame.len();
                }
                Delivery::Dropped => {
                    metrics.dropped += 1;
                    counter!("beach_chat_frames_dropped_total").increment(1);
                    warn!(slot = %slot, name = %entry.label(), "outbound queue full; frame dropped");
                }
                // The reader will report the disconnect on its own.
                Delivery::Closed => metrics.closed += 1,
            }
        }
        metrics
    }
}
