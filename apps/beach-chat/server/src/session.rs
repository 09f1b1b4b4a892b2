use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use beach_chat_core::SlotColor;

/// Index of a reservation in the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one accepted connection. Lets the engine tell a live occupant
/// apart from a previous occupant of a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("all {capacity} client slots are occupied")]
    CapacityExhausted { capacity: usize },
}

/// Result of queueing a frame for a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    Dropped,
    Closed,
}

/// Server-side handle for a connected peer: an outbound queue drained by the
/// peer's writer task and, once spawned, the peer's reader task.
#[derive(Debug)]
pub struct PeerHandle {
    id: ConnectionId,
    addr: Option<SocketAddr>,
    outbound: mpsc::Sender<Bytes>,
    reader: Option<JoinHandle<()>>,
}

impl PeerHandle {
    pub fn new(id: ConnectionId, addr: Option<SocketAddr>, outbound: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            addr,
            outbound,
            reader: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    pub fn attach_reader(&mut self, reader: JoinHandle<()>) {
        self.reader = Some(reader);
    }

    pub fn deliver(&self, frame: Bytes) -> Delivery {
        match self.outbound.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

impl Drop for PeerHandle {
    fn drop(&mut self) {
        // The writer task exits once the outbound sender is gone; the reader
        // has to be stopped explicitly.
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// One occupied reservation in the session table.
#[derive(Debug)]
pub struct ClientSlot {
    peer: PeerHandle,
    name: Option<String>,
    color: SlotColor,
}

impl ClientSlot {
    fn new(peer: PeerHandle, color: SlotColor) -> Self {
        Self {
            peer,
            name: None,
            color,
        }
    }

    pub fn peer(&self) -> &PeerHandle {
        &self.peer
    }

    pub fn peer_mut(&mut self) -> &mut PeerHandle {
        &mut self.peer
    }

    /// Whether the identifying first message has been consumed.
    pub fn joined(&self) -> bool {
        self.name.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Sets the display name. Returns `false` if a name was already set.
    pub fn join(&mut self, name: String) -> bool {
        if self.name.is_some() {
            return false;
        }
        self.name = Some(name);
        true
    }

    pub fn color(&self) -> SlotColor {
        self.color
    }

    /// Display name for logs, including slots that never joined.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Fixed-capacity arena of client slots. Allocation always picks the lowest
/// free index.
#[derive(Debug)]
pub struct SessionTable {
    slots: Vec<Option<ClientSlot>>,
    free: BTreeSet<usize>,
}

impl SessionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn has_free_slot(&self) -> bool {
        !self.free.is_empty()
    }

    pub fn allocate(&mut self, peer: PeerHandle) -> Result<SlotId, SessionError> {
        let index = self
            .free
            .pop_first()
            .ok_or(SessionError::CapacityExhausted {
                capacity: self.capacity(),
            })?;
        self.slots[index] = Some(ClientSlot::new(peer, SlotColor::for_slot(index)));
        Ok(SlotId(index))
    }

    /// Frees `slot`, handing back its previous occupant.
    pub fn release(&mut self, slot: SlotId) -> Option<ClientSlot> {
        let occupant = self.slots.get_mut(slot.0)?.take()?;
        self.free.insert(slot.0);
        Some(occupant)
    }

    pub fn get(&self, slot: SlotId) -> Option<&ClientSlot> {
        self.slots.get(slot.0)?.as_ref()
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut ClientSlot> {
        self.slots.get_mut(slot.0)?.as_mut()
    }

    /// Looks up `slot` only if it is still held by connection `id`.
    pub fn occupant_mut(&mut self, slot: SlotId, id: ConnectionId) -> Option<&mut ClientSlot> {
        self.get_mut(slot).filter(|entry| entry.peer.id() == id)
    }

    /// Occupied slots in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &ClientSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|entry| (SlotId(index), entry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> (PeerHandle, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(4);
        (PeerHandle::new(ConnectionId::new(), None, tx), rx)
    }

    #[test]
    fn allocates_lowest_free_index() {
        let mut table = SessionTable::new(3);
        let a = table.allocate(peer().0).unwrap();
        let b = table.allocate(peer().0).unwrap();
        let c = table.allocate(peer().0).unwrap();
        assert_eq!((a, b, c), (SlotId(0), SlotId(1), SlotId(2)));

        table.release(SlotId(1)).unwrap();
        table.release(SlotId(0)).unwrap();
        assert_eq!(table.allocate(peer().0).unwrap(), SlotId(0));
        assert_eq!(table.allocate(peer().0).unwrap(), SlotId(1));
    }

    #[test]
    fn refuses_beyond_capacity() {
        let mut table = SessionTable::new(2);
        table.allocate(peer().0).unwrap();
        table.allocate(peer().0).unwrap();
        assert!(!table.has_free_slot());
        assert_eq!(
            table.allocate(peer().0),
            Err(SessionError::CapacityExhausted { capacity: 2 })
        );
        assert_eq!(table.occupied(), 2);
    }

    #[test]
    fn color_follows_slot_index() {
        let mut table = SessionTable::new(10);
        for _ in 0..10 {
            table.allocate(peer().0).unwrap();
        }
        for (slot, entry) in table.iter() {
            assert_eq!(entry.color(), SlotColor::for_slot(slot.0));
        }
    }

    #[test]
    fn name_is_set_once() {
        let mut table = SessionTable::new(1);
        let slot = table.allocate(peer().0).unwrap();
        let entry = table.get_mut(slot).unwrap();
        assert!(!entry.joined());
        assert!(entry.join("alice".into()));
        assert!(!entry.join("mallory".into()));
        assert_eq!(entry.name(), Some("alice"));
    }

    #[test]
    fn released_slot_starts_fresh() {
        let mut table = SessionTable::new(1);
        let slot = table.allocate(peer().0).unwrap();
        table.get_mut(slot).unwrap().join("alice".into());
        let old = table.release(slot).unwrap();
        assert_eq!(old.name(), Some("alice"));
        assert!(table.release(slot).is_none());

        let slot = table.allocate(peer().0).unwrap();
        assert!(!table.get(slot).unwrap().joined());
    }

    #[test]
    fn occupant_lookup_rejects_stale_connection() {
        let mut table = SessionTable::new(1);
        let (first, _rx) = peer();
        let first_id = first.id();
        let slot = table.allocate(first).unwrap();
        table.release(slot);
        let (second, _rx2) = peer();
        let second_id = second.id();
        table.allocate(second).unwrap();

        assert!(table.occupant_mut(slot, first_id).is_none());
        assert!(table.occupant_mut(slot, second_id).is_some());
    }

    #[test]
    fn deliver_reports_full_and_closed_queues() {
        let (tx, rx) = mpsc::channel(1);
        let handle = PeerHandle::new(ConnectionId::new(), None, tx);
        assert_eq!(handle.deliver(Bytes::from_static(b"a")), Delivery::Queued);
        assert_eq!(handle.deliver(Bytes::from_static(b"b")), Delivery::Dropped);
        drop(rx);
        assert_eq!(handle.deliver(Bytes::from_static(b"c")), Delivery::Closed);
    }
}
