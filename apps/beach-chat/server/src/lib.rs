//! Chat relay: a bounded table of client slots fed by one event loop, a
//! rolling history replayed to every newcomer, and best-effort fan-out of
//! each chat line to all other slots.

pub mod config;
pub mod engine;
pub mod history;
pub mod server;
pub mod session;
pub mod telemetry;

pub use config::{Cli, ServerConfig};
pub use engine::{BroadcastMetrics, ChatEngine, DisconnectReason, MessageOutcome};
pub use history::HistoryRing;
pub use server::{ChatServer, ServerError, SlotEvent};
pub use session::{ClientSlot, ConnectionId, PeerHandle, SessionError, SessionTable, SlotId};
