//! Core primitives shared by the `beach-chat` server and terminal client.
//!
//! The first payload a client sends is its display name, every later payload
//! is one chat message, and the server answers with pre-styled lines.

pub mod logging;
pub mod palette;
pub mod wire;

pub use palette::{paint, SlotColor, PALETTE};
pub use wire::{format_chat_line, is_quit, normalize_inbound, replay_frame};

/// Port the server listens on and the client dials by default.
pub const DEFAULT_PORT: u16 = 8080;

/// Loopback address used by both sides unless overridden on the command line.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Number of client slots the server multiplexes.
pub const MAX_CLIENTS: usize = 10;

/// Number of formatted chat lines retained for replay to late joiners.
pub const HISTORY_CAPACITY: usize = 100;

/// Upper bound for a single message buffer, one byte of which is reserved.
/// Reads are capped at `MAX_MESSAGE_LEN - 1`.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Longest display name the client will send.
pub const MAX_NAME_LEN: usize = 49;

/// Control payload that ends a session instead of being broadcast.
pub const QUIT_SENTINEL: &str = "quit";
