//! Terminal client for `beach-chat`.
//!
//! The client keeps a raw-mode line editor on the bottom line while messages
//! from the server scroll above it, and reconnects with a bounded retry loop
//! when the server goes away.

pub mod cli;
pub mod connector;
pub mod editor;
pub mod error;
pub mod escape;
pub mod event_loop;
pub mod keyboard;
pub mod reconnect;
pub mod screen;
pub mod terminal;

pub use cli::Cli;
pub use connector::{Connector, TcpConnector};
pub use editor::{EditorAction, InputBuffer, LineEditor};
pub use error::ClientError;
pub use escape::{EscapeParser, EscapeState, EscapeStep};
pub use event_loop::{prompt_for, ChatClient, ExitReason};
pub use reconnect::{ReconnectController, ReconnectOutcome, ReconnectPolicy, ReconnectState};
pub use screen::{print_exit_notice, read_display_name, Notice, Screen};
pub use terminal::{RawModeGuard, RawTerminal};
