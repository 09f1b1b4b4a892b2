//! Helpers for the one-message-per-read wire convention.
//!
//! There is no length prefix. Each read on the server is one logical message;
//! history replay frames are newline terminated so a client can tell them
//! apart even when several land in a single read.

use crate::palette::{paint, SlotColor};
use crate::QUIT_SENTINEL;

/// Decodes an inbound read into a logical message.
///
/// Everything from the first `\n` onwards is discarded, along with a `\r`
/// directly in front of it. Invalid UTF-8 is replaced rather than rejected.
pub fn normalize_inbound(bytes: &[u8]) -> String {
    let line = match bytes.iter().position(|&b| b == b'\n') {
        Some(idx) => &bytes[..idx],
        None => bytes,
    };
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Whether a normalized message is the session-ending control payload.
pub fn is_quit(message: &str) -> bool {
    message == QUIT_SENTINEL
}

/// Renders a broadcast line as `<color><name>: <payload><reset>`.
pub fn format_chat_line(color: SlotColor, name: &str, payload: &str) -> String {
    paint(color.color(), &format!("{name}: {payload}"))
}

/// Frames a stored history line for replay.
pub fn replay_frame(line: &str) -> String {
    let mut frame = String::with_capacity(line.len() + 1);
    frame.push_str(line);
    frame.push('\n');
    frame
}
