use std::io;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::warn;

/// Switches the controlling terminal between raw and cooked mode. The
/// reconnect path drops to cooked mode while it prints status lines.
pub trait RawTerminal {
    fn acquire(&mut self) -> io::Result<()>;
    fn release(&mut self) -> io::Result<()>;
    fn is_raw(&self) -> bool;
}

/// Raw mode on the process terminal, restored on drop.
#[derive(Debug)]
pub struct RawModeGuard {
    enabled: bool,
    active: bool,
}

impl RawModeGuard {
    /// `enabled` is false when stdin is not a terminal; every call is then a
    /// no-op.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            active: false,
        }
    }
}

impl RawTerminal for RawModeGuard {
    fn acquire(&mut self) -> io::Result<()> {
        if self.enabled && !self.active {
            enable_raw_mode()?;
            self.active = true;
        }
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        if self.active {
            disable_raw_mode()?;
            self.active = false;
        }
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.active
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(error = %err, "failed to restore terminal mode");
        }
    }
}
