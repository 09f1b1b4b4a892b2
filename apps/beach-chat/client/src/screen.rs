use std::io::{self, BufRead, Write};
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use tracing::debug;

use beach_chat_core::MAX_NAME_LEN;

const PROMPT_COLOR: Color = Color::DarkYellow;

/// Status lines shown outside the chat stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Unreachable,
    NamePrompt,
    Disconnected,
    SendFailed,
    Reconnecting { remaining_secs: u64 },
    Reconnected,
    ReconnectTimedOut { after: Duration },
    Exiting,
}

impl Notice {
    fn color(self) -> Color {
        match self {
            Notice::Unreachable
            | Notice::Disconnected
            | Notice::SendFailed
            | Notice::ReconnectTimedOut { .. } => Color::DarkRed,
            Notice::NamePrompt => Color::DarkCyan,
            Notice::Reconnecting { .. } => Color::DarkYellow,
            Notice::Reconnected => Color::DarkGreen,
            Notice::Exiting => Color::Reset,
        }
    }

    fn text(self) -> String {
        match self {
            Notice::Unreachable => {
                "Cannot connect to server. Make sure the server is running.".into()
            }
            Notice::NamePrompt => "Enter your name: ".into(),
            Notice::Disconnected => "Server disconnected. Attempting to reconnect...".into(),
            Notice::SendFailed => "Connection lost while sending message".into(),
            Notice::Reconnecting { remaining_secs } => {
                format!("Reconnecting... ({remaining_secs} seconds remaining)")
            }
            Notice::Reconnected => "Reconnected to server!".into(),
            Notice::ReconnectTimedOut { after } => {
                format!("Reconnection timeout. Giving up after {}.", describe(after))
            }
            Notice::Exiting => "Exiting...".into(),
        }
    }
}

fn describe(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        60 => "1 minute".into(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".into(),
        s => format!("{s} seconds"),
    }
}

/// Terminal output for the chat client. Every line ends in `\r\n` because raw
/// mode turns off output post-processing.
#[derive(Debug)]
pub struct Screen<W: Write> {
    out: W,
}

impl<W: Write> Screen<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Repaints `<prompt><input>` over the current line.
    pub fn redraw_prompt(&mut self, prompt: &str, input: &str) -> io::Result<()> {
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(PROMPT_COLOR),
            Print(prompt),
            Print(input),
            ResetColor
        )?;
        self.out.flush()
    }

    /// Prints a received payload on its own line, leaving the cursor at the
    /// start of the next one. Styling in the payload is passed through.
    pub fn show_incoming(&mut self, bytes: &[u8]) -> io::Result<()> {
        let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        for (idx, line) in bytes.split(|&b| b == b'\n').enumerate() {
            if idx > 0 {
                self.out.write_all(b"\r\n")?;
            }
            self.out
                .write_all(line.strip_suffix(b"\r").unwrap_or(line))?;
        }
        self.out.write_all(b"\r\n")?;
        self.out.flush()
    }

    /// Leaves the submitted line on screen above a fresh prompt.
    pub fn echo_submitted(&mut self, prompt: &str, line: &str) -> io::Result<()> {
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(PROMPT_COLOR),
            Print(prompt),
            Print(line),
            ResetColor,
            Print("\r\n")
        )?;
        self.out.flush()
    }

    pub fn notice(&mut self, notice: Notice) -> io::Result<()> {
        match notice {
            // Rewritten in place on every retry.
            Notice::Reconnecting { .. } => {
                queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            }
            Notice::Disconnected | Notice::Reconnected | Notice::ReconnectTimedOut { .. } => {
                queue!(self.out, Print("\r\n"))?;
            }
            _ => {}
        }
        queue!(
            self.out,
            SetForegroundColor(notice.color()),
            Print(notice.text()),
            ResetColor
        )?;
        if !matches!(notice, Notice::Reconnecting { .. } | Notice::NamePrompt) {
            queue!(self.out, Print("\r\n"))?;
        }
        self.out.flush()
    }
}

/// Prints the goodbye line once the terminal is back in cooked mode. A failed
/// write is logged and otherwise ignored; returns whether the line went out.
pub fn print_exit_notice<W: Write>(out: W) -> bool {
    match Screen::new(out).notice(Notice::Exiting) {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "failed to print exit notice");
            false
        }
    }
}

/// Asks for a display name in cooked mode. Returns `None` on end of input.
/// Names longer than the wire limit are truncated.
pub fn read_display_name<R, W>(input: &mut R, screen: &mut Screen<W>) -> io::Result<Option<String>>
where
    R: BufRead,
    W: Write,
{
    screen.notice(Notice::NamePrompt)?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let name = line.trim_end_matches(['\r', '\n']);
    Ok(Some(name.chars().take(MAX_NAME_LEN).collect()))
}
