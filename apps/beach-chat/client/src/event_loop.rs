use std::io::Write;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use beach_chat_core::{is_quit, MAX_MESSAGE_LEN};

use crate::connector::Connector;
use crate::editor::{EditorAction, LineEditor};
use crate::error::ClientError;
use crate::escape::{EscapeParser, EscapeStep};
use crate::reconnect::{ReconnectController, ReconnectOutcome, ReconnectPolicy};
use crate::screen::{Notice, Screen};
use crate::terminal::RawTerminal;

/// Why the event loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user submitted `quit`.
    Quit,
    /// Keyboard input reached end of file.
    Eof,
    /// Ctrl-C, or Ctrl-D on an empty line.
    Interrupted,
}

pub fn prompt_for(name: &str) -> String {
    format!("[{name}]: ")
}

/// Client side of a chat session: waits on the server socket and the keyboard
/// at once, keeps the prompt line intact under incoming messages, and hands
/// connection failures to the [`ReconnectController`].
pub struct ChatClient<C: Connector, T, W: Write> {
    connector: C,
    stream: C::Stream,
    name: String,
    prompt: String,
    editor: LineEditor,
    escape: EscapeParser,
    terminal: T,
    screen: Screen<W>,
    keyboard: mpsc::Receiver<Vec<u8>>,
    policy: ReconnectPolicy,
}

impl<C, T, W> ChatClient<C, T, W>
where
    C: Connector,
    T: RawTerminal,
    W: Write,
{
    /// `stream` must already carry the display name.
    pub fn new(
        connector: C,
        stream: C::Stream,
        name: String,
        terminal: T,
        screen: Screen<W>,
        keyboard: mpsc::Receiver<Vec<u8>>,
        policy: ReconnectPolicy,
    ) -> Self {
        let prompt = prompt_for(&name);
        Self {
            connector,
            stream,
            name,
            prompt,
            editor: LineEditor::default(),
            escape: EscapeParser::new(),
            terminal,
            screen,
            keyboard,
            policy,
        }
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn screen(&self) -> &Screen<W> {
        &self.screen
    }

    pub async fn run(&mut self) -> Result<ExitReason, ClientError> {
        self.redraw()?;
        let mut buf = vec![0u8; MAX_MESSAGE_LEN];
        loop {
            tokio::select! {
                read = self.stream.read(&mut buf) => match read {
                    Ok(0) => {
                        info!("server closed the connection");
                        self.recover().await?;
                    }
                    Ok(n) => {
                        self.screen.show_incoming(&buf[..n])?;
                        self.redraw()?;
                    }
                    Err(err) => {
                        warn!(error = %err, "socket read failed");
                        self.recover().await?;
                    }
                },
                keys = self.keyboard.recv() => match keys {
                    Some(bytes) => {
                        for byte in bytes {
                            if let Some(exit) = self.on_key(byte).await? {
                                return Ok(exit);
                            }
                        }
                    }
                    None => return Ok(ExitReason::Eof),
                },
            }
        }
    }

    async fn on_key(&mut self, byte: u8) -> Result<Option<ExitReason>, ClientError> {
        if self.escape.feed(byte) == EscapeStep::Swallow {
            return Ok(None);
        }
        match self.editor.handle_byte(byte) {
            EditorAction::Redraw => self.redraw()?,
            EditorAction::Ignored => {}
            EditorAction::Interrupt => return Ok(Some(ExitReason::Interrupted)),
            EditorAction::Submit(line) => {
                self.screen.echo_submitted(&self.prompt, &line)?;
                if !line.is_empty() {
                    if let Err(err) = self.send(&line).await {
                        warn!(error = %err, "send failed");
                        self.screen.notice(Notice::SendFailed)?;
                        self.recover().await?;
                    }
                }
                if is_quit(&line) {
                    info!("quit requested");
                    return Ok(Some(ExitReason::Quit));
                }
                self.redraw()?;
            }
        }
        Ok(None)
    }

    async fn send(&mut self, line: &str) -> std::io::Result<()> {
        debug!(bytes = line.len(), "sending message");
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await
    }

    /// Replaces the broken connection or fails with
    /// [`ClientError::ReconnectTimedOut`]. The input buffer is left untouched.
    async fn recover(&mut self) -> Result<(), ClientError> {
        if let Err(err) = self.stream.shutdown().await {
            debug!(error = %err, "shutdown of broken connection failed");
        }
        let mut controller = ReconnectController::new(self.policy);
        let outcome = controller
            .run(&self.connector, &self.name, &mut self.terminal, &mut self.screen)
            .await?;
        match outcome {
            ReconnectOutcome::Succeeded { stream, .. } => {
                self.stream = stream;
                self.escape = EscapeParser::new();
                self.redraw()?;
                Ok(())
            }
            ReconnectOutcome::TimedOut { attempts, elapsed } => {
                Err(ClientError::ReconnectTimedOut { attempts, elapsed })
            }
        }
    }

    fn redraw(&mut self) -> Result<(), ClientError> {
        self.screen
            .redraw_prompt(&self.prompt, self.editor.buffer().as_str())?;
        Ok(())
    }
}
