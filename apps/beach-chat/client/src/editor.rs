use beach_chat_core::MAX_MESSAGE_LEN;

const BACKSPACE: u8 = 0x7f;
const CTRL_H: u8 = 0x08;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;

/// Printable ASCII typed so far. The cursor is always at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    capacity: usize,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `byte` if it is printable and there is room.
    pub fn push(&mut self, byte: u8) -> bool {
        if !(0x20..=0x7e).contains(&byte) || self.text.len() >= self.capacity {
            return false;
        }
        self.text.push(char::from(byte));
        true
    }

    pub fn pop(&mut self) -> bool {
        self.text.pop().is_some()
    }

    /// Hands back the contents and leaves the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(MAX_MESSAGE_LEN - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    /// The buffer changed; the prompt line needs repainting.
    Redraw,
    /// Enter was pressed; carries the submitted line.
    Submit(String),
    /// Ctrl-C, or Ctrl-D on an empty line.
    Interrupt,
    Ignored,
}

#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: InputBuffer,
}

impl LineEditor {
    pub fn new(buffer: InputBuffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    pub fn handle_byte(&mut self, byte: u8) -> EditorAction {
        match byte {
            BACKSPACE | CTRL_H => {
                if self.buffer.pop() {
                    EditorAction::Redraw
                } else {
                    EditorAction::Ignored
                }
            }
            b'\r' | b'\n' => EditorAction::Submit(self.buffer.take()),
            CTRL_C => EditorAction::Interrupt,
            CTRL_D if self.buffer.is_empty() => EditorAction::Interrupt,
            _ => {
                if self.buffer.push(byte) {
                    EditorAction::Redraw
                } else {
                    EditorAction::Ignored
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(editor: &mut LineEditor, bytes: &[u8]) -> Vec<EditorAction> {
        bytes.iter().map(|&b| editor.handle_byte(b)).collect()
    }

    #[test]
    fn typing_appends_and_requests_redraw() {
        let mut editor = LineEditor::default();
        let actions = feed(&mut editor, b"hi");
        assert_eq!(actions, vec![EditorAction::Redraw, EditorAction::Redraw]);
        assert_eq!(editor.buffer().as_str(), "hi");
    }

    #[test]
    fn backspace_removes_last_char() {
        let mut editor = LineEditor::default();
        feed(&mut editor, b"hey");
        assert_eq!(editor.handle_byte(BACKSPACE), EditorAction::Redraw);
        assert_eq!(editor.handle_byte(CTRL_H), EditorAction::Redraw);
        assert_eq!(editor.buffer().as_str(), "h");
    }

    #[test]
    fn backspace_on_empty_is_noop() {
        let mut editor = LineEditor::default();
        assert_eq!(editor.handle_byte(BACKSPACE), EditorAction::Ignored);
        assert!(editor.buffer().is_empty());
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut editor = LineEditor::default();
        feed(&mut editor, b"hello");
        assert_eq!(
            editor.handle_byte(b'\r'),
            EditorAction::Submit("hello".into())
        );
        assert!(editor.buffer().is_empty());
        assert_eq!(editor.handle_byte(b'\n'), EditorAction::Submit(String::new()));
    }

    #[test]
    fn full_buffer_ignores_more_input() {
        let mut editor = LineEditor::new(InputBuffer::new(3));
        feed(&mut editor, b"abc");
        assert_eq!(editor.handle_byte(b'd'), EditorAction::Ignored);
        assert_eq!(editor.buffer().as_str(), "abc");
        assert_eq!(editor.buffer().len(), editor.buffer().capacity());
    }

    #[test]
    fn default_capacity_matches_message_limit() {
        let mut editor = LineEditor::default();
        for _ in 0..2000 {
            editor.handle_byte(b'x');
        }
        assert_eq!(editor.buffer().len(), MAX_MESSAGE_LEN - 1);
    }

    #[test]
    fn control_and_non_ascii_bytes_are_ignored() {
        let mut editor = LineEditor::default();
        assert_eq!(editor.handle_byte(0x01), EditorAction::Ignored);
        assert_eq!(editor.handle_byte(b'\t'), EditorAction::Ignored);
        assert_eq!(editor.handle_byte(0xc3), EditorAction::Ignored);
        assert!(editor.buffer().is_empty());
    }

    #[test]
    fn interrupt_keys() {
        let mut editor = LineEditor::default();
        assert_eq!(editor.handle_byte(CTRL_D), EditorAction::Interrupt);
        feed(&mut editor, b"x");
        assert_eq!(editor.handle_byte(CTRL_D), EditorAction::Ignored);
        assert_eq!(editor.handle_byte(CTRL_C), EditorAction::Interrupt);
        assert_eq!(editor.buffer().as_str(), "x");
    }
}
