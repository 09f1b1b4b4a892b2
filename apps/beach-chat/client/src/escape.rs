const ESC: u8 = 0x1b;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeState {
    #[default]
    Idle,
    SawEsc,
    SawBracket,
}

/// Verdict for one keyboard byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStep {
    /// Part of an arrow-key sequence; must not reach the line editor.
    Swallow,
    /// Ordinary input.
    Pass,
}

/// Detects `ESC [ A..D` one byte at a time so arrow keys never end up in the
/// input buffer. A byte that breaks a partial sequence is passed through.
#[derive(Debug, Default)]
pub struct EscapeParser {
    state: EscapeState,
}

impl EscapeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EscapeState {
        self.state
    }

    pub fn feed(&mut self, byte: u8) -> EscapeStep {
        let (next, step) = match (self.state, byte) {
            (_, ESC) => (EscapeState::SawEsc, EscapeStep::Swallow),
            (EscapeState::SawEsc, b'[') => (EscapeState::SawBracket, EscapeStep::Swallow),
            (EscapeState::SawBracket, b'A'..=b'D') => (EscapeState::Idle, EscapeStep::Swallow),
            _ => (EscapeState::Idle, EscapeStep::Pass),
        };
        self.state = next;
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(input: &[u8]) -> Vec<u8> {
        let mut parser = EscapeParser::new();
        input
            .iter()
            .copied()
            .filter(|&b| parser.feed(b) == EscapeStep::Pass)
            .collect()
    }

    #[test]
    fn arrow_keys_are_swallowed() {
        assert_eq!(passed(b"\x1b[A\x1b[B\x1b[C\x1b[D"), b"");
        assert_eq!(passed(b"a\x1b[Ab"), b"ab");
    }

    #[test]
    fn plain_text_passes() {
        assert_eq!(passed(b"hello [A]"), b"hello [A]");
    }

    #[test]
    fn broken_sequence_releases_the_breaking_byte() {
        assert_eq!(passed(b"\x1bx"), b"x");
        assert_eq!(passed(b"\x1b[Z"), b"Z");
    }

    #[test]
    fn escape_restarts_a_sequence() {
        assert_eq!(passed(b"\x1b\x1b[A"), b"");
        assert_eq!(passed(b"\x1b[\x1b[Bq"), b"q");
    }

    #[test]
    fn walks_through_states() {
        let mut parser = EscapeParser::new();
        assert_eq!(parser.state(), EscapeState::Idle);
        parser.feed(ESC);
        assert_eq!(parser.state(), EscapeState::SawEsc);
        parser.feed(b'[');
        assert_eq!(parser.state(), EscapeState::SawBracket);
        parser.feed(b'A');
        assert_eq!(parser.state(), EscapeState::Idle);
    }
}
