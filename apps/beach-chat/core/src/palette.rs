use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::Command;

/// Foreground colours handed out to server slots, cycled by slot index.
pub const PALETTE: [Color; 7] = [
    Color::DarkRed,
    Color::DarkGreen,
    Color::DarkYellow,
    Color::DarkBlue,
    Color::DarkMagenta,
    Color::DarkCyan,
    Color::Grey,
];

/// Colour bound to a slot for as long as that slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotColor(Color);

impl SlotColor {
    pub fn for_slot(index: usize) -> Self {
        SlotColor(PALETTE[index % PALETTE.len()])
    }

    pub fn color(self) -> Color {
        self.0
    }
}

/// Wraps `text` in the escape sequences for `color` followed by a full reset.
pub fn paint(color: Color, text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    // Writing into a String cannot fail.
    let _ = SetForegroundColor(color).write_ansi(&mut out);
    out.push_str(text);
    let _ = ResetColor.write_ansi(&mut out);
    out
}

/// Escape sequence that resets all styling.
pub fn reset_sequence() -> String {
    let mut out = String::new();
    let _ = ResetColor.write_ansi(&mut out);
    out
}

/// Escape sequence that switches the foreground to `color`.
pub fn color_sequence(color: Color) -> String {
    let mut out = String::new();
    let _ = SetForegroundColor(color).write_ansi(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_cycle_through_palette() {
        assert_eq!(SlotColor::for_slot(0).color(), Color::DarkRed);
        assert_eq!(SlotColor::for_slot(6).color(), Color::Grey);
        assert_eq!(SlotColor::for_slot(7), SlotColor::for_slot(0));
        assert_eq!(SlotColor::for_slot(9).color(), Color::DarkYellow);
    }

    #[test]
    fn paint_wraps_text_with_color_and_reset() {
        let painted = paint(Color::DarkRed, "hello");
        assert!(painted.starts_with(&color_sequence(Color::DarkRed)));
        assert!(painted.ends_with(&reset_sequence()));
        assert!(painted.contains("hello"));
        assert_ne!(color_sequence(Color::DarkRed), color_sequence(Color::DarkGreen));
    }
}
