use std::collections::VecDeque;

use bytes::Bytes;

use beach_chat_core::replay_frame;

/// Fixed-capacity FIFO of formatted chat lines.
///
/// Once full, every push evicts the oldest line. Lines are never reordered,
/// deduplicated or expired.
#[derive(Debug)]
pub struct HistoryRing {
    entries: VecDeque<String>,
    capacity: usize,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `line`, returning the evicted oldest line when at capacity.
    pub fn push(&mut self, line: String) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(line);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }

    /// Newline-terminated frames ready to be sent one by one to a joiner.
    pub fn replay_frames(&self) -> impl Iterator<Item = Bytes> + '_ {
        self.iter().map(|line| Bytes::from(replay_frame(line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_until_capacity() {
        let mut ring = HistoryRing::new(3);
        assert!(ring.is_empty());
        assert_eq!(ring.push("a".into()), None);
        assert_eq!(ring.push("b".into()), None);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut ring = HistoryRing::new(3);
        for line in ["a", "b", "c"] {
            ring.push(line.into());
        }
        assert_eq!(ring.push("d".into()), Some("a".to_string()));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec!["b", "c", "d"]);
    }

    #[test]
    fn keeps_cycling_past_capacity() {
        let mut ring = HistoryRing::new(100);
        for i in 0..250 {
            ring.push(format!("line {i}"));
            assert!(ring.len() <= ring.capacity());
        }
        let lines: Vec<_> = ring.iter().collect();
        assert_eq!(lines.first(), Some(&"line 150"));
        assert_eq!(lines.last(), Some(&"line 249"));
        assert!(lines.windows(2).all(|pair| {
            let a: usize = pair[0].trim_start_matches("line ").parse().unwrap();
            let b: usize = pair[1].trim_start_matches("line ").parse().unwrap();
            b == a + 1
        }));
    }

    #[test]
    fn replay_frames_are_newline_terminated() {
        let mut ring = HistoryRing::new(2);
        ring.push("x: 1".into());
        ring.push("y: 2".into());
        let frames: Vec<_> = ring.replay_frames().collect();
        assert_eq!(frames, vec![Bytes::from("x: 1\n"), Bytes::from("y: 2\n")]);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut ring = HistoryRing::new(0);
        assert_eq!(ring.push("lost".into()), None);
        assert!(ring.is_empty());
    }
}
