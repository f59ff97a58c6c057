//! One neighbor-to-neighbor communication channel (spec.md §4.8's "Port
//! protocol"). A [`Chip`](crate::chip::Chip) owns one `Port` per physical
//! link between two adjacent nodes; each of a node's four directional
//! registers resolves to one shared `Port` (see `chip::neighbor_port`).
//!
//! A port holds at most one pending value plus at most one waiting reader
//! and one waiting writer — the single-slot handshake the real hardware
//! implements, no queueing. Whichever side arrives second completes
//! immediately *and* marks the side that arrived first as completed too
//! (`completed_reader`/`completed_writer`), so the chip can tell which
//! suspended node to reactivate, and that node's own next poll of this
//! same port collects its result without re-registering as a new waiter.

/// Result of attempting a read or write against a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOutcome {
    /// The transfer completed; for a read this carries the received value,
    /// for a write it echoes the value that was sent.
    Completed(u32),
    /// No counterparty was waiting; the caller must suspend.
    Suspended,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Port {
    waiting_reader: Option<usize>,
    waiting_writer: Option<(usize, u32)>,
    /// Set when a write arrived while `node` was the waiting reader: `node`
    /// suspended on its first `read`, and this is what its next `read`
    /// call (after the chip reactivates it) will collect.
    completed_reader: Option<(usize, u32)>,
    /// Set when a read arrived while `node` was the waiting writer: `node`
    /// suspended on its first `write`, and this is what its next `write`
    /// call collects (the value is unchanged, only the completion matters).
    completed_writer: Option<usize>,
}

impl Port {
    pub fn new() -> Self {
        Self::default()
    }

    /// `node` wants to read from this port.
    pub fn read(&mut self, node: usize) -> PortOutcome {
        if let Some((who, value)) = self.completed_reader {
            if who == node {
                self.completed_reader = None;
                return PortOutcome::Completed(value);
            }
        }
        if let Some((writer, value)) = self.waiting_writer.take() {
            self.completed_writer = Some(writer);
            return PortOutcome::Completed(value);
        }
        self.waiting_reader = Some(node);
        PortOutcome::Suspended
    }

    /// `node` wants to write `value`.
    pub fn write(&mut self, node: usize, value: u32) -> PortOutcome {
        if let Some(who) = self.completed_writer {
            if who == node {
                self.completed_writer = None;
                return PortOutcome::Completed(value);
            }
        }
        if let Some(reader) = self.waiting_reader.take() {
            self.completed_reader = Some((reader, value));
            return PortOutcome::Completed(value);
        }
        self.waiting_writer = Some((node, value));
        PortOutcome::Suspended
    }

    /// The node index (if any) whose suspended transfer on this port just
    /// became collectible, so the chip's active set can reactivate it. This
    /// is one-shot from the chip's point of view: call it once per step, not
    /// per poll — the node itself still does the actual collecting via its
    /// own next `read`/`write` call.
    pub fn take_woken(&mut self) -> Option<usize> {
        if let Some((reader, _)) = self.completed_reader {
            return Some(reader);
        }
        self.completed_writer
    }

    /// Drops a waiting (or already-completed-but-uncollected) reader
    /// registration without delivering a value, used when a multiport read
    /// resolves through a different port and the rest must be cancelled
    /// (spec.md §4.8, "completion cancels the others").
    pub fn cancel_reader(&mut self, node: usize) {
        if self.waiting_reader == Some(node) {
            self.waiting_reader = None;
        }
        if matches!(self.completed_reader, Some((who, _)) if who == node) {
            self.completed_reader = None;
        }
    }

    pub fn waiting_writer_node(&self) -> Option<usize> {
        self.waiting_writer.map(|(n, _)| n)
    }

    pub fn waiting_reader_node(&self) -> Option<usize> {
        self.waiting_reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_write_before_any_reader_suspends_the_writer() {
        let mut p = Port::new();
        assert_eq!(p.write(1, 99), PortOutcome::Suspended);
        assert_eq!(p.waiting_writer_node(), Some(1));
    }

    #[test]
    fn a_read_after_a_pending_write_completes_immediately_with_the_value() {
        let mut p = Port::new();
        p.write(1, 99);
        assert_eq!(p.read(2), PortOutcome::Completed(99));
        assert_eq!(p.waiting_writer_node(), None);
    }

    #[test]
    fn the_original_writer_is_woken_and_collects_completion_on_its_next_attempt() {
        let mut p = Port::new();
        assert_eq!(p.write(1, 99), PortOutcome::Suspended);
        p.read(2);
        assert_eq!(p.take_woken(), Some(1));
        // The writer's own retry (chip reactivated it) now completes.
        assert_eq!(p.write(1, 99), PortOutcome::Completed(99));
    }

    #[test]
    fn the_original_reader_is_woken_and_collects_the_value_on_its_next_attempt() {
        let mut p = Port::new();
        assert_eq!(p.read(2), PortOutcome::Suspended);
        p.write(1, 7);
        assert_eq!(p.take_woken(), Some(2));
        assert_eq!(p.read(2), PortOutcome::Completed(7));
    }

    #[test]
    fn ordering_does_not_change_the_transferred_value() {
        let mut writer_first = Port::new();
        writer_first.write(1, 42);
        let got_a = writer_first.read(2);

        let mut reader_first = Port::new();
        reader_first.read(2);
        let got_b = reader_first.write(1, 42);

        assert_eq!(got_a, PortOutcome::Completed(42));
        assert_eq!(got_b, PortOutcome::Completed(42));
    }

    #[test]
    fn a_cancelled_reader_does_not_linger() {
        let mut p = Port::new();
        p.read(5);
        p.cancel_reader(5);
        assert_eq!(p.waiting_reader_node(), None);
    }
}
