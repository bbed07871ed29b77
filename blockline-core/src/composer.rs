//! Status composition and change detection.

use crate::slot::SlotTable;

/// Joins slots into the status line and remembers what was last published.
///
/// `previous` only moves forward through [`commit`](Self::commit), which the
/// caller invokes after a successful publish. A failed publish therefore
/// keeps reporting `changed` on the next pass.
#[derive(Debug, Clone)]
pub struct StatusComposer {
    delimiter: String,
    current: String,
    previous: String,
}

impl StatusComposer {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            current: String::new(),
            previous: String::new(),
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Rebuilds the status line from `slots` in registry order.
    ///
    /// Every non-empty slot is followed by the delimiter, then one trailing
    /// delimiter is stripped. Returns the line and whether it differs from
    /// the last committed one.
    pub fn compose(&mut self, slots: &SlotTable) -> (&str, bool) {
        self.current.clear();
        for slot in slots.iter().filter(|s| !s.is_empty()) {
            self.current.push_str(slot.as_str());
            self.current.push_str(&self.delimiter);
        }
        if !self.delimiter.is_empty() && self.current.ends_with(&self.delimiter) {
            let len = self.current.len() - self.delimiter.len();
            self.current.truncate(len);
        }

        let changed = self.current != self.previous;
        (self.current.as_str(), changed)
    }

    /// Records the current line as published.
    pub fn commit(&mut self) {
        self.previous.clone_from(&self.current);
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn previous(&self) -> &str {
        &self.previous
    }
}
