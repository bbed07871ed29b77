//! Bounded per-block output buffers.

/// Default slot capacity in bytes.
pub const DEFAULT_SLOT_CAPACITY: usize = 50;

/// The latest output of one block.
///
/// Content never exceeds `capacity` bytes. Longer text is cut at the last
/// UTF-8 character boundary that fits; truncation is silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    text: String,
    capacity: usize,
}

impl Slot {
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether storing `text` would leave the content as it is.
    pub fn holds(&self, text: &str) -> bool {
        self.text == truncate_at_boundary(text, self.capacity)
    }

    /// Replaces the content. Returns `true` if `text` had to be truncated.
    pub fn store(&mut self, text: &str) -> bool {
        let kept = truncate_at_boundary(text, self.capacity);
        self.text.clear();
        self.text.push_str(kept);
        kept.len() < text.len()
    }
}

fn truncate_at_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// One slot per registered block, in registry order. The slot count is
/// fixed at construction.
#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    pub fn new(count: usize, capacity: usize) -> Self {
        Self {
            slots: (0..count).map(|_| Slot::new(capacity)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Stores `text` into slot `index`. Returns `None` for an unknown index,
    /// otherwise whether the text was truncated.
    pub fn store(&mut self, index: usize, text: &str) -> Option<bool> {
        self.slots.get_mut(index).map(|slot| slot.store(text))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slot> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Slot> {
        self.slots.iter_mut()
    }
}
