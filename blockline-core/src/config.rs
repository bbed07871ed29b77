use crate::slot::DEFAULT_SLOT_CAPACITY;
use std::time::Duration;

pub const DEFAULT_DELIMITER: &str = " | ";

/// Values the engine is given rather than decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Placed between non-empty blocks.
    pub delimiter: String,
    /// Maximum bytes kept per block.
    pub slot_capacity: usize,
    /// Upper bound on one block run; `None` waits indefinitely.
    pub block_timeout: Option<Duration>,
    /// Length of one scheduler tick. Intervals count in ticks.
    pub tick: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            slot_capacity: DEFAULT_SLOT_CAPACITY,
            block_timeout: None,
            tick: Duration::from_secs(1),
        }
    }
}
