//! Static block registry.
//!
//! The block list is built once at startup and never changes afterwards.
//! Position in the list is the left-to-right position in the status line.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest usable signal index. Index `k` is delivered as `SIGRTMIN + k`.
pub const MAX_SIGNAL: u8 = 30;

/// How often a block re-runs on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    /// Re-run every N seconds.
    Every(u64),
    /// Only re-run on a signal or a click.
    Never,
}

impl Interval {
    /// Whether a block with this interval is due on global tick `tick`.
    pub fn is_due(&self, tick: u64) -> bool {
        match *self {
            Interval::Every(secs) => secs > 0 && tick % secs == 0,
            Interval::Never => false,
        }
    }
}

/// One block definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Literal prefix shown before non-empty output.
    pub icon: String,
    /// Shell command line, run through `sh -c`.
    pub command: String,
    pub interval: Interval,
    /// Signal index in `[1, MAX_SIGNAL]` that forces a re-run.
    pub signal: Option<u8>,
}

impl BlockSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            icon: String::new(),
            command: command.into(),
            interval: Interval::Never,
            signal: None,
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn every(mut self, secs: u64) -> Self {
        self.interval = Interval::Every(secs);
        self
    }

    pub fn signal(mut self, index: u8) -> Self {
        self.signal = Some(index);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("block {index} has an empty command")]
    EmptyCommand { index: usize },

    #[error("block {index} uses signal {signal}, expected 1..={max}", max = MAX_SIGNAL)]
    SignalOutOfRange { index: usize, signal: u8 },

    #[error("block {index} has a zero-second interval (use Interval::Never)")]
    ZeroInterval { index: usize },
}

/// The ordered, validated block list.
#[derive(Debug, Clone)]
pub struct Registry {
    blocks: Vec<BlockSpec>,
}

impl Registry {
    pub fn new(blocks: Vec<BlockSpec>) -> Result<Self, RegistryError> {
        for (index, block) in blocks.iter().enumerate() {
            if block.command.trim().is_empty() {
                return Err(RegistryError::EmptyCommand { index });
            }
            if let Some(signal) = block.signal {
                if !(1..=MAX_SIGNAL).contains(&signal) {
                    return Err(RegistryError::SignalOutOfRange { index, signal });
                }
            }
            if block.interval == Interval::Every(0) {
                return Err(RegistryError::ZeroInterval { index });
            }
        }
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&BlockSpec> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Distinct signal indices used by any block, ascending.
    pub fn signals(&self) -> Vec<u8> {
        let mut signals: Vec<u8> = self.blocks.iter().filter_map(|b| b.signal).collect();
        signals.sort_unstable();
        signals.dedup();
        signals
    }

    /// Positions of every block listening on `signal`.
    pub fn blocks_for_signal(&self, signal: u8) -> impl Iterator<Item = usize> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.signal == Some(signal))
            .map(|(i, _)| i)
    }
}

/// The compiled-in block table.
pub fn default_blocks() -> Vec<BlockSpec> {
    vec![
        BlockSpec::new(r#"free -h | awk '/^Mem/ { print $3"/"$2 }' | sed s/i//g"#)
            .icon("Mem: ")
            .every(30),
        BlockSpec::new("cut -d' ' -f1-3 /proc/loadavg")
            .icon("Load: ")
            .every(10),
        BlockSpec::new("cat /sys/class/power_supply/BAT0/capacity 2>/dev/null | sed 's/$/%/'")
            .icon("Bat: ")
            .every(60)
            .signal(2),
        BlockSpec::new("date '+%b %d (%a) %I:%M%p'").every(5).signal(1),
    ]
}
