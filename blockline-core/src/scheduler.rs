//! Decides which blocks are due and runs them.
//!
//! A pass runs every due block concurrently, each on its own child process
//! and its own slot. Slots are handed out as disjoint `&mut` borrows, so no
//! two runs can ever write the same slot, and the pass only returns once all
//! of them finished. The composer therefore never sees a half-updated table.

use crate::registry::Registry;
use crate::runner::{BlockRunner, RunOutcome};
use crate::signals::SignalSet;
use crate::slot::SlotTable;

use futures::future::join_all;
use std::collections::BTreeMap;

/// The blocks to run in one pass, keyed by registry position.
///
/// Each block appears at most once. A click button, if any caused the block
/// to be due, is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueSet {
    entries: BTreeMap<usize, Option<u8>>,
}

impl DueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, button: Option<u8>) {
        let entry = self.entries.entry(index).or_insert(button);
        if entry.is_none() {
            *entry = button;
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    /// The button recorded for `index`, if `index` is due.
    pub fn get(&self, index: usize) -> Option<Option<u8>> {
        self.entries.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Due positions in registry order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }
}

/// Counts for one finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl PassReport {
    pub fn ran(&self) -> usize {
        self.updated + self.unchanged + self.failed
    }
}

#[derive(Debug)]
pub struct Scheduler {
    registry: Registry,
    runner: BlockRunner,
    slots: SlotTable,
}

impl Scheduler {
    pub fn new(registry: Registry, runner: BlockRunner, slot_capacity: usize) -> Self {
        let slots = SlotTable::new(registry.len(), slot_capacity);
        Self {
            registry,
            runner,
            slots,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// Every block, used for the startup pass.
    pub fn all_blocks(&self) -> DueSet {
        let mut due = DueSet::new();
        for index in 0..self.registry.len() {
            due.insert(index, None);
        }
        due
    }

    /// Blocks whose interval fires on global tick `tick`.
    pub fn due_on_tick(&self, tick: u64) -> DueSet {
        let mut due = DueSet::new();
        for (index, block) in self.registry.blocks().iter().enumerate() {
            if block.interval.is_due(tick) {
                due.insert(index, None);
            }
        }
        due
    }

    /// Adds every block listening on a signal in `signals` to `due`.
    pub fn add_signaled(&self, signals: SignalSet, due: &mut DueSet) {
        for signal in signals.iter() {
            for index in self.registry.blocks_for_signal(signal) {
                due.insert(index, None);
            }
        }
    }

    /// Runs every block in `due` and waits for all of them.
    ///
    /// Processes are spawned in registry order. Indices past the end of the
    /// registry are skipped.
    pub async fn run_pass(&mut self, due: &DueSet) -> PassReport {
        let runner = &self.runner;
        let runs = self
            .slots
            .iter_mut()
            .zip(self.registry.blocks())
            .enumerate()
            .filter_map(|(index, (slot, spec))| {
                let button = due.get(index)?;
                Some(async move { runner.refresh(index, spec, slot, button).await })
            });

        let mut report = PassReport::default();
        for outcome in join_all(runs).await {
            match outcome {
                RunOutcome::Updated => report.updated += 1,
                RunOutcome::Unchanged => report.unchanged += 1,
                RunOutcome::Failed => report.failed += 1,
            }
        }
        report
    }
}
