use crate::composer::StatusComposer;
use crate::config::EngineConfig;
use crate::publisher::{PublishError, Publisher};
use crate::registry::Registry;
use crate::runner::BlockRunner;
use crate::scheduler::{DueSet, PassReport, Scheduler};
use crate::signals::PendingSignals;
use crate::slot::SlotTable;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

/// Queued manual triggers before `run_block` starts waiting.
const TRIGGER_QUEUE: usize = 64;

/// "Run block `index` now", optionally on behalf of a mouse click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub index: usize,
    pub button: Option<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("no block at position {index} ({count} blocks configured)")]
    UnknownBlock { index: usize, count: usize },

    #[error("status engine is no longer running")]
    EngineStopped,
}

/// Cloneable handle for out-of-band "run this block now" requests.
///
/// A request for a block that is currently running does not interrupt it;
/// the block runs again on the next pass.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<RunRequest>,
    block_count: usize,
}

impl TriggerHandle {
    pub async fn run_block(&self, index: usize, button: Option<u8>) -> Result<(), TriggerError> {
        if index >= self.block_count {
            return Err(TriggerError::UnknownBlock {
                index,
                count: self.block_count,
            });
        }
        self.tx
            .send(RunRequest { index, button })
            .await
            .map_err(|_| TriggerError::EngineStopped)
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }
}

/// Why the loop woke up.
enum Wake {
    Shutdown,
    Tick,
    Signal,
    Request(RunRequest),
}

/// The status engine: owns the blocks, their slots, the composer and the
/// output surface, and drives them from a single loop.
pub struct StatusEngine<P> {
    scheduler: Scheduler,
    composer: StatusComposer,
    publisher: P,
    pending: Arc<PendingSignals>,
    requests: mpsc::Receiver<RunRequest>,
    trigger: TriggerHandle,
    published: watch::Sender<String>,
    tick: Duration,
}

impl<P> std::fmt::Debug for StatusEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusEngine")
            .field("blocks", &self.scheduler.registry().len())
            .field("delimiter", &self.composer.delimiter())
            .field("tick", &self.tick)
            .finish()
    }
}

impl<P: Publisher> StatusEngine<P> {
    pub fn new(registry: Registry, config: EngineConfig, publisher: P) -> Self {
        let (tx, requests) = mpsc::channel(TRIGGER_QUEUE);
        let trigger = TriggerHandle {
            tx,
            block_count: registry.len(),
        };
        let (published, _) = watch::channel(String::new());
        let runner = BlockRunner::new(config.block_timeout);

        Self {
            scheduler: Scheduler::new(registry, runner, config.slot_capacity),
            composer: StatusComposer::new(config.delimiter),
            publisher,
            pending: Arc::new(PendingSignals::new()),
            requests,
            trigger,
            published,
            tick: config.tick,
        }
    }

    pub fn trigger_handle(&self) -> TriggerHandle {
        self.trigger.clone()
    }

    /// The set signal listeners mark. See [`crate::signals::listen`].
    pub fn pending_signals(&self) -> Arc<PendingSignals> {
        self.pending.clone()
    }

    /// Follows the last successfully published status line.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.published.subscribe()
    }

    pub fn registry(&self) -> &Registry {
        self.scheduler.registry()
    }

    pub fn slots(&self) -> &SlotTable {
        self.scheduler.slots()
    }

    /// Runs one pass over `due`, then publishes if the status changed.
    /// Publish failures are logged and retried on the next pass.
    pub async fn refresh(&mut self, due: &DueSet) -> PassReport {
        let report = self.scheduler.run_pass(due).await;
        tracing::debug!(
            "pass finished: {} updated, {} unchanged, {} failed",
            report.updated,
            report.unchanged,
            report.failed
        );

        if let Err(e) = self.update_status().await {
            tracing::warn!("failed to publish status: {}", e);
        }
        report
    }

    /// Composes the slots and publishes the result if it differs from the
    /// last published line. Returns whether anything was published.
    pub async fn update_status(&mut self) -> Result<bool, PublishError> {
        let (status, changed) = self.composer.compose(self.scheduler.slots());
        if !changed {
            return Ok(false);
        }

        self.publisher.publish(status).await?;
        self.composer.commit();
        self.published
            .send_replace(self.composer.previous().to_string());
        Ok(true)
    }

    /// Drives the engine until `shutdown` resolves.
    ///
    /// Every block runs once up front. After that each tick runs the blocks
    /// whose interval fired plus any whose signal is pending; signals and
    /// manual triggers also wake the loop between ticks.
    ///
    /// `shutdown` also interrupts a pass in flight. The unfinished block
    /// processes are killed and nothing from that pass is published.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        // 1. Startup pass
        let all = self.scheduler.all_blocks();
        tokio::select! {
            _ = self.refresh(&all) => {}
            _ = &mut shutdown => {
                tracing::info!("status engine stopped during startup");
                return;
            }
        }

        // 2. Timed loop
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick: u64 = 0;

        tracing::info!(
            "status engine running with {} blocks",
            self.scheduler.registry().len()
        );

        loop {
            let wake = tokio::select! {
                biased;
                _ = &mut shutdown => Wake::Shutdown,
                _ = ticker.tick() => Wake::Tick,
                _ = self.pending.notified() => Wake::Signal,
                Some(request) = self.requests.recv() => Wake::Request(request),
            };

            let mut due = match wake {
                Wake::Shutdown => break,
                Wake::Tick => {
                    tick += 1;
                    self.scheduler.due_on_tick(tick)
                }
                Wake::Signal => DueSet::new(),
                Wake::Request(request) => {
                    let mut due = DueSet::new();
                    due.insert(request.index, request.button);
                    due
                }
            };

            // Coalesce whatever else queued up while we were asleep.
            while let Ok(request) = self.requests.try_recv() {
                due.insert(request.index, request.button);
            }
            let signals = self.pending.drain();
            self.scheduler.add_signaled(signals, &mut due);

            if due.is_empty() {
                continue;
            }
            tokio::select! {
                _ = self.refresh(&due) => {}
                _ = &mut shutdown => {
                    tracing::debug!("pass over {} blocks interrupted by shutdown", due.len());
                    break;
                }
            }
        }

        tracing::info!("status engine stopped");
    }
}
