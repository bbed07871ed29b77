//! Pending-signal set.
//!
//! Signal listeners run as their own tasks and may fire at any time, including
//! in the middle of a scheduling pass. They only ever set bits; the engine
//! loop is the single consumer that reads and clears the whole set at once.
//! A signal that arrives twice before it is serviced collapses into one run.

use crate::registry::{MAX_SIGNAL, Registry};

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct PendingSignals {
    bits: AtomicU64,
    wake: Notify,
}

impl PendingSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `signal` pending and wakes the engine loop.
    ///
    /// Indices outside `[1, MAX_SIGNAL]` are ignored and return `false`.
    pub fn mark(&self, signal: u8) -> bool {
        if !(1..=MAX_SIGNAL).contains(&signal) {
            tracing::warn!("ignoring out-of-range signal index {}", signal);
            return false;
        }
        self.bits.fetch_or(1u64 << signal, Ordering::AcqRel);
        // notify_one stores a permit when nobody is waiting yet.
        self.wake.notify_one();
        true
    }

    /// Takes every pending index and clears the set.
    pub fn drain(&self) -> SignalSet {
        SignalSet(self.bits.swap(0, Ordering::AcqRel))
    }

    /// Resolves after the next [`mark`](Self::mark), or immediately if a mark
    /// happened since the last wake-up.
    pub async fn notified(&self) {
        self.wake.notified().await
    }
}

/// A drained snapshot of pending signal indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalSet(u64);

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, signal: u8) -> bool {
        signal <= MAX_SIGNAL && self.0 & (1u64 << signal) != 0
    }

    /// Pending indices, ascending.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=MAX_SIGNAL).filter(move |&s| self.contains(s))
    }
}

/// OS signal number for block signal index `signal`.
#[cfg(target_os = "linux")]
pub fn os_signal(signal: u8) -> Option<i32> {
    let raw = libc::SIGRTMIN() + i32::from(signal);
    (raw <= libc::SIGRTMAX()).then_some(raw)
}

#[cfg(not(target_os = "linux"))]
pub fn os_signal(_signal: u8) -> Option<i32> {
    None
}

/// Installs one listener task per distinct signal index in `registry`.
///
/// Each delivery of `SIGRTMIN + k` marks `k` in `pending`. The tasks run until
/// the runtime shuts down.
#[cfg(unix)]
pub fn listen(registry: &Registry, pending: Arc<PendingSignals>) -> io::Result<Vec<JoinHandle<()>>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut handles = Vec::new();
    for index in registry.signals() {
        let raw = os_signal(index).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                format!("no real-time signal available for index {}", index),
            )
        })?;
        let mut stream = signal(SignalKind::from_raw(raw))?;
        let pending = pending.clone();
        tracing::debug!("listening for signal {} (index {})", raw, index);

        handles.push(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                pending.mark(index);
            }
        }));
    }
    Ok(handles)
}
