//! Block runner.
//!
//! Executes one block command as a child process and captures its standard
//! output. A failing block never propagates past [`BlockRunner::refresh`]:
//! the slot keeps whatever the last successful run left there.

mod process;

use crate::registry::BlockSpec;
use crate::slot::Slot;

use process::BlockProcess;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Environment variable carrying the clicked mouse button.
pub const BUTTON_ENV: &str = "BLOCK_BUTTON";

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read output of `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: ExitStatus },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// What a single refresh did to its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The command succeeded and the slot now holds different text.
    Updated,
    /// The command succeeded with the same text as before.
    Unchanged,
    /// The command failed; the slot was not touched.
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct BlockRunner {
    timeout: Option<Duration>,
}

impl BlockRunner {
    /// `timeout` bounds a single run. `None` waits for the command forever.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Runs `spec` and returns the text its slot should hold.
    ///
    /// `button` is exported to the command as [`BUTTON_ENV`] when the run
    /// was caused by a click.
    pub async fn run(&self, spec: &BlockSpec, button: Option<u8>) -> Result<String, BlockError> {
        let process = BlockProcess::spawn(&spec.command, button).map_err(|source| {
            BlockError::Spawn {
                command: spec.command.clone(),
                source,
            }
        })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, process.finish())
                .await
                .map_err(|_| BlockError::Timeout {
                    command: spec.command.clone(),
                    timeout: limit,
                })?,
            None => process.finish().await,
        }
        .map_err(|source| BlockError::Io {
            command: spec.command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(BlockError::Exit {
                command: spec.command.clone(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(render(&spec.icon, &stdout))
    }

    /// Runs `spec` and stores the result into `slot`. On failure the slot
    /// keeps its previous content.
    pub async fn refresh(
        &self,
        index: usize,
        spec: &BlockSpec,
        slot: &mut Slot,
        button: Option<u8>,
    ) -> RunOutcome {
        match self.run(spec, button).await {
            Ok(text) => {
                if slot.holds(&text) {
                    return RunOutcome::Unchanged;
                }
                if slot.store(&text) {
                    tracing::debug!(
                        "block {} output truncated to {} bytes",
                        index,
                        slot.capacity()
                    );
                }
                RunOutcome::Updated
            }
            Err(e) => {
                tracing::debug!("block {} failed, keeping stale output: {}", index, e);
                RunOutcome::Failed
            }
        }
    }
}

/// Strips one trailing newline and prepends the icon. Empty output stays
/// empty so an idle block takes no room in the status line.
pub fn render(icon: &str, stdout: &str) -> String {
    let text = stdout.strip_suffix('\n').unwrap_or(stdout);
    if text.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(icon.len() + text.len());
    out.push_str(icon);
    out.push_str(text);
    out
}
