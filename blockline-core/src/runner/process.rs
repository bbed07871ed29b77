use std::io;
use std::process::{Output, Stdio};
use tokio::process::{Child, Command};

use super::BUTTON_ENV;

/// Owns one spawned block command.
///
/// The shell runs as the leader of its own process group. Dropping the
/// handle before `finish` completes (error, timeout, cancelled pass) kills
/// the whole group, so pipelines and background jobs go down with it.
pub(super) struct BlockProcess {
    child: Child,
    group: ProcessGroup,
}

impl BlockProcess {
    pub(super) fn spawn(command: &str, button: Option<u8>) -> io::Result<Self> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(button) = button {
            cmd.env(BUTTON_ENV, button.to_string());
        }

        let child = cmd.spawn()?;
        let group = ProcessGroup::new(child.id());
        Ok(Self { child, group })
    }

    pub(super) async fn finish(self) -> io::Result<Output> {
        let Self { child, mut group } = self;
        let output = child.wait_with_output().await;
        // The group is gone or about to be; its id may be reused.
        group.disarm();
        output
    }
}

/// Kills a process group on drop unless disarmed.
struct ProcessGroup {
    leader: Option<u32>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self { leader }
    }

    fn disarm(&mut self) {
        self.leader = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(leader) = self.leader.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // SAFETY: killpg only sends a signal. A group that already
            // exited makes it fail with ESRCH, which is fine.
            let rc = unsafe { libc::killpg(leader as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                tracing::trace!(
                    "killpg({}) failed: {}",
                    leader,
                    io::Error::last_os_error()
                );
            }
        }
        #[cfg(not(unix))]
        let _ = leader;
    }
}
