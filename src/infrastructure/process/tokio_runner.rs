//! `CommandRunner` over `tokio::process`
//!
//! Each child runs in its own process group so a timeout can take down
//! everything it spawned, not just the direct child.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::ports::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let pid = child.id();
        debug!(program = %spec.program, pid, "Spawned handler process");
        // kill_on_drop only reaches the direct child; the guard takes the
        // whole group down if this future is cancelled mid-wait
        let mut group = ProcessGroupGuard::new(pid);

        if let (Some(input), Some(mut stdin)) = (spec.stdin, child.stdin.take()) {
            // Written concurrently with the output reads; a child that never
            // reads stdin must not stall on a full pipe
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %e, "Handler process closed stdin early");
                }
            });
        }

        match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
            Ok(output) => {
                group.disarm();
                let output = output?;
                Ok(CommandOutput {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Err(_) => {
                drop(group);
                Err(CommandError::TimedOut {
                    timeout_ms: u64::try_from(spec.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

/// Kills the child's process group on drop unless disarmed
struct ProcessGroupGuard {
    pid: Option<u32>,
}

impl ProcessGroupGuard {
    const fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    /// The leader was reaped; its pid may be reused from here on
    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        kill_process_group(self.pid.take());
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => debug!(pgid = pid, "Killed handler process group"),
        Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
