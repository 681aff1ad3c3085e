use std::process::ExitStatus;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tracing::{debug, info};

use crate::ExecError;

/// Settings for worker output forwarding.
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// Max line length before truncation.
    pub max_line_length: usize,
    /// Log stdout at INFO level (false = DEBUG).
    pub stdout_info: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            stdout_info: true,
        }
    }
}

/// Exclusively-owned handle to a spawned worker process.
///
/// One OS process per handle. Completion is observed with the
/// non-blocking [`WorkerProcess::try_wait`] poll, since uniform
/// process-exit notification is not available cross-platform.
pub struct WorkerProcess {
    child: Child,
    pid: Option<u32>,
}

impl WorkerProcess {
    pub(crate) fn new(child: Child) -> Self {
        let pid = child.id();
        Self { child, pid }
    }

    /// OS process id, while the process is running.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Poll for completion without blocking.
    ///
    /// Returns `Ok(None)` while the worker is still running and the exit
    /// status once it has terminated. Polling again after an exit was
    /// observed is an error on the caller's side.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, ExecError> {
        Ok(self.child.try_wait()?)
    }
}

impl std::fmt::Debug for WorkerProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerProcess").field("pid", &self.pid).finish()
    }
}

/// Forward worker stdout into tracing, line by line, on a background task.
pub(crate) fn forward_stdout(channel: &str, stdout: ChildStdout, cfg: OutputConfig) {
    let channel = channel.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = truncate_line(line, cfg.max_line_length);
            if cfg.stdout_info {
                info!(target: "drover::worker", channel = %channel, "{line}");
            } else {
                debug!(target: "drover::worker", channel = %channel, "{line}");
            }
        }
    });
}

/// Truncate to at most `max` bytes, respecting char boundaries.
fn truncate_line(mut line: String, max: usize) -> String {
    if line.len() > max {
        let mut end = max;
        while end > 0 && !line.is_char_boundary(end) {
            end -= 1;
        }
        line.truncate(end);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{OutputConfig, truncate_line};

    #[test]
    fn default_output_config() {
        let cfg = OutputConfig::default();
        assert_eq!(cfg.max_line_length, 4096);
        assert!(cfg.stdout_info);
    }

    #[test]
    fn short_lines_pass_through() {
        assert_eq!(truncate_line("hello".into(), 10), "hello");
    }

    #[test]
    fn long_lines_are_truncated() {
        assert_eq!(truncate_line("0123456789".into(), 4), "0123");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // "é" is two bytes; cutting at byte 1 would split it.
        let out = truncate_line("é".into(), 1);
        assert!(out.is_empty());
    }
}
