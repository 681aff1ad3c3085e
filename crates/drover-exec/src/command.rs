use std::process::Stdio;

use tokio::process::Command;
use tracing::trace;

use drover_model::{Fields, JobParams};

use crate::process::{OutputConfig, WorkerProcess, forward_stdout};
use crate::ExecError;

/// Environment variable carrying the routing key.
pub const ENV_CHANNEL: &str = "DROVER_CHANNEL";

/// Prefix for job parameters exported into the worker environment.
pub const ENV_PARAM_PREFIX: &str = "DROVER_JOB_";

/// Launch template for worker processes, taken from runner configuration.
///
/// Per-job data is layered on top at spawn time: the channel is appended
/// as `--channel <id>` and every parameter is exported as an environment
/// variable (see [`ENV_PARAM_PREFIX`]). Parameter values are passed
/// verbatim and never interpreted.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    /// Worker executable (e.g. `"drover-worker"`, `"/usr/bin/evalrun"`).
    pub program: String,
    /// Arguments always passed before the per-job ones.
    pub args: Vec<String>,
    /// Base environment for every worker; job parameters override nothing
    /// here since they live under their own prefix.
    pub env: Fields,
}

impl WorkerCommand {
    /// Create a template with no extra arguments or environment.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Fields::new(),
        }
    }

    /// Replace the fixed argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the base environment.
    pub fn with_env(mut self, env: Fields) -> Self {
        self.env = env;
        self
    }

    /// Validate the template before it is used to spawn anything.
    ///
    /// Rules:
    /// - `program` is not empty or whitespace-only.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.program.trim().is_empty() {
            return Err(ExecError::InvalidCommand("worker program is empty".into()));
        }
        Ok(())
    }
}

/// Spawns worker processes from a validated [`WorkerCommand`].
#[derive(Debug)]
pub struct WorkerLauncher {
    command: WorkerCommand,
    output: OutputConfig,
}

impl WorkerLauncher {
    /// Build a launcher; fails if the template is invalid.
    pub fn new(command: WorkerCommand) -> Result<Self, ExecError> {
        command.validate()?;
        Ok(Self {
            command,
            output: OutputConfig::default(),
        })
    }

    /// Override worker output forwarding settings.
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// The launch template this launcher was built from.
    pub fn command(&self) -> &WorkerCommand {
        &self.command
    }

    /// Spawn one worker for the given channel and parameter mapping.
    ///
    /// This only covers the fork/exec step; the process runs for as long
    /// as it needs and is observed via [`WorkerProcess::try_wait`].
    pub fn spawn(&self, channel: &str, params: &JobParams) -> Result<WorkerProcess, ExecError> {
        trace!(
            program = %self.command.program,
            args = ?self.command.args,
            channel = %channel,
            params = params.len(),
            "spawning worker",
        );

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        cmd.arg("--channel").arg(channel);

        for kv in self.command.env.iter() {
            cmd.env(kv.key(), kv.value());
        }
        cmd.env(ENV_CHANNEL, channel);
        for (key, value) in params.iter() {
            cmd.env(param_env_name(key), value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn {
            program: self.command.program.clone(),
            message: e.to_string(),
        })?;

        if let Some(stdout) = child.stdout.take() {
            forward_stdout(channel, stdout, self.output);
        }
        Ok(WorkerProcess::new(child))
    }
}

/// Environment variable name for a job parameter key.
///
/// Keys are uppercased and any character outside `[A-Za-z0-9]` becomes an
/// underscore, e.g. `config-ref` → `DROVER_JOB_CONFIG_REF`.
pub fn param_env_name(key: &str) -> String {
    let mut name = String::with_capacity(ENV_PARAM_PREFIX.len() + key.len());
    name.push_str(ENV_PARAM_PREFIX);
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_uppercase());
        } else {
            name.push('_');
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use drover_model::JobParams;

    use super::{WorkerCommand, WorkerLauncher, param_env_name};
    use crate::ExecError;

    fn sh(script: &str) -> WorkerCommand {
        WorkerCommand::new("/bin/sh").with_args(["-c", script, "--"])
    }

    async fn wait_exit(mut process: crate::WorkerProcess) -> std::process::ExitStatus {
        loop {
            if let Some(status) = process.try_wait().expect("poll") {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn empty_program_is_rejected() {
        let err = WorkerLauncher::new(WorkerCommand::new("  ")).unwrap_err();
        assert!(matches!(err, ExecError::InvalidCommand(_)));
    }

    #[test]
    fn param_env_names_are_uppercased_and_sanitized() {
        assert_eq!(param_env_name("channel"), "DROVER_JOB_CHANNEL");
        assert_eq!(param_env_name("config-ref"), "DROVER_JOB_CONFIG_REF");
        assert_eq!(param_env_name("a.b c"), "DROVER_JOB_A_B_C");
    }

    #[test]
    fn missing_program_fails_at_spawn() {
        let launcher =
            WorkerLauncher::new(WorkerCommand::new("/nonexistent/drover-worker")).unwrap();
        let err = launcher.spawn("eval-1", &JobParams::new()).unwrap_err();

        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(err.as_label(), "spawn_failed");
    }

    #[tokio::test]
    async fn successful_worker_exits_zero() {
        let launcher = WorkerLauncher::new(sh("exit 0")).unwrap();
        let process = launcher.spawn("eval-1", &JobParams::new()).unwrap();

        let status = wait_exit(process).await;
        assert!(status.success());
    }

    #[tokio::test]
    async fn failing_worker_reports_nonzero_exit() {
        let launcher = WorkerLauncher::new(sh("exit 3")).unwrap();
        let process = launcher.spawn("eval-1", &JobParams::new()).unwrap();

        let status = wait_exit(process).await;
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn channel_and_params_reach_the_worker_environment() {
        let launcher = WorkerLauncher::new(sh(
            r#"test "$DROVER_CHANNEL" = eval-1 && test "$DROVER_JOB_CONFIG" = ref"#,
        ))
        .unwrap();

        let mut params = JobParams::new();
        params.insert("config", "ref");
        let process = launcher.spawn("eval-1", &params).unwrap();

        let status = wait_exit(process).await;
        assert!(status.success(), "worker saw wrong environment");
    }
}
