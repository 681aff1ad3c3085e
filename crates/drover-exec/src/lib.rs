//! Worker process execution for the drover runner.
//!
//! Translates a configured launch template plus per-job parameters into a
//! spawned OS process via `tokio::process::Command`. The runner owns the
//! returned [`WorkerProcess`] exclusively and polls it for completion;
//! there is deliberately no kill or timeout surface here, since draining
//! never preempts in-flight workers.
mod error;
pub use error::ExecError;

mod command;
pub use command::{WorkerCommand, WorkerLauncher};

mod process;
pub use process::{OutputConfig, WorkerProcess};
