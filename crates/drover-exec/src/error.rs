use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid worker command: {0}")]
    InvalidCommand(String),

    #[error("failed to spawn worker '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("io error: {0}")]
    Io(String),
}

impl ExecError {
    /// Returns a short stable label (snake_case) for logs and fault
    /// signatures.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecError::InvalidCommand(_) => "invalid_command",
            ExecError::Spawn { .. } => "spawn_failed",
            ExecError::Io(_) => "exec_io",
        }
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}
