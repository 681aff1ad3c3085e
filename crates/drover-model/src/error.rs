use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
