use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse error classification shared by the handle, the worker and callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    LoadError,
    InvalidState,
    InferenceError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::LoadError => "LoadError",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::InferenceError => "InferenceError",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("model load failed: {0}")]
    Load(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::NotFound(_) => ErrorKind::NotFound,
            ModelError::Load(_) => ErrorKind::LoadError,
            ModelError::InvalidState(_) => ErrorKind::InvalidState,
            ModelError::Inference(_) => ErrorKind::InferenceError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
