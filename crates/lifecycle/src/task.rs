use std::path::PathBuf;

use modelops::{ErrorKind, ModelArtifact, ModelConfig};

/// Unit of work for the inference worker. Consumed exactly once.
#[derive(Debug, Clone)]
pub enum Task {
    Load {
        path: PathBuf,
        config: ModelConfig,
    },
    Answer {
        question: String,
    },
}

impl Task {
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Load { .. } => "load",
            Task::Answer { .. } => "answer",
        }
    }
}

/// Result of exactly one [`Task`].
#[derive(Debug, Clone)]
pub enum Outcome {
    Loaded(ModelArtifact),
    Answer {
        question: String,
        text: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}
