use modelops::ErrorKind;
use thiserror::Error;

use crate::LifecycleState;

/// Why a request was refused at admission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("model is not ready (state: {0})")]
    NotReady(LifecycleState),

    #[error("lifecycle manager has been shut down")]
    ShutDown,

    #[error("inference worker is not running")]
    WorkerStopped,
}

impl RequestError {
    /// Rejections are always caller-side precondition failures.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidState
    }
}
