use modelops::ErrorKind;

use crate::{LifecycleState, Phase};

/// What the presentation side gets told, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StateChanged(LifecycleState),
    Answer {
        question: String,
        answer: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
        phase: Phase,
    },
}
