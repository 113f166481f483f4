use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Unloaded,
    Loading,
    Ready,
    Busy,
    Failed,
}

impl LifecycleState {
    /// Edges of the lifecycle graph.
    ///
    /// `Unloaded`/`Failed` → `Loading` on a load request, `Loading` → `Ready`
    /// or `Failed` on the load outcome, `Ready` → `Busy` on an admitted
    /// question, `Busy` → `Ready` on the answer outcome, whatever it was.
    /// `Busy` → `Failed` only when the worker is lost mid-answer.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Unloaded, Loading)
                | (Failed, Loading)
                | (Loading, Ready)
                | (Loading, Failed)
                | (Ready, Busy)
                | (Busy, Ready)
                | (Busy, Failed)
        )
    }

    pub fn is_ready(self) -> bool {
        self == LifecycleState::Ready
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Unloaded => "Unloaded",
            LifecycleState::Loading => "Loading",
            LifecycleState::Ready => "Ready",
            LifecycleState::Busy => "Busy",
            LifecycleState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Which kind of task an error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Loading,
    Answering,
}
