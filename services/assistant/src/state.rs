use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lifecycle::{LifecycleManager, LifecycleState, Notification, Phase};
use modelops::ErrorKind;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

pub type SharedState = Arc<AppState>;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LifecycleManager>,
    pub view: Arc<RwLock<View>>,
}

impl AppState {
    pub fn new(manager: Arc<LifecycleManager>) -> Self {
        let view = View::new(manager.model_path());
        Self {
            manager,
            view: Arc::new(RwLock::new(view)),
        }
    }
}

/// What the UI renders. Rebuilt only from notifications.
#[derive(Clone, Debug, Serialize)]
pub struct View {
    pub state: LifecycleState,
    pub model_path: String,
    pub last_answer: Option<AnswerView>,
    pub last_error: Option<ErrorView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerView {
    pub question: String,
    pub answer: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorView {
    pub kind: ErrorKind,
    pub phase: Phase,
    pub message: String,
    pub hint: Option<String>,
    pub at: DateTime<Utc>,
}

impl View {
    pub fn new(model_path: &Path) -> Self {
        Self {
            state: LifecycleState::Unloaded,
            model_path: model_path.display().to_string(),
            last_answer: None,
            last_error: None,
        }
    }

    pub fn apply(&mut self, n: Notification) {
        match n {
            Notification::StateChanged(state) => {
                if state == LifecycleState::Loading {
                    self.last_error = None;
                }
                self.state = state;
            }
            Notification::Answer { question, answer } => {
                self.last_answer = Some(AnswerView {
                    question,
                    answer,
                    at: Utc::now(),
                });
                self.last_error = None;
            }
            Notification::Error { kind, message, phase } => {
                self.last_error = Some(ErrorView {
                    kind,
                    phase,
                    message,
                    hint: self.hint_for(kind),
                    at: Utc::now(),
                });
            }
        }
    }

    fn hint_for(&self, kind: ErrorKind) -> Option<String> {
        match kind {
            ErrorKind::NotFound => Some(format!(
                "copy the model artifact to {} and load again",
                self.model_path
            )),
            ErrorKind::LoadError => Some(
                "make sure the artifact is a valid model file and the device has enough free memory"
                    .to_string(),
            ),
            ErrorKind::InvalidState | ErrorKind::InferenceError => None,
        }
    }
}

/// Drains manager notifications into the view, in order.
pub async fn pump_notifications(
    view: Arc<RwLock<View>>,
    mut rx: mpsc::UnboundedReceiver<Notification>,
) {
    while let Some(n) = rx.recv().await {
        debug!(notification = ?n, "view: applying");
        view.write().await.apply(n);
    }
}
