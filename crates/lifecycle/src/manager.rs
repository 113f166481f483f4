use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modelops::{EngineLoader, ErrorKind, ModelConfig};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{InferenceWorker, LifecycleState, Notification, Outcome, Phase, RequestError, Task};

// One pending or in-flight task, never more.
const QUEUE_DEPTH: usize = 1;

struct Inner {
    state: LifecycleState,
    tasks: Option<mpsc::Sender<Task>>, // None once shut down
    notify: mpsc::UnboundedSender<Notification>,
}

impl Inner {
    fn emit(&self, n: Notification) {
        if self.notify.send(n).is_err() {
            debug!("lifecycle: notification receiver dropped");
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "lifecycle: unexpected transition");
        }
        info!(from = %self.state, to = %next, "lifecycle: state changed");
        self.state = next;
        self.emit(Notification::StateChanged(next));
    }

    fn enqueue(&self, task: Task) -> Result<(), RequestError> {
        let tx = self.tasks.as_ref().ok_or(RequestError::ShutDown)?;
        tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => RequestError::NotReady(self.state),
            TrySendError::Closed(_) => RequestError::WorkerStopped,
        })
    }

    /// Every refused request is also reported on the notification stream.
    fn reject(&self, err: RequestError, phase: Phase) -> RequestError {
        info!(state = %self.state, "lifecycle: request rejected: {err}");
        self.emit(Notification::Error {
            kind: err.kind(),
            message: err.to_string(),
            phase,
        });
        err
    }

    fn admit_load(&mut self, path: &Path, config: ModelConfig) -> Result<(), RequestError> {
        if self.tasks.is_none() {
            return Err(self.reject(RequestError::ShutDown, Phase::Loading));
        }

        match self.state {
            LifecycleState::Loading | LifecycleState::Ready | LifecycleState::Busy => {
                debug!(state = %self.state, "lifecycle: load request ignored");
                return Ok(());
            }
            LifecycleState::Unloaded | LifecycleState::Failed => {}
        }

        let task = Task::Load {
            path: path.to_path_buf(),
            config,
        };
        if let Err(e) = self.enqueue(task) {
            return Err(self.reject(e, Phase::Loading));
        }
        info!(path = %path.display(), "lifecycle: load enqueued");
        self.transition(LifecycleState::Loading);
        Ok(())
    }

    fn admit_answer(&mut self, question: String) -> Result<(), RequestError> {
        if self.tasks.is_none() {
            return Err(self.reject(RequestError::ShutDown, Phase::Answering));
        }
        if !self.state.is_ready() {
            return Err(self.reject(RequestError::NotReady(self.state), Phase::Answering));
        }

        if let Err(e) = self.enqueue(Task::Answer { question }) {
            return Err(self.reject(e, Phase::Answering));
        }
        self.transition(LifecycleState::Busy);
        Ok(())
    }

    /// The outcome stream ended. Anything still in flight will never report.
    fn worker_gone(&mut self) {
        let (kind, phase) = match self.state {
            LifecycleState::Loading => (ErrorKind::LoadError, Phase::Loading),
            LifecycleState::Busy => (ErrorKind::InferenceError, Phase::Answering),
            LifecycleState::Unloaded | LifecycleState::Ready | LifecycleState::Failed => return,
        };
        error!(state = %self.state, "lifecycle: inference worker stopped with a task in flight");
        self.emit(Notification::Error {
            kind,
            message: "inference worker stopped before reporting an outcome".to_string(),
            phase,
        });
        self.transition(LifecycleState::Failed);
    }

    fn apply(&mut self, outcome: Outcome) {
        use LifecycleState::*;

        match (self.state, outcome) {
            (Loading, Outcome::Loaded(artifact)) => {
                info!(
                    path = %artifact.path.display(),
                    model = %artifact.model_id(),
                    "lifecycle: model loaded"
                );
                self.transition(Ready);
            }
            (Loading, Outcome::Error { kind, message }) => {
                error!(%kind, "lifecycle: model load failed: {message}");
                self.emit(Notification::Error {
                    kind,
                    message,
                    phase: Phase::Loading,
                });
                self.transition(Failed);
            }
            (Busy, Outcome::Answer { question, text }) => {
                self.emit(Notification::Answer {
                    question,
                    answer: text,
                });
                self.transition(Ready);
            }
            (Busy, Outcome::Error { kind, message }) => {
                warn!(%kind, "lifecycle: answer failed: {message}");
                self.emit(Notification::Error {
                    kind,
                    message,
                    phase: Phase::Answering,
                });
                self.transition(Ready);
            }
            (state, outcome) => {
                warn!(%state, ?outcome, "lifecycle: outcome does not match state, dropped");
            }
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of the lifecycle state machine.
///
/// `request_load` and `request_answer` never wait on the worker: they either
/// enqueue a task or reject immediately. Outcomes are applied by a dispatcher
/// task and surface as [`Notification`]s on the receiver returned by
/// [`LifecycleManager::start`], in the order the tasks were admitted.
pub struct LifecycleManager {
    path: PathBuf,
    config: ModelConfig,
    inner: Arc<Mutex<Inner>>,
    active: Arc<AtomicUsize>,
    tasks_running: tokio::sync::Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl LifecycleManager {
    /// Spawns the worker and the outcome dispatcher. Needs a tokio runtime.
    pub fn start(
        path: impl Into<PathBuf>,
        config: ModelConfig,
        loader: Arc<dyn EngineLoader>,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (task_tx, task_rx) = mpsc::channel(QUEUE_DEPTH);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Mutex::new(Inner {
            state: LifecycleState::Unloaded,
            tasks: Some(task_tx),
            notify: notify_tx,
        }));

        let worker = InferenceWorker::new(loader, task_rx, outcome_tx);
        let active = worker.active_gauge();
        let worker = worker.spawn();
        let dispatcher = tokio::spawn(dispatch(inner.clone(), outcome_rx));

        let manager = Self {
            path: path.into(),
            config,
            inner,
            active,
            tasks_running: tokio::sync::Mutex::new(Some((worker, dispatcher))),
        };
        (manager, notify_rx)
    }

    /// Starts a load unless one is running or done. Re-enters `Loading` from
    /// `Failed`.
    pub fn request_load(&self) -> Result<(), RequestError> {
        lock(&self.inner).admit_load(&self.path, self.config)
    }

    /// Admits a question only while `Ready`. Anything else is rejected with
    /// an `InvalidState` error notification and nothing is enqueued.
    pub fn request_answer(&self, question: impl Into<String>) -> Result<(), RequestError> {
        lock(&self.inner).admit_answer(question.into())
    }

    /// Closes the queue, lets the current task finish, and waits for the
    /// worker to release the model. Safe to call more than once.
    pub async fn shutdown(&self) {
        let was_open = lock(&self.inner).tasks.take().is_some();
        if was_open {
            info!("lifecycle: shutting down");
        }

        let mut running = self.tasks_running.lock().await;
        if let Some((worker, dispatcher)) = running.take() {
            if let Err(e) = worker.await {
                error!("lifecycle: inference worker ended abnormally: {e}");
            }
            if let Err(e) = dispatcher.await {
                error!("lifecycle: dispatcher ended abnormally: {e}");
            }
            info!("lifecycle: shut down");
        }
    }

    pub fn state(&self) -> LifecycleState {
        lock(&self.inner).state
    }

    pub fn is_shut_down(&self) -> bool {
        lock(&self.inner).tasks.is_none()
    }

    /// Tasks executing inside the worker right now.
    pub fn active_tasks(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn model_path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        // Dropping the sender lets the worker drain, close the model and exit.
        lock(&self.inner).tasks.take();
    }
}

async fn dispatch(inner: Arc<Mutex<Inner>>, mut outcomes: mpsc::UnboundedReceiver<Outcome>) {
    while let Some(outcome) = outcomes.recv().await {
        lock(&inner).apply(outcome);
    }
    lock(&inner).worker_gone();
    debug!("lifecycle: dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(state: LifecycleState) -> (Inner, mpsc::Receiver<Task>, mpsc::UnboundedReceiver<Notification>) {
        let (task_tx, task_rx) = mpsc::channel(QUEUE_DEPTH);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let inner = Inner {
            state,
            tasks: Some(task_tx),
            notify: notify_tx,
        };
        (inner, task_rx, notify_rx)
    }

    fn expect_rejection(rx: &mut mpsc::UnboundedReceiver<Notification>, phase: Phase) {
        match rx.try_recv() {
            Ok(Notification::Error { kind, phase: p, .. }) => {
                assert_eq!(kind, ErrorKind::InvalidState);
                assert_eq!(p, phase);
            }
            other => panic!("expected rejection notice, got {other:?}"),
        }
    }

    #[test]
    fn test_stopped_worker_rejects_and_notifies() {
        let (mut inner, task_rx, mut rx) = inner(LifecycleState::Unloaded);
        drop(task_rx);

        let err = inner.admit_load(Path::new("model.task"), ModelConfig::default());
        assert_eq!(err, Err(RequestError::WorkerStopped));
        expect_rejection(&mut rx, Phase::Loading);
        assert_eq!(inner.state, LifecycleState::Unloaded);

        inner.state = LifecycleState::Ready;
        let err = inner.admit_answer("q".into());
        assert_eq!(err, Err(RequestError::WorkerStopped));
        expect_rejection(&mut rx, Phase::Answering);
        assert_eq!(inner.state, LifecycleState::Ready);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_shut_down_rejects_and_notifies() {
        let (mut inner, _task_rx, mut rx) = inner(LifecycleState::Ready);
        inner.tasks = None;

        assert_eq!(inner.admit_answer("q".into()), Err(RequestError::ShutDown));
        expect_rejection(&mut rx, Phase::Answering);
        assert_eq!(
            inner.admit_load(Path::new("model.task"), ModelConfig::default()),
            Err(RequestError::ShutDown)
        );
        expect_rejection(&mut rx, Phase::Loading);
    }

    #[test]
    fn test_worker_gone_while_busy_fails() {
        let (mut inner, _task_rx, mut rx) = inner(LifecycleState::Busy);
        inner.worker_gone();

        match rx.try_recv() {
            Ok(Notification::Error { kind, phase, .. }) => {
                assert_eq!(kind, ErrorKind::InferenceError);
                assert_eq!(phase, Phase::Answering);
            }
            other => panic!("unexpected notification: {other:?}"),
        }
        assert_eq!(rx.try_recv().ok(), Some(Notification::StateChanged(LifecycleState::Failed)));
        assert_eq!(inner.state, LifecycleState::Failed);
    }

    #[test]
    fn test_worker_gone_while_idle_is_quiet() {
        let (mut inner, _task_rx, mut rx) = inner(LifecycleState::Ready);
        inner.worker_gone();
        assert!(rx.try_recv().is_err());
        assert_eq!(inner.state, LifecycleState::Ready);
    }
}
