use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use modelops::{EngineLoader, ErrorKind, ModelError, ModelHandle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{Outcome, Task};

/// Single execution context that owns the model handle.
///
/// Tasks are taken one at a time; each produces exactly one [`Outcome`]
/// before the next is dequeued. When the task queue closes the handle is
/// released and the worker exits.
pub struct InferenceWorker {
    loader: Arc<dyn EngineLoader>,
    handle: Option<ModelHandle>,
    tasks: mpsc::Receiver<Task>,
    outcomes: mpsc::UnboundedSender<Outcome>,
    active: Arc<AtomicUsize>,
}

impl InferenceWorker {
    pub fn new(
        loader: Arc<dyn EngineLoader>,
        tasks: mpsc::Receiver<Task>,
        outcomes: mpsc::UnboundedSender<Outcome>,
    ) -> Self {
        Self {
            loader,
            handle: None,
            tasks,
            outcomes,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Gauge of tasks currently executing. Never above one.
    pub fn active_gauge(&self) -> Arc<AtomicUsize> {
        self.active.clone()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(engine = %self.loader.info().name, "inference worker: started");

        while let Some(task) = self.tasks.recv().await {
            let kind = task.kind();
            let started = Instant::now();
            debug!(task = kind, "inference worker: task dequeued");

            self.active.fetch_add(1, Ordering::SeqCst);
            let outcome = match AssertUnwindSafe(self.execute(task)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(task = kind, "inference worker: engine panicked: {message}");
                    Outcome::Error {
                        kind: if kind == "load" {
                            ErrorKind::LoadError
                        } else {
                            ErrorKind::InferenceError
                        },
                        message: format!("engine panicked: {message}"),
                    }
                }
            };
            self.active.fetch_sub(1, Ordering::SeqCst);

            info!(
                task = kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = !matches!(outcome, Outcome::Error { .. }),
                "inference worker: task finished"
            );

            if self.outcomes.send(outcome).is_err() {
                warn!("inference worker: outcome receiver gone, stopping");
                break;
            }
        }

        self.release();
        info!("inference worker: stopped");
    }

    async fn execute(&mut self, task: Task) -> Outcome {
        match task {
            Task::Load { path, config } => {
                // at most one handle alive
                self.release();

                match ModelHandle::open(path, config, self.loader.as_ref()).await {
                    Ok(handle) => {
                        let artifact = handle.artifact().cloned();
                        self.handle = Some(handle);
                        match artifact {
                            Some(a) => Outcome::Loaded(a),
                            None => Outcome::Error {
                                kind: ErrorKind::LoadError,
                                message: "handle opened without artifact metadata".into(),
                            },
                        }
                    }
                    Err(e) => error_outcome(e),
                }
            }
            Task::Answer { question } => {
                let Some(handle) = self.handle.as_mut() else {
                    return error_outcome(ModelError::InvalidState("no model loaded".into()));
                };
                match handle.generate(&question).await {
                    Ok(text) => Outcome::Answer { question, text },
                    Err(e) => error_outcome(e),
                }
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
            info!(path = %handle.path().display(), "inference worker: model released");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn error_outcome(e: ModelError) -> Outcome {
    Outcome::Error {
        kind: e.kind(),
        message: e.to_string(),
    }
}
