//! Lifecycle and dispatch for a single local inference engine.
//!
//! A [`LifecycleManager`] admits load/answer requests from the interactive
//! side, hands them one at a time to an [`InferenceWorker`] that owns the
//! [`modelops::ModelHandle`], and reports outcomes back as an ordered stream
//! of [`Notification`]s.

mod state;
mod task;
mod notification;
mod error;
mod worker;
mod manager;

pub use state::{LifecycleState, Phase};
pub use task::{Task, Outcome};
pub use notification::Notification;
pub use error::RequestError;
pub use worker::InferenceWorker;
pub use manager::LifecycleManager;
