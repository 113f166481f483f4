use axum::{extract::State, http::StatusCode, Json};
use lifecycle::{LifecycleState, RequestError};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct AskReq {
    pub question: String,
}

pub async fn ask(
    State(state): State<crate::state::SharedState>,
    Json(req): Json<AskReq>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    // 1) Non-empty question, checked here and not in the core
    let question = req.question.trim();
    if question.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Please enter a question".to_string()));
    }

    // 2) Admit; the answer arrives later through GET /runtime
    state
        .manager
        .request_answer(question)
        .map_err(|e| rejection(&e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": question })),
    ))
}

fn rejection(e: &RequestError) -> (StatusCode, String) {
    match e {
        RequestError::NotReady(LifecycleState::Unloaded | LifecycleState::Loading) => {
            (StatusCode::CONFLICT, "Model is still loading...".to_string())
        }
        RequestError::NotReady(LifecycleState::Busy) => (
            StatusCode::CONFLICT,
            "Still answering the previous question".to_string(),
        ),
        RequestError::NotReady(LifecycleState::Failed) => (
            StatusCode::CONFLICT,
            "Model failed to load, request a reload first".to_string(),
        ),
        RequestError::NotReady(LifecycleState::Ready)
        | RequestError::ShutDown
        | RequestError::WorkerStopped => (StatusCode::CONFLICT, e.to_string()),
    }
}
