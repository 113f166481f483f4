use axum::{extract::State, http::StatusCode, Json};

pub async fn get_runtime(State(state): State<crate::state::SharedState>) -> Json<serde_json::Value> {
    let view = state.view.read().await.clone();
    let config = state.manager.config();

    Json(serde_json::json!({
        "state": view.state,
        "model_path": view.model_path,
        "max_tokens": config.max_tokens,
        "top_k": config.top_k,
        "last_answer": view.last_answer,
        "last_error": view.last_error,
    }))
}

pub async fn post_load(
    State(state): State<crate::state::SharedState>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .manager
        .request_load()
        .map_err(|e| (StatusCode::CONFLICT, e.to_string()))?;
    Ok(StatusCode::ACCEPTED)
}
