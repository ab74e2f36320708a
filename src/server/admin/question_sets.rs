use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{QUESTION_SETS, is_allowed_question_set};

pub async fn list_question_sets() -> impl IntoResponse {
    Json(ApiResponse::success(QUESTION_SETS))
}

/// Serves one of the allow-listed question-set files. Any other name is refused
/// before the filesystem is touched.
pub async fn get_question_set(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if !is_allowed_question_set(&name) {
        return Err(ApiError::forbidden("Question set not allowed"));
    }

    let path = state.question_sets_dir.join(&name);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ApiError::not_found("Question set not found"));
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {e}", path.display());
            return Err(ApiError::internal("Failed to read question set"));
        }
    };

    let questions: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        tracing::error!("Invalid JSON in {}: {e}", path.display());
        ApiError::internal("Question set is not valid JSON")
    })?;

    Ok::<_, ApiError>(Json(ApiResponse::success(questions)))
}
