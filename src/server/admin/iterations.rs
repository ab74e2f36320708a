use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{CreateIterationRequest, NextIterationResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{resolve_question_set, validate_iteration_name};
use crate::types::default_question_set;

pub async fn list_iterations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let iterations = state
        .store
        .list_iterations()
        .api_err("Failed to list iterations")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(iterations)))
}

pub async fn get_iteration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let iteration = state
        .store
        .get_iteration(id)
        .api_err("Failed to get iteration")?
        .or_not_found("Iteration not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(iteration)))
}

pub async fn get_active_iteration(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let iteration = state
        .store
        .get_active_iteration()
        .api_err("Failed to get active iteration")?
        .or_not_found("No active iteration")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(iteration)))
}

pub async fn create_iteration(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIterationRequest>,
) -> impl IntoResponse {
    let name = validate_iteration_name(&req.name)?;
    let question_set = resolve_question_set(req.question_set.as_deref())?
        .unwrap_or(default_question_set());

    let iteration = state
        .store
        .create_iteration(&name, question_set)
        .api_err("Failed to create iteration")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(iteration))))
}

pub async fn create_next_iteration(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIterationRequest>,
) -> impl IntoResponse {
    let name = validate_iteration_name(&req.name)?;
    let question_set = resolve_question_set(req.question_set.as_deref())?;

    let summary = state
        .store
        .create_next_iteration(&name, question_set)
        .api_err("Failed to create iteration")?;

    let response = NextIterationResponse {
        message: format!(
            "Created iteration '{}' with {} units and {} roles from iteration {}",
            summary.iteration.name, summary.units_cloned, summary.roles_cloned, summary.cloned_from
        ),
        summary,
    };

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn close_iteration(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let iteration = state
        .store
        .close_iteration()
        .api_err("Failed to close iteration")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(iteration)))
}

/// Deletes the iteration and every later one.
pub async fn delete_iteration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    state
        .store
        .delete_iterations_from(id)
        .api_err("Failed to delete iteration")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
