use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{CreatePersonRequest, LoginRequest, LoginResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_person_name;
use crate::store::RoleFilter;

pub async fn list_people(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let people = state.store.list_people().api_err("Failed to list people")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(people)))
}

pub async fn get_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let person = state
        .store
        .get_person(id)
        .api_err("Failed to get person")?
        .or_not_found("Person not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(person)))
}

pub async fn create_person(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePersonRequest>,
) -> impl IntoResponse {
    let name = validate_person_name(&req.name)?;

    let person = state
        .store
        .create_person(&name)
        .api_err("Failed to create person")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(person))))
}

pub async fn delete_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_person(id)
        .api_err("Failed to delete person")?;

    if !deleted {
        return Err(ApiError::not_found("Person not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// Looks a person up by name and returns their roles in the active iteration.
/// There is no credential check.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let person = store
        .get_person_by_name(req.name.trim())
        .api_err("Failed to look up person")?
        .or_not_found("Person not found")?;

    let active_iteration = store
        .get_active_iteration()
        .api_err("Failed to get active iteration")?;

    let roles = match &active_iteration {
        Some(iteration) => store
            .list_roles(RoleFilter {
                iteration_id: Some(iteration.id),
                person_id: Some(person.id),
                ..Default::default()
            })
            .api_err("Failed to list roles")?,
        None => Vec::new(),
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(LoginResponse {
        person,
        active_iteration,
        roles,
    })))
}
