use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{CreateRoleRequest, ListRolesParams, UpdateRoleRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_description;
use crate::store::RoleFilter;

use super::access::resolve_iteration_id;

pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRolesParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let iteration_id = resolve_iteration_id(store, params.iteration_id)?;

    let roles = store
        .list_roles(RoleFilter {
            iteration_id: Some(iteration_id),
            org_unit_id: params.org_unit_id,
            person_id: params.person_id,
        })
        .api_err("Failed to list roles")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(roles)))
}

pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let role = state
        .store
        .get_role(id)
        .api_err("Failed to get role")?
        .or_not_found("Person role not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(role)))
}

/// Assigns a person to a unit. The role belongs to the unit's iteration.
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> impl IntoResponse {
    let description = req.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
    validate_description(description)?;

    let role = state
        .store
        .create_role(req.person_id, req.org_unit_id, req.is_manager, description)
        .api_err("Failed to create role")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(role))))
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let description = req.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
    validate_description(description)?;

    store
        .update_role_description(id, description)
        .api_err("Failed to update role")?;

    let role = store
        .get_role(id)
        .api_err("Failed to get role")?
        .or_not_found("Person role not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(role)))
}

/// Removes the role and its individual survey.
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_role(id)
        .api_err("Failed to delete role")?;

    if !deleted {
        return Err(ApiError::not_found("Person role not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
