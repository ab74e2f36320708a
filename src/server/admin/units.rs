use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{
    CreateUnitRequest, DeleteUnitResponse, IterationScopeParams, UpdateUnitRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::user::access::resolve_iteration_id;
use crate::server::validation::validate_unit_name;

pub async fn list_units(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IterationScopeParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let iteration_id = resolve_iteration_id(store, params.iteration_id)?;

    let units = store
        .list_units(iteration_id)
        .api_err("Failed to list units")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(units)))
}

pub async fn get_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let unit = state
        .store
        .get_unit(id)
        .api_err("Failed to get unit")?
        .or_not_found("Organization unit not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(unit)))
}

pub async fn list_subordinates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let units = state
        .store
        .list_subordinate_units(id)
        .api_err("Failed to list subordinate units")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(units)))
}

pub async fn create_unit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUnitRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let name = validate_unit_name(&req.name)?;
    let iteration_id = resolve_iteration_id(store, req.iteration_id)?;

    let unit = store
        .create_unit(&name, req.parent_id, iteration_id)
        .api_err("Failed to create unit")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(unit))))
}

pub async fn update_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUnitRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    if req.name.is_none() && req.parent_id.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let name = req.name.as_deref().map(validate_unit_name).transpose()?;

    let unit = store
        .update_unit(id, name.as_deref(), req.parent_id)
        .api_err("Failed to update unit")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(unit)))
}

/// Deletes the unit together with every subordinate unit, role and survey.
pub async fn delete_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted_units = state
        .store
        .delete_unit(id)
        .api_err("Failed to delete unit")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(DeleteUnitResponse {
        deleted_units,
    })))
}
