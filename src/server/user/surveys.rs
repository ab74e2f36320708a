use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{IterationScopeParams, SubmitSurveyRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_filename;

use super::access::resolve_iteration_id;

/// Stores or replaces the individual survey for a role in the active iteration.
pub async fn submit_survey(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitSurveyRequest>,
) -> impl IntoResponse {
    let filename = validate_filename(req.filename.as_deref())?;

    let survey = state
        .store
        .submit_survey(req.person_role_id, filename.as_deref(), &req.survey_results)
        .api_err("Failed to submit survey")?;

    tracing::debug!(
        survey_id = survey.id,
        person_role_id = req.person_role_id,
        "Survey submitted"
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(survey)))
}

pub async fn list_surveys(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IterationScopeParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let iteration_id = resolve_iteration_id(store, params.iteration_id)?;

    let surveys = store
        .list_surveys(iteration_id)
        .api_err("Failed to list surveys")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(surveys)))
}

pub async fn get_role_survey(
    State(state): State<Arc<AppState>>,
    Path(person_role_id): Path<i64>,
) -> impl IntoResponse {
    let survey = state
        .store
        .get_individual_survey(person_role_id)
        .api_err("Failed to get survey")?
        .or_not_found("Survey not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(survey)))
}

pub async fn get_unit_survey(
    State(state): State<Arc<AppState>>,
    Path(org_unit_id): Path<i64>,
) -> impl IntoResponse {
    let survey = state
        .store
        .get_calculated_survey(org_unit_id)
        .api_err("Failed to get survey")?
        .or_not_found("Calculated survey not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(survey)))
}
