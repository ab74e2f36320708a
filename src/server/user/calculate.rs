use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::server::AppState;
use crate::server::dto::{CalculateRequest, CalculateResponse, CalculationData, CalculationResult};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::CalculationRequest;

/// Rolls up every individual survey in the unit's subtree into the unit's
/// calculated survey. Only manager roles may trigger it.
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalculateRequest>,
) -> impl IntoResponse {
    let calculation = state
        .store
        .calculate_unit_survey(CalculationRequest {
            person_role_id: req.person_role_id,
            org_unit_id: req.org_unit_id,
            iteration_id: req.iteration_id,
        })
        .api_err("Failed to calculate unit survey")?;

    let survey = calculation.survey;
    let response = CalculateResponse {
        message: format!(
            "Calculation completed from {} survey(s)",
            calculation.sources.len()
        ),
        calculation_result: CalculationResult {
            filename: survey.filename,
            data: CalculationData {
                survey_results: survey.survey_results,
                analysis_voxel: survey.analysis_voxel,
                analysis_graphs: survey.analysis_graphs,
            },
        },
        source_files: calculation.sources,
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}
