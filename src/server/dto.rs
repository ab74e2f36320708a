use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{
    AnalysisGraphs, CloneSummary, Iteration, Person, PersonRole, SourceSurvey, VoxelAnalysis,
};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIterationRequest {
    pub name: String,
    #[serde(default)]
    pub question_set: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextIterationResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: CloneSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationScopeParams {
    #[serde(default)]
    pub iteration_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub iteration_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUnitRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// `null` moves the unit to the top level.
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUnitResponse {
    pub deleted_units: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreatePersonRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub person: Person,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_iteration: Option<Iteration>,
    pub roles: Vec<PersonRole>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRolesParams {
    #[serde(default)]
    pub iteration_id: Option<i64>,
    #[serde(default)]
    pub org_unit_id: Option<i64>,
    #[serde(default)]
    pub person_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub person_id: i64,
    pub org_unit_id: i64,
    #[serde(default)]
    pub is_manager: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSurveyRequest {
    pub person_role_id: i64,
    pub survey_results: Vec<f64>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub person_role_id: i64,
    pub org_unit_id: i64,
    pub iteration_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationData {
    pub survey_results: Vec<f64>,
    pub analysis_voxel: VoxelAnalysis,
    pub analysis_graphs: AnalysisGraphs,
}

#[derive(Debug, Serialize)]
pub struct CalculationResult {
    pub filename: String,
    pub data: CalculationData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub message: String,
    pub calculation_result: CalculationResult,
    pub source_files: Vec<SourceSurvey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingRequest {
    pub value: String,
    pub updated_by: String,
}
