use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SettingKey, SurveyType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    pub id: i64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub question_set: String,
}

impl Iteration {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUnit {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub iteration_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRole {
    pub id: i64,
    pub person_id: i64,
    pub org_unit_id: i64,
    pub is_manager: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub iteration_id: i64,
}

/// Mean and mode of one survey dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionStats {
    pub mean: f64,
    pub mode: f64,
}

/// Dimension means clamped to the 1..=8 answer scale and rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelPoint {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoxelAnalysis {
    pub knowledge: DimensionStats,
    pub familiarity: DimensionStats,
    pub cognitive_load: DimensionStats,
    pub voxel: VoxelPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisGraphs {
    pub knowledge: Vec<DensityPoint>,
    pub familiarity: Vec<DensityPoint>,
    pub cognitive_load: Vec<DensityPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: i64,
    pub person_role_id: Option<i64>,
    pub org_unit_id: Option<i64>,
    pub survey_type: SurveyType,
    pub filename: String,
    pub survey_results: Vec<f64>,
    pub analysis_voxel: VoxelAnalysis,
    pub analysis_graphs: AnalysisGraphs,
    pub iteration_id: i64,
}

/// A survey ready to be written; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewSurvey {
    pub person_role_id: Option<i64>,
    pub org_unit_id: Option<i64>,
    pub survey_type: SurveyType,
    pub filename: String,
    pub survey_results: Vec<f64>,
    pub analysis_voxel: VoxelAnalysis,
    pub analysis_graphs: AnalysisGraphs,
    pub iteration_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSetting {
    pub key: SettingKey,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of cloning the most recently closed iteration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneSummary {
    pub iteration: Iteration,
    pub cloned_from: i64,
    pub units_cloned: usize,
    pub roles_cloned: usize,
}

/// An individual survey that contributed to a calculation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSurvey {
    pub filename: String,
    pub analysis_voxel: VoxelAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    pub survey: Survey,
    pub sources: Vec<SourceSurvey>,
}
