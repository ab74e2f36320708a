use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::UpdateSettingRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::SettingKey;

const MAX_SETTING_LEN: usize = 10_000;

fn parse_key(key: &str) -> Result<SettingKey, ApiError> {
    SettingKey::parse(key).ok_or_else(|| ApiError::not_found("Unknown setting"))
}

pub async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let key = parse_key(&key)?;

    let setting = state
        .store
        .get_setting(key)
        .api_err("Failed to get setting")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(setting)))
}

pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<UpdateSettingRequest>,
) -> impl IntoResponse {
    let key = parse_key(&key)?;

    if req.updated_by.trim().is_empty() {
        return Err(ApiError::bad_request("updatedBy is required"));
    }
    if req.value.chars().count() > MAX_SETTING_LEN {
        return Err(ApiError::bad_request(format!(
            "Setting value cannot exceed {MAX_SETTING_LEN} characters"
        )));
    }

    let setting = state
        .store
        .set_setting(key, &req.value, req.updated_by.trim())
        .api_err("Failed to update setting")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(setting)))
}
