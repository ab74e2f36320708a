use crate::server::response::ApiError;
use crate::types::{QUESTION_SETS, is_allowed_question_set};

const MAX_ITERATION_NAME_LEN: usize = 100;
const MAX_UNIT_NAME_LEN: usize = 200;
const MAX_PERSON_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_FILENAME_LEN: usize = 255;

fn validate_name(name: &str, entity: &str, max_len: usize) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(format!("{entity} name cannot exceed {max_len} characters"));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(format!("{entity} name cannot contain control characters"));
    }
    Ok(trimmed.to_string())
}

/// Validates and trims an iteration name.
pub fn validate_iteration_name(name: &str) -> Result<String, ApiError> {
    validate_name(name, "Iteration", MAX_ITERATION_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_unit_name(name: &str) -> Result<String, ApiError> {
    validate_name(name, "Unit", MAX_UNIT_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_person_name(name: &str) -> Result<String, ApiError> {
    validate_name(name, "Person", MAX_PERSON_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_description(description: Option<&str>) -> Result<(), ApiError> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(ApiError::bad_request(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

/// Survey filenames are labels only and never touch the filesystem.
pub fn validate_filename(filename: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(filename) = filename.map(str::trim) else {
        return Ok(None);
    };
    if filename.is_empty() {
        return Ok(None);
    }
    if filename.chars().count() > MAX_FILENAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Filename cannot exceed {MAX_FILENAME_LEN} characters"
        )));
    }
    if filename.chars().any(char::is_control) {
        return Err(ApiError::bad_request(
            "Filename cannot contain control characters",
        ));
    }
    Ok(Some(filename.to_string()))
}

/// Checks a requested question set against the known ones. `None` passes through.
pub fn resolve_question_set(requested: Option<&str>) -> Result<Option<&str>, ApiError> {
    match requested {
        Some(name) if is_allowed_question_set(name) => Ok(Some(name)),
        Some(name) => Err(ApiError::bad_request(format!(
            "Unknown question set '{name}', expected one of: {}",
            QUESTION_SETS.join(", ")
        ))),
        None => Ok(None),
    }
}
