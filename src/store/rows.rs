//! Row mapping and single-table queries shared by the store and its
//! transactional helpers. Every function takes a plain `&Connection` so it
//! can run inside a `Transaction` as well.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::types::*;

pub(super) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so that text ordering matches chronological ordering.
pub(super) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Maps a unique-constraint violation to `fallback`, anything else to a database error.
pub(super) fn on_unique_violation(err: rusqlite::Error, fallback: Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            fallback
        }
        e => Error::from(e),
    }
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(super) const ITERATION_COLUMNS: &str = "id, name, start_date, end_date, question_set";

pub(super) fn iteration_from_row(row: &Row<'_>) -> rusqlite::Result<Iteration> {
    Ok(Iteration {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: parse_datetime(&row.get::<_, String>(2)?),
        end_date: row.get::<_, Option<String>>(3)?.map(|s| parse_datetime(&s)),
        question_set: row.get(4)?,
    })
}

pub(super) const UNIT_COLUMNS: &str = "id, name, parent_id, iteration_id";

pub(super) fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<OrganizationUnit> {
    Ok(OrganizationUnit {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        iteration_id: row.get(3)?,
    })
}

pub(super) const ROLE_COLUMNS: &str =
    "id, person_id, org_unit_id, is_manager, description, iteration_id";

pub(super) fn role_from_row(row: &Row<'_>) -> rusqlite::Result<PersonRole> {
    Ok(PersonRole {
        id: row.get(0)?,
        person_id: row.get(1)?,
        org_unit_id: row.get(2)?,
        is_manager: row.get(3)?,
        description: row.get(4)?,
        iteration_id: row.get(5)?,
    })
}

pub(super) const SURVEY_COLUMNS: &str = "id, person_role_id, org_unit_id, survey_type, filename, \
     survey_results, analysis_voxel, analysis_graphs, iteration_id";

pub(super) fn survey_from_row(row: &Row<'_>) -> rusqlite::Result<Survey> {
    let kind: String = row.get(3)?;
    let survey_type = SurveyType::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown survey type '{kind}'").into(),
        )
    })?;

    Ok(Survey {
        id: row.get(0)?,
        person_role_id: row.get(1)?,
        org_unit_id: row.get(2)?,
        survey_type,
        filename: row.get(4)?,
        survey_results: json_column(row, 5)?,
        analysis_voxel: json_column(row, 6)?,
        analysis_graphs: json_column(row, 7)?,
        iteration_id: row.get(8)?,
    })
}

pub(super) fn select_iteration(conn: &Connection, id: i64) -> Result<Option<Iteration>> {
    conn.query_row(
        &format!("SELECT {ITERATION_COLUMNS} FROM iterations WHERE id = ?1"),
        params![id],
        iteration_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn select_open_iteration(conn: &Connection) -> Result<Option<Iteration>> {
    conn.query_row(
        &format!("SELECT {ITERATION_COLUMNS} FROM iterations WHERE end_date IS NULL LIMIT 1"),
        [],
        iteration_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn select_unit(conn: &Connection, id: i64) -> Result<Option<OrganizationUnit>> {
    conn.query_row(
        &format!("SELECT {UNIT_COLUMNS} FROM organization_units WHERE id = ?1"),
        params![id],
        unit_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn select_units(conn: &Connection, iteration_id: i64) -> Result<Vec<OrganizationUnit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {UNIT_COLUMNS} FROM organization_units WHERE iteration_id = ?1 ORDER BY id"
    ))?;

    let rows = stmt.query_map(params![iteration_id], unit_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub(super) fn select_role(conn: &Connection, id: i64) -> Result<Option<PersonRole>> {
    conn.query_row(
        &format!("SELECT {ROLE_COLUMNS} FROM person_roles WHERE id = ?1"),
        params![id],
        role_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub(super) fn select_roles(conn: &Connection, iteration_id: i64) -> Result<Vec<PersonRole>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROLE_COLUMNS} FROM person_roles WHERE iteration_id = ?1 ORDER BY id"
    ))?;

    let rows = stmt.query_map(params![iteration_id], role_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Loads the survey occupying `survey`'s key: the role for individual
/// surveys, the unit for calculated ones.
fn select_survey_by_key(conn: &Connection, survey: &NewSurvey) -> Result<Option<Survey>> {
    let (column, key) = match survey.survey_type {
        SurveyType::Individual => ("person_role_id", survey.person_role_id),
        SurveyType::Calculated => ("org_unit_id", survey.org_unit_id),
    };

    conn.query_row(
        &format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys WHERE survey_type = ?1 AND {column} = ?2"
        ),
        params![survey.survey_type.as_str(), key],
        survey_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Replaces the survey stored under the same key, or inserts a new one.
pub(super) fn upsert_survey(conn: &Connection, survey: &NewSurvey) -> Result<Survey> {
    let now = format_datetime(&Utc::now());
    let results = serde_json::to_string(&survey.survey_results)?;
    let voxel = serde_json::to_string(&survey.analysis_voxel)?;
    let graphs = serde_json::to_string(&survey.analysis_graphs)?;

    let key_clause = match survey.survey_type {
        SurveyType::Individual => "person_role_id = ?7",
        SurveyType::Calculated => "org_unit_id = ?8",
    };

    let updated = conn.execute(
        &format!(
            "UPDATE surveys SET filename = ?1, survey_results = ?2, analysis_voxel = ?3,
                 analysis_graphs = ?4, iteration_id = ?5, updated_at = ?6
             WHERE survey_type = ?9 AND {key_clause}"
        ),
        params![
            survey.filename,
            results,
            voxel,
            graphs,
            survey.iteration_id,
            now,
            survey.person_role_id,
            survey.org_unit_id,
            survey.survey_type.as_str(),
        ],
    )?;

    if updated == 0 {
        conn.execute(
            "INSERT INTO surveys (person_role_id, org_unit_id, survey_type, filename,
                 survey_results, analysis_voxel, analysis_graphs, iteration_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                survey.person_role_id,
                survey.org_unit_id,
                survey.survey_type.as_str(),
                survey.filename,
                results,
                voxel,
                graphs,
                survey.iteration_id,
                now,
            ],
        )?;
    }

    select_survey_by_key(conn, survey)?
        .ok_or_else(|| Error::not_found("Survey disappeared after write"))
}

pub(super) fn write_setting(
    conn: &Connection,
    key: SettingKey,
    value: &str,
    updated_by: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_by, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_by = excluded.updated_by,
             updated_at = excluded.updated_at",
        params![key.as_str(), value, updated_by, format_datetime(&Utc::now())],
    )?;
    Ok(())
}
