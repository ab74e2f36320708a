use std::collections::HashSet;

use rusqlite::{Connection, params};
use tracing::info;

use super::CalculationRequest;
use super::rows::{select_role, select_unit, select_units, upsert_survey};
use crate::analysis;
use crate::error::{Error, Result};
use crate::tree::UnitForest;
use crate::types::{Calculation, NewSurvey, SourceSurvey, SurveyType, VoxelAnalysis};

struct SourceRow {
    org_unit_id: i64,
    filename: String,
    results: Vec<f64>,
    voxel: VoxelAnalysis,
}

#[must_use]
pub fn calculated_filename(org_unit_id: i64, iteration_id: i64) -> String {
    format!("unit-{org_unit_id}-iteration-{iteration_id}-calculated.json")
}

fn individual_surveys(conn: &Connection, iteration_id: i64) -> Result<Vec<SourceRow>> {
    let mut stmt = conn.prepare(
        "SELECT r.org_unit_id, s.filename, s.survey_results, s.analysis_voxel
         FROM surveys s
         JOIN person_roles r ON r.id = s.person_role_id
         WHERE s.iteration_id = ?1 AND s.survey_type = 'individual'
         ORDER BY s.id",
    )?;

    let rows = stmt.query_map(params![iteration_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut sources = Vec::new();
    for row in rows {
        let (org_unit_id, filename, results, voxel) = row?;
        sources.push(SourceRow {
            org_unit_id,
            filename,
            results: serde_json::from_str(&results)?,
            voxel: serde_json::from_str(&voxel)?,
        });
    }
    Ok(sources)
}

/// Averages every individual survey of the unit and its subordinates and
/// stores the result as the unit's calculated survey.
pub(super) fn calculate_unit(
    conn: &Connection,
    request: CalculationRequest,
) -> Result<Calculation> {
    let role = select_role(conn, request.person_role_id)?
        .ok_or_else(|| Error::not_found("Person role not found"))?;
    if !role.is_manager {
        return Err(Error::forbidden("Only managers can calculate unit results"));
    }
    if role.iteration_id != request.iteration_id {
        return Err(Error::forbidden("Manager role belongs to a different iteration"));
    }

    let unit = select_unit(conn, request.org_unit_id)?
        .filter(|u| u.iteration_id == request.iteration_id)
        .ok_or_else(|| Error::not_found("Organization unit not found in this iteration"))?;

    let forest = UnitForest::from_units(&select_units(conn, request.iteration_id)?);
    let scope: HashSet<i64> = forest.descendants(unit.id).into_iter().collect();

    let sources: Vec<SourceRow> = individual_surveys(conn, request.iteration_id)?
        .into_iter()
        .filter(|s| scope.contains(&s.org_unit_id))
        .collect();

    if sources.is_empty() {
        return Err(Error::not_found(
            "No surveys found for this unit or its subordinates",
        ));
    }

    let vectors: Vec<Vec<f64>> = sources.iter().map(|s| s.results.clone()).collect();
    let aggregate = analysis::aggregate(&vectors)?;

    let survey = upsert_survey(
        conn,
        &NewSurvey {
            person_role_id: None,
            org_unit_id: Some(unit.id),
            survey_type: SurveyType::Calculated,
            filename: calculated_filename(unit.id, request.iteration_id),
            survey_results: aggregate.stored_results,
            analysis_voxel: aggregate.analysis_voxel,
            analysis_graphs: aggregate.analysis_graphs,
            iteration_id: request.iteration_id,
        },
    )?;

    info!(
        org_unit_id = unit.id,
        iteration_id = request.iteration_id,
        sources = sources.len(),
        "Calculated unit survey"
    );

    Ok(Calculation {
        survey,
        sources: sources
            .into_iter()
            .map(|s| SourceSurvey {
                filename: s.filename,
                analysis_voxel: s.voxel,
            })
            .collect(),
    })
}
