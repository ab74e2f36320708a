//! Multi-table iteration and unit operations. Callers own the transaction;
//! these functions only issue statements against it.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::warn;

use super::rows::{
    ITERATION_COLUMNS, format_datetime, iteration_from_row, on_unique_violation, select_iteration,
    select_roles, select_unit, select_units, write_setting,
};
use crate::error::{Error, Result};
use crate::tree::UnitForest;
use crate::types::{Iteration, SettingKey};

/// Writer recorded on settings changed as a side effect of a rollback.
const SYSTEM_WRITER: &str = "system";

pub(super) fn insert_iteration(
    conn: &Connection,
    name: &str,
    question_set: &str,
) -> Result<Iteration> {
    conn.execute(
        "INSERT INTO iterations (name, start_date, end_date, question_set) VALUES (?1, ?2, NULL, ?3)",
        params![name, format_datetime(&Utc::now()), question_set],
    )
    .map_err(|e| on_unique_violation(e, Error::bad_request("An active iteration already exists")))?;

    select_iteration(conn, conn.last_insert_rowid())?
        .ok_or_else(|| Error::not_found("Iteration not found"))
}

pub(super) fn latest_closed_iteration(conn: &Connection) -> Result<Option<Iteration>> {
    conn.query_row(
        &format!(
            "SELECT {ITERATION_COLUMNS} FROM iterations
             WHERE end_date IS NOT NULL ORDER BY end_date DESC, id DESC LIMIT 1"
        ),
        [],
        iteration_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Copies the unit forest and role assignments of iteration `from` into
/// iteration `to`. Returns `(units, roles)` copied.
pub(super) fn clone_structure(conn: &Connection, from: i64, to: i64) -> Result<(usize, usize)> {
    let units = select_units(conn, from)?;
    let names: HashMap<i64, &str> = units.iter().map(|u| (u.id, u.name.as_str())).collect();
    let forest = UnitForest::from_units(&units);

    let order = forest.top_down();
    if order.len() < units.len() {
        warn!(
            iteration_id = from,
            skipped = units.len() - order.len(),
            "Units unreachable from any root were not cloned"
        );
    }

    let mut mapping: HashMap<i64, i64> = HashMap::with_capacity(order.len());
    {
        let mut insert = conn.prepare(
            "INSERT INTO organization_units (name, parent_id, iteration_id) VALUES (?1, ?2, ?3)",
        )?;
        for old_id in order {
            let new_parent = forest.parent(old_id).and_then(|p| mapping.get(&p).copied());
            insert.execute(params![names[&old_id], new_parent, to])?;
            mapping.insert(old_id, conn.last_insert_rowid());
        }
    }

    let mut roles_cloned = 0;
    {
        let mut insert = conn.prepare(
            "INSERT INTO person_roles (person_id, org_unit_id, is_manager, description, iteration_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for role in select_roles(conn, from)? {
            let Some(&new_unit) = mapping.get(&role.org_unit_id) else {
                continue;
            };
            insert.execute(params![
                role.person_id,
                new_unit,
                role.is_manager,
                role.description,
                to
            ])?;
            roles_cloned += 1;
        }
    }

    Ok((mapping.len(), roles_cloned))
}

/// Deletes iteration `id`, every iteration after it, and everything scoped
/// to them. Clears the target setting when nothing older survives.
pub(super) fn delete_iterations_from(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    if select_iteration(conn, id)?.is_none() {
        return Err(Error::not_found("Iteration not found"));
    }

    let first_id: i64 = conn.query_row("SELECT MIN(id) FROM iterations", [], |row| row.get(0))?;

    let deleted: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM iterations WHERE id >= ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    conn.execute("DELETE FROM surveys WHERE iteration_id >= ?1", params![id])?;
    conn.execute("DELETE FROM person_roles WHERE iteration_id >= ?1", params![id])?;
    // Detach first so no unit is deleted while a sibling row still points at it.
    conn.execute(
        "UPDATE organization_units SET parent_id = NULL WHERE iteration_id >= ?1",
        params![id],
    )?;
    conn.execute("DELETE FROM organization_units WHERE iteration_id >= ?1", params![id])?;
    conn.execute("DELETE FROM iterations WHERE id >= ?1", params![id])?;

    if id <= first_id {
        write_setting(conn, SettingKey::Target, "", SYSTEM_WRITER)?;
    }

    Ok(deleted)
}

/// Deletes a unit and its subtree, children strictly before parents, each
/// unit's surveys and roles before the unit itself.
pub(super) fn delete_unit_cascade(conn: &Connection, id: i64) -> Result<usize> {
    let unit = select_unit(conn, id)?
        .ok_or_else(|| Error::not_found("Organization unit not found"))?;
    let forest = UnitForest::from_units(&select_units(conn, unit.iteration_id)?);

    let order = forest.bottom_up(id);
    for unit_id in &order {
        conn.execute(
            "DELETE FROM surveys WHERE person_role_id IN
                 (SELECT id FROM person_roles WHERE org_unit_id = ?1)",
            params![unit_id],
        )?;
        conn.execute("DELETE FROM surveys WHERE org_unit_id = ?1", params![unit_id])?;
        conn.execute("DELETE FROM person_roles WHERE org_unit_id = ?1", params![unit_id])?;
        // Only a corrupted parent loop can leave a referrer here.
        conn.execute(
            "UPDATE organization_units SET parent_id = NULL WHERE parent_id = ?1",
            params![unit_id],
        )?;
        conn.execute("DELETE FROM organization_units WHERE id = ?1", params![unit_id])?;
    }

    Ok(order.len())
}
