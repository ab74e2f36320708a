use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::info;

use super::calculate::calculate_unit;
use super::lifecycle::{
    clone_structure, delete_iterations_from, delete_unit_cascade, insert_iteration,
    latest_closed_iteration,
};
use super::rows::*;
use super::schema::SCHEMA;
use super::{CalculationRequest, RoleFilter, Store};
use crate::analysis;
use crate::error::{Error, Result};
use crate::tree::UnitForest;
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Iteration lifecycle

    fn list_iterations(&self) -> Result<Vec<Iteration>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITERATION_COLUMNS} FROM iterations ORDER BY id"
        ))?;

        let rows = stmt.query_map([], iteration_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_iteration(&self, id: i64) -> Result<Option<Iteration>> {
        select_iteration(&self.conn(), id)
    }

    fn get_active_iteration(&self) -> Result<Option<Iteration>> {
        select_open_iteration(&self.conn())
    }

    fn create_iteration(&self, name: &str, question_set: &str) -> Result<Iteration> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if select_open_iteration(&tx)?.is_some() {
            return Err(Error::bad_request("An active iteration already exists"));
        }
        let iteration = insert_iteration(&tx, name, question_set)?;

        tx.commit()?;
        info!(iteration_id = iteration.id, "Created iteration '{}'", iteration.name);
        Ok(iteration)
    }

    fn create_next_iteration(
        &self,
        name: &str,
        question_set: Option<&str>,
    ) -> Result<CloneSummary> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if select_open_iteration(&tx)?.is_some() {
            return Err(Error::bad_request("An active iteration already exists"));
        }
        let previous = latest_closed_iteration(&tx)?
            .ok_or_else(|| Error::bad_request("No closed iteration to clone from"))?;

        let question_set = question_set.unwrap_or(&previous.question_set);
        let iteration = insert_iteration(&tx, name, question_set)?;
        let (units_cloned, roles_cloned) = clone_structure(&tx, previous.id, iteration.id)?;

        tx.commit()?;
        info!(
            iteration_id = iteration.id,
            cloned_from = previous.id,
            units_cloned,
            roles_cloned,
            "Created iteration '{}' from previous structure",
            iteration.name
        );

        Ok(CloneSummary {
            iteration,
            cloned_from: previous.id,
            units_cloned,
            roles_cloned,
        })
    }

    fn close_iteration(&self) -> Result<Iteration> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let open = select_open_iteration(&tx)?
            .ok_or_else(|| Error::not_found("No active iteration"))?;
        tx.execute(
            "UPDATE iterations SET end_date = ?1 WHERE id = ?2",
            params![format_datetime(&chrono::Utc::now()), open.id],
        )?;
        let closed = select_iteration(&tx, open.id)?
            .ok_or_else(|| Error::not_found("Iteration not found"))?;

        tx.commit()?;
        info!(iteration_id = closed.id, "Closed iteration '{}'", closed.name);
        Ok(closed)
    }

    fn delete_iterations_from(&self, id: i64) -> Result<Vec<i64>> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let deleted = delete_iterations_from(&tx, id)?;

        tx.commit()?;
        info!(?deleted, "Deleted iterations from {}", id);
        Ok(deleted)
    }

    // Organization units

    fn create_unit(
        &self,
        name: &str,
        parent_id: Option<i64>,
        iteration_id: i64,
    ) -> Result<OrganizationUnit> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if select_iteration(&tx, iteration_id)?.is_none() {
            return Err(Error::not_found("Iteration not found"));
        }
        if let Some(parent_id) = parent_id {
            let parent = select_unit(&tx, parent_id)?
                .ok_or_else(|| Error::bad_request("Parent unit not found"))?;
            if parent.iteration_id != iteration_id {
                return Err(Error::bad_request(
                    "Parent unit must belong to the same iteration",
                ));
            }
        }

        tx.execute(
            "INSERT INTO organization_units (name, parent_id, iteration_id) VALUES (?1, ?2, ?3)",
            params![name, parent_id, iteration_id],
        )?;
        let unit = select_unit(&tx, tx.last_insert_rowid())?
            .ok_or_else(|| Error::not_found("Organization unit not found"))?;

        tx.commit()?;
        Ok(unit)
    }

    fn get_unit(&self, id: i64) -> Result<Option<OrganizationUnit>> {
        select_unit(&self.conn(), id)
    }

    fn list_units(&self, iteration_id: i64) -> Result<Vec<OrganizationUnit>> {
        select_units(&self.conn(), iteration_id)
    }

    fn list_subordinate_units(&self, id: i64) -> Result<Vec<OrganizationUnit>> {
        let conn = self.conn();
        let unit = select_unit(&conn, id)?
            .ok_or_else(|| Error::not_found("Organization unit not found"))?;
        let units = select_units(&conn, unit.iteration_id)?;
        let forest = UnitForest::from_units(&units);

        let mut by_id: std::collections::HashMap<i64, OrganizationUnit> =
            units.into_iter().map(|u| (u.id, u)).collect();
        Ok(forest
            .descendants(id)
            .into_iter()
            .filter_map(|unit_id| by_id.remove(&unit_id))
            .collect())
    }

    fn update_unit(
        &self,
        id: i64,
        name: Option<&str>,
        parent_id: Option<Option<i64>>,
    ) -> Result<OrganizationUnit> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let unit = select_unit(&tx, id)?
            .ok_or_else(|| Error::not_found("Organization unit not found"))?;

        if let Some(Some(parent_id)) = parent_id {
            let parent = select_unit(&tx, parent_id)?
                .ok_or_else(|| Error::bad_request("Parent unit not found"))?;
            if parent.iteration_id != unit.iteration_id {
                return Err(Error::bad_request(
                    "Parent unit must belong to the same iteration",
                ));
            }

            let forest = UnitForest::from_units(&select_units(&tx, unit.iteration_id)?);
            if forest.is_self_or_descendant(id, parent_id) {
                return Err(Error::bad_request(
                    "Cannot move a unit under itself or its subordinates",
                ));
            }
        }

        if let Some(name) = name {
            tx.execute(
                "UPDATE organization_units SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        if let Some(parent_id) = parent_id {
            tx.execute(
                "UPDATE organization_units SET parent_id = ?1 WHERE id = ?2",
                params![parent_id, id],
            )?;
        }

        let updated = select_unit(&tx, id)?
            .ok_or_else(|| Error::not_found("Organization unit not found"))?;

        tx.commit()?;
        Ok(updated)
    }

    fn delete_unit(&self, id: i64) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let removed = delete_unit_cascade(&tx, id)?;

        tx.commit()?;
        info!(org_unit_id = id, removed, "Deleted organization unit subtree");
        Ok(removed)
    }

    // People

    fn create_person(&self, name: &str) -> Result<Person> {
        let conn = self.conn();
        conn.execute("INSERT INTO people (name) VALUES (?1)", params![name])
            .map_err(|e| on_unique_violation(e, Error::conflict("Person already exists")))?;

        Ok(Person {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn get_person(&self, id: i64) -> Result<Option<Person>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM people WHERE id = ?1",
            params![id],
            |row| {
                Ok(Person {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_person_by_name(&self, name: &str) -> Result<Option<Person>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM people WHERE name = ?1",
            params![name],
            |row| {
                Ok(Person {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_people(&self) -> Result<Vec<Person>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM people ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok(Person {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_person(&self, id: i64) -> Result<bool> {
        let conn = self.conn();
        let roles: i64 = conn.query_row(
            "SELECT COUNT(*) FROM person_roles WHERE person_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if roles > 0 {
            return Err(Error::conflict("Cannot delete a person who still holds roles"));
        }

        let rows = conn.execute("DELETE FROM people WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Person roles

    fn create_role(
        &self,
        person_id: i64,
        org_unit_id: i64,
        is_manager: bool,
        description: Option<&str>,
    ) -> Result<PersonRole> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let person_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM people WHERE id = ?1",
                params![person_id],
                |row| row.get(0),
            )
            .optional()?;
        if person_exists.is_none() {
            return Err(Error::not_found("Person not found"));
        }
        let unit = select_unit(&tx, org_unit_id)?
            .ok_or_else(|| Error::not_found("Organization unit not found"))?;

        tx.execute(
            "INSERT INTO person_roles (person_id, org_unit_id, is_manager, description, iteration_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![person_id, org_unit_id, is_manager, description, unit.iteration_id],
        )
        .map_err(|e| on_unique_violation(e, Error::conflict("Role already exists")))?;
        let role = select_role(&tx, tx.last_insert_rowid())?
            .ok_or_else(|| Error::not_found("Person role not found"))?;

        tx.commit()?;
        Ok(role)
    }

    fn get_role(&self, id: i64) -> Result<Option<PersonRole>> {
        select_role(&self.conn(), id)
    }

    fn list_roles(&self, filter: RoleFilter) -> Result<Vec<PersonRole>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ROLE_COLUMNS} FROM person_roles
             WHERE (?1 IS NULL OR iteration_id = ?1)
               AND (?2 IS NULL OR org_unit_id = ?2)
               AND (?3 IS NULL OR person_id = ?3)
             ORDER BY id"
        ))?;

        let rows = stmt.query_map(
            params![filter.iteration_id, filter.org_unit_id, filter.person_id],
            role_from_row,
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_role_description(&self, id: i64, description: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE person_roles SET description = ?1 WHERE id = ?2",
            params![description, id],
        )?;

        if rows == 0 {
            return Err(Error::not_found("Person role not found"));
        }
        Ok(())
    }

    fn delete_role(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM surveys WHERE person_role_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM person_roles WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    // Surveys

    fn submit_survey(
        &self,
        person_role_id: i64,
        filename: Option<&str>,
        results: &[f64],
    ) -> Result<Survey> {
        let (analysis_voxel, analysis_graphs) = analysis::analyze(results)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let role = select_role(&tx, person_role_id)?
            .ok_or_else(|| Error::not_found("Person role not found"))?;
        let iteration = select_iteration(&tx, role.iteration_id)?
            .ok_or_else(|| Error::not_found("Iteration not found"))?;
        if !iteration.is_open() {
            return Err(Error::bad_request(
                "Surveys can only be submitted to the active iteration",
            ));
        }

        let filename = filename.map_or_else(
            || format!("role-{person_role_id}-iteration-{}.json", role.iteration_id),
            str::to_string,
        );
        let survey = upsert_survey(
            &tx,
            &NewSurvey {
                person_role_id: Some(person_role_id),
                org_unit_id: None,
                survey_type: SurveyType::Individual,
                filename,
                survey_results: results.to_vec(),
                analysis_voxel,
                analysis_graphs,
                iteration_id: role.iteration_id,
            },
        )?;

        tx.commit()?;
        Ok(survey)
    }

    fn get_individual_survey(&self, person_role_id: i64) -> Result<Option<Survey>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {SURVEY_COLUMNS} FROM surveys
                 WHERE survey_type = 'individual' AND person_role_id = ?1"
            ),
            params![person_role_id],
            survey_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_calculated_survey(&self, org_unit_id: i64) -> Result<Option<Survey>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {SURVEY_COLUMNS} FROM surveys
                 WHERE survey_type = 'calculated' AND org_unit_id = ?1"
            ),
            params![org_unit_id],
            survey_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_surveys(&self, iteration_id: i64) -> Result<Vec<Survey>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys WHERE iteration_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![iteration_id], survey_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn calculate_unit_survey(&self, request: CalculationRequest) -> Result<Calculation> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let calculation = calculate_unit(&tx, request)?;

        tx.commit()?;
        Ok(calculation)
    }

    // Settings

    fn get_setting(&self, key: SettingKey) -> Result<AppSetting> {
        let conn = self.conn();
        let stored = conn
            .query_row(
                "SELECT value, updated_by, updated_at FROM app_settings WHERE key = ?1",
                params![key.as_str()],
                |row| {
                    Ok(AppSetting {
                        key,
                        value: row.get(0)?,
                        updated_by: row.get(1)?,
                        updated_at: Some(parse_datetime(&row.get::<_, String>(2)?)),
                    })
                },
            )
            .optional()?;

        Ok(stored.unwrap_or(AppSetting {
            key,
            value: String::new(),
            updated_by: None,
            updated_at: None,
        }))
    }

    fn set_setting(&self, key: SettingKey, value: &str, updated_by: &str) -> Result<AppSetting> {
        write_setting(&self.conn(), key, value, updated_by)?;
        self.get_setting(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn request(role: &PersonRole, unit: i64, iteration: i64) -> CalculationRequest {
        CalculationRequest {
            person_role_id: role.id,
            org_unit_id: unit,
            iteration_id: iteration,
        }
    }

    /// One iteration with `root -> team -> squad` and a manager on root.
    struct Org {
        iteration: Iteration,
        root: OrganizationUnit,
        team: OrganizationUnit,
        squad: OrganizationUnit,
        manager: PersonRole,
    }

    fn seed_org(store: &SqliteStore) -> Org {
        let iteration = store
            .create_iteration("2026 Q1", "questions_standard.json")
            .unwrap();
        let root = store.create_unit("Company", None, iteration.id).unwrap();
        let team = store
            .create_unit("Engineering", Some(root.id), iteration.id)
            .unwrap();
        let squad = store
            .create_unit("Platform", Some(team.id), iteration.id)
            .unwrap();
        let boss = store.create_person("alice").unwrap();
        let manager = store
            .create_role(boss.id, root.id, true, Some("Head of company"))
            .unwrap();

        Org {
            iteration,
            root,
            team,
            squad,
            manager,
        }
    }

    fn contributor(store: &SqliteStore, name: &str, unit: i64) -> PersonRole {
        let person = store.create_person(name).unwrap();
        store.create_role(person.id, unit, false, None).unwrap()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = open_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "iterations",
            "organization_units",
            "people",
            "person_roles",
            "surveys",
            "app_settings",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_only_one_open_iteration() {
        let (_temp, store) = open_store();
        store
            .create_iteration("first", "questions_standard.json")
            .unwrap();

        let result = store.create_iteration("second", "questions_standard.json");
        assert!(matches!(result, Err(Error::BadRequest(_))));

        store.close_iteration().unwrap();
        let second = store
            .create_iteration("second", "questions_short.json")
            .unwrap();
        assert!(second.is_open());
        assert_eq!(store.get_active_iteration().unwrap().unwrap().id, second.id);
    }

    #[test]
    fn test_close_twice_is_not_found() {
        let (_temp, store) = open_store();
        store
            .create_iteration("first", "questions_standard.json")
            .unwrap();

        let closed = store.close_iteration().unwrap();
        assert!(closed.end_date.is_some());

        let again = store.close_iteration();
        assert!(matches!(again, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_next_iteration_requires_closed_predecessor() {
        let (_temp, store) = open_store();

        let none = store.create_next_iteration("next", None);
        assert!(matches!(none, Err(Error::BadRequest(_))));

        store
            .create_iteration("first", "questions_standard.json")
            .unwrap();
        let while_open = store.create_next_iteration("next", None);
        assert!(matches!(while_open, Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_next_iteration_clones_tree_and_roles() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        contributor(&store, "bob", org.team.id);
        contributor(&store, "carol", org.squad.id);
        store.close_iteration().unwrap();

        let summary = store.create_next_iteration("2026 Q2", None).unwrap();
        assert_eq!(summary.cloned_from, org.iteration.id);
        assert_eq!(summary.units_cloned, 3);
        assert_eq!(summary.roles_cloned, 3);
        assert_eq!(summary.iteration.question_set, "questions_standard.json");

        let new_units = store.list_units(summary.iteration.id).unwrap();
        let by_name = |name: &str| new_units.iter().find(|u| u.name == name).unwrap().clone();
        let root = by_name("Company");
        let team = by_name("Engineering");
        let squad = by_name("Platform");

        assert_eq!(root.parent_id, None);
        assert_eq!(team.parent_id, Some(root.id));
        assert_eq!(squad.parent_id, Some(team.id));
        assert_ne!(root.id, org.root.id);

        let roles = store
            .list_roles(RoleFilter {
                iteration_id: Some(summary.iteration.id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(roles.len(), 3);
        let manager = roles.iter().find(|r| r.is_manager).unwrap();
        assert_eq!(manager.org_unit_id, root.id);
        assert_eq!(manager.description.as_deref(), Some("Head of company"));

        // The old iteration is untouched.
        assert_eq!(store.list_units(org.iteration.id).unwrap().len(), 3);
    }

    #[test]
    fn test_next_iteration_uses_latest_closed() {
        let (_temp, store) = open_store();
        let first = store
            .create_iteration("first", "questions_standard.json")
            .unwrap();
        store.create_unit("Old", None, first.id).unwrap();
        store.close_iteration().unwrap();

        let second = store
            .create_iteration("second", "questions_short.json")
            .unwrap();
        store.create_unit("Newer", None, second.id).unwrap();
        store.close_iteration().unwrap();

        let summary = store.create_next_iteration("third", None).unwrap();
        assert_eq!(summary.cloned_from, second.id);
        assert_eq!(summary.iteration.question_set, "questions_short.json");
        let units = store.list_units(summary.iteration.id).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "Newer");
    }

    #[test]
    fn test_calculation_matches_worked_example() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.team.id);
        let carol = contributor(&store, "carol", org.squad.id);
        store.submit_survey(bob.id, None, &[2.0, 4.0, 6.0]).unwrap();
        store.submit_survey(carol.id, None, &[4.0, 6.0, 8.0]).unwrap();

        let calc = store
            .calculate_unit_survey(request(&org.manager, org.root.id, org.iteration.id))
            .unwrap();

        assert_eq!(calc.survey.survey_type, SurveyType::Calculated);
        assert_eq!(calc.survey.org_unit_id, Some(org.root.id));
        assert_eq!(calc.survey.survey_results, vec![3.0, 5.0, 7.0]);
        assert_eq!(calc.survey.analysis_voxel.knowledge.mean, 3.0);
        assert_eq!(calc.survey.analysis_voxel.familiarity.mean, 5.0);
        assert_eq!(calc.survey.analysis_voxel.cognitive_load.mean, 7.0);
        assert_eq!(calc.survey.analysis_voxel.voxel, VoxelPoint { x: 3, y: 5, z: 7 });
        assert_eq!(calc.sources.len(), 2);
        assert_eq!(
            calc.survey.filename,
            format!("unit-{}-iteration-{}-calculated.json", org.root.id, org.iteration.id)
        );
    }

    #[test]
    fn test_calculation_scope_is_the_subtree() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.team.id);
        let carol = contributor(&store, "carol", org.squad.id);
        store.submit_survey(bob.id, None, &[1.0, 1.0, 1.0]).unwrap();
        store.submit_survey(carol.id, None, &[5.0, 5.0, 5.0]).unwrap();

        let calc = store
            .calculate_unit_survey(request(&org.manager, org.squad.id, org.iteration.id))
            .unwrap();
        assert_eq!(calc.sources.len(), 1);
        assert_eq!(calc.survey.survey_results, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_calculation_is_idempotent_upsert() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.team.id);
        store
            .submit_survey(bob.id, None, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();

        let req = request(&org.manager, org.team.id, org.iteration.id);
        let first = store.calculate_unit_survey(req).unwrap();
        let second = store.calculate_unit_survey(req).unwrap();

        assert_eq!(first.survey.id, second.survey.id);
        assert_eq!(first.survey.survey_results, second.survey.survey_results);
        assert_eq!(first.survey.analysis_voxel, second.survey.analysis_voxel);

        let calculated: Vec<_> = store
            .list_surveys(org.iteration.id)
            .unwrap()
            .into_iter()
            .filter(|s| s.survey_type == SurveyType::Calculated)
            .collect();
        assert_eq!(calculated.len(), 1);
    }

    #[test]
    fn test_calculation_without_surveys_is_not_found() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);

        let result =
            store.calculate_unit_survey(request(&org.manager, org.root.id, org.iteration.id));
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(store.get_calculated_survey(org.root.id).unwrap().is_none());
    }

    #[test]
    fn test_calculation_by_non_manager_is_forbidden() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.team.id);
        store.submit_survey(bob.id, None, &[2.0, 2.0, 2.0]).unwrap();

        let result = store.calculate_unit_survey(request(&bob, org.team.id, org.iteration.id));
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[test]
    fn test_calculation_with_role_from_other_iteration_is_forbidden() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        store.close_iteration().unwrap();
        let next = store.create_next_iteration("2026 Q2", None).unwrap();
        let units = store.list_units(next.iteration.id).unwrap();
        let root = units.iter().find(|u| u.name == "Company").unwrap();
        let bob = contributor(&store, "bob", root.id);
        store.submit_survey(bob.id, None, &[2.0, 2.0, 2.0]).unwrap();

        let result = store.calculate_unit_survey(request(&org.manager, root.id, next.iteration.id));
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[test]
    fn test_calculation_with_mismatched_lengths_is_rejected() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.team.id);
        let carol = contributor(&store, "carol", org.team.id);
        store.submit_survey(bob.id, None, &[2.0, 2.0, 2.0]).unwrap();
        store
            .submit_survey(carol.id, None, &[2.0, 2.0, 2.0, 2.0, 2.0, 2.0])
            .unwrap();

        let result =
            store.calculate_unit_survey(request(&org.manager, org.team.id, org.iteration.id));
        assert!(matches!(result, Err(Error::BadRequest(_))));
        assert!(store.get_calculated_survey(org.team.id).unwrap().is_none());
    }

    #[test]
    fn test_submit_survey_replaces_previous() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.team.id);

        let first = store.submit_survey(bob.id, None, &[1.0, 1.0, 1.0]).unwrap();
        let second = store
            .submit_survey(bob.id, Some("bob.json"), &[3.0, 3.0, 3.0])
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.filename, "bob.json");
        let stored = store.get_individual_survey(bob.id).unwrap().unwrap();
        assert_eq!(stored.survey_results, vec![3.0, 3.0, 3.0]);
        assert_eq!(stored.analysis_voxel.voxel, VoxelPoint { x: 3, y: 3, z: 3 });
    }

    #[test]
    fn test_submit_survey_to_closed_iteration_is_rejected() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        store.close_iteration().unwrap();

        let result = store.submit_survey(org.manager.id, None, &[1.0, 1.0, 1.0]);
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_delete_iterations_from_removes_later_ones() {
        let (_temp, store) = open_store();
        let first = seed_org(&store);
        store.close_iteration().unwrap();
        let second = store.create_next_iteration("2026 Q2", None).unwrap();
        store.close_iteration().unwrap();
        let third = store.create_next_iteration("2026 Q3", None).unwrap();
        let role = store
            .list_roles(RoleFilter {
                iteration_id: Some(third.iteration.id),
                ..Default::default()
            })
            .unwrap()
            .remove(0);
        store.submit_survey(role.id, None, &[4.0, 4.0, 4.0]).unwrap();
        store.set_setting(SettingKey::Target, "Ship it", "admin").unwrap();

        let deleted = store.delete_iterations_from(second.iteration.id).unwrap();
        assert_eq!(deleted, vec![second.iteration.id, third.iteration.id]);

        let remaining = store.list_iterations().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, first.iteration.id);
        assert!(store.list_units(third.iteration.id).unwrap().is_empty());
        assert!(store.list_surveys(third.iteration.id).unwrap().is_empty());
        assert!(store.get_role(role.id).unwrap().is_none());
        assert_eq!(store.list_units(first.iteration.id).unwrap().len(), 3);
        // Not the earliest iteration, so the target survives.
        assert_eq!(store.get_setting(SettingKey::Target).unwrap().value, "Ship it");
    }

    #[test]
    fn test_delete_from_earliest_iteration_clears_target() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        store.set_setting(SettingKey::Target, "Ship it", "admin").unwrap();

        let deleted = store.delete_iterations_from(org.iteration.id).unwrap();
        assert_eq!(deleted, vec![org.iteration.id]);

        let target = store.get_setting(SettingKey::Target).unwrap();
        assert_eq!(target.value, "");
        assert_eq!(target.updated_by.as_deref(), Some("system"));
        assert!(store.list_iterations().unwrap().is_empty());
        // People outlive iterations.
        assert!(store.get_person_by_name("alice").unwrap().is_some());
    }

    #[test]
    fn test_delete_unit_cascades_to_subtree() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.squad.id);
        store.submit_survey(bob.id, None, &[1.0, 2.0, 3.0]).unwrap();
        store
            .calculate_unit_survey(request(&org.manager, org.squad.id, org.iteration.id))
            .unwrap();

        let removed = store.delete_unit(org.team.id).unwrap();
        assert_eq!(removed, 2);

        assert!(store.get_unit(org.team.id).unwrap().is_none());
        assert!(store.get_unit(org.squad.id).unwrap().is_none());
        assert!(store.get_role(bob.id).unwrap().is_none());
        assert!(store.list_surveys(org.iteration.id).unwrap().is_empty());
        assert!(store.get_unit(org.root.id).unwrap().is_some());
        assert!(store.get_role(org.manager.id).unwrap().is_some());

        let missing = store.delete_unit(org.team.id);
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_subordinates_stay_within_iteration() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        store.close_iteration().unwrap();
        store.create_next_iteration("next", None).unwrap();

        let ids: Vec<i64> = store
            .list_subordinate_units(org.root.id)
            .unwrap()
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![org.root.id, org.team.id, org.squad.id]);
    }

    #[test]
    fn test_move_unit_rejects_cycles() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);

        let result = store.update_unit(org.root.id, None, Some(Some(org.squad.id)));
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let result = store.update_unit(org.team.id, None, Some(Some(org.team.id)));
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let squad = store
            .update_unit(org.squad.id, None, Some(Some(org.root.id)))
            .unwrap();
        assert_eq!(squad.parent_id, Some(org.root.id));
        assert_eq!(squad.name, "Platform");

        let top = store.update_unit(org.squad.id, None, Some(None)).unwrap();
        assert_eq!(top.parent_id, None);
    }

    #[test]
    fn test_rejected_move_keeps_name() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);

        let result = store.update_unit(org.root.id, Some("Renamed"), Some(Some(org.team.id)));
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let root = store.get_unit(org.root.id).unwrap().unwrap();
        assert_eq!(root.name, "Company");
        assert_eq!(root.parent_id, None);

        let renamed = store
            .update_unit(org.team.id, Some("Platform Eng"), None)
            .unwrap();
        assert_eq!(renamed.name, "Platform Eng");
        assert_eq!(renamed.parent_id, Some(org.root.id));
    }

    /// Makes every `op` on `table` fail inside SQLite, optionally only when `when` holds.
    fn fail_on(store: &SqliteStore, name: &str, op: &str, table: &str, when: &str) {
        store
            .conn()
            .execute_batch(&format!(
                "CREATE TRIGGER {name} BEFORE {op} ON {table} {when}
                 BEGIN SELECT RAISE(ABORT, 'forced failure'); END;"
            ))
            .unwrap();
    }

    #[test]
    fn test_failed_iteration_delete_rolls_back() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.squad.id);
        store.submit_survey(bob.id, None, &[1.0, 2.0, 3.0]).unwrap();
        store.set_setting(SettingKey::Target, "Ship it", "admin").unwrap();
        fail_on(&store, "no_iteration_delete", "DELETE", "iterations", "");

        let result = store.delete_iterations_from(org.iteration.id);
        assert!(matches!(result, Err(Error::Database(_))));

        assert_eq!(store.list_iterations().unwrap().len(), 1);
        assert_eq!(store.list_units(org.iteration.id).unwrap().len(), 3);
        assert!(store.get_role(bob.id).unwrap().is_some());
        assert_eq!(store.list_surveys(org.iteration.id).unwrap().len(), 1);
        assert_eq!(store.get_setting(SettingKey::Target).unwrap().value, "Ship it");
    }

    #[test]
    fn test_failed_clone_leaves_no_iteration() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        contributor(&store, "bob", org.team.id);
        store.close_iteration().unwrap();
        fail_on(&store, "no_role_insert", "INSERT", "person_roles", "");

        let result = store.create_next_iteration("2026 Q2", None);
        assert!(matches!(result, Err(Error::Database(_))));

        let iterations = store.list_iterations().unwrap();
        assert_eq!(iterations.len(), 1);
        assert!(store.get_active_iteration().unwrap().is_none());
        let total_units: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM organization_units", [], |row| row.get(0))
            .unwrap();
        assert_eq!(total_units, 3);
    }

    #[test]
    fn test_failed_unit_delete_rolls_back_subtree() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.squad.id);
        store.submit_survey(bob.id, None, &[1.0, 2.0, 3.0]).unwrap();
        // The squad goes first, so the failure lands after its rows are gone.
        fail_on(
            &store,
            "no_team_delete",
            "DELETE",
            "organization_units",
            &format!("WHEN OLD.id = {}", org.team.id),
        );

        let result = store.delete_unit(org.team.id);
        assert!(matches!(result, Err(Error::Database(_))));

        assert!(store.get_unit(org.squad.id).unwrap().is_some());
        assert!(store.get_role(bob.id).unwrap().is_some());
        assert!(store.get_individual_survey(bob.id).unwrap().is_some());
    }

    #[test]
    fn test_failed_recalculation_keeps_previous_result() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);
        let bob = contributor(&store, "bob", org.team.id);
        store.submit_survey(bob.id, None, &[2.0, 2.0, 2.0]).unwrap();
        let req = request(&org.manager, org.team.id, org.iteration.id);
        store.calculate_unit_survey(req).unwrap();

        store.submit_survey(bob.id, None, &[4.0, 4.0, 4.0]).unwrap();
        let calculated = "WHEN NEW.survey_type = 'calculated'";
        fail_on(&store, "no_calc_insert", "INSERT", "surveys", calculated);
        fail_on(&store, "no_calc_update", "UPDATE", "surveys", calculated);

        let result = store.calculate_unit_survey(req);
        assert!(matches!(result, Err(Error::Database(_))));

        let stored = store.get_calculated_survey(org.team.id).unwrap().unwrap();
        assert_eq!(stored.survey_results, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_duplicate_role_and_person_conflict() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);

        let dup_person = store.create_person("alice");
        assert!(matches!(dup_person, Err(Error::Conflict(_))));

        let dup_role = store.create_role(org.manager.person_id, org.root.id, true, None);
        assert!(matches!(dup_role, Err(Error::Conflict(_))));

        // Same person as a contributor of the same unit is a distinct role.
        store
            .create_role(org.manager.person_id, org.root.id, false, None)
            .unwrap();
    }

    #[test]
    fn test_delete_person_with_roles_conflicts() {
        let (_temp, store) = open_store();
        let org = seed_org(&store);

        let result = store.delete_person(org.manager.person_id);
        assert!(matches!(result, Err(Error::Conflict(_))));

        assert!(store.delete_role(org.manager.id).unwrap());
        assert!(store.delete_person(org.manager.person_id).unwrap());
    }

    #[test]
    fn test_setting_defaults_to_empty() {
        let (_temp, store) = open_store();

        let target = store.get_setting(SettingKey::Target).unwrap();
        assert_eq!(target.value, "");
        assert!(target.updated_at.is_none());

        let written = store
            .set_setting(SettingKey::Target, "Grow the team", "alice")
            .unwrap();
        assert_eq!(written.value, "Grow the team");
        assert_eq!(written.updated_by.as_deref(), Some("alice"));
        assert!(written.updated_at.is_some());
    }
}
