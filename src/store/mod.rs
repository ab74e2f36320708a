mod calculate;
mod lifecycle;
mod rows;
mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Inputs for rolling up a unit's surveys.
#[derive(Debug, Clone, Copy)]
pub struct CalculationRequest {
    /// Role of the requester; must be a manager role.
    pub person_role_id: i64,
    pub org_unit_id: i64,
    pub iteration_id: i64,
}

/// Optional filters for listing roles. `None` matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleFilter {
    pub iteration_id: Option<i64>,
    pub org_unit_id: Option<i64>,
    pub person_id: Option<i64>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Iteration lifecycle
    fn list_iterations(&self) -> Result<Vec<Iteration>>;
    fn get_iteration(&self, id: i64) -> Result<Option<Iteration>>;
    fn get_active_iteration(&self) -> Result<Option<Iteration>>;
    fn create_iteration(&self, name: &str, question_set: &str) -> Result<Iteration>;
    /// Opens a new iteration with the unit tree and roles of the most recently closed one.
    fn create_next_iteration(&self, name: &str, question_set: Option<&str>) -> Result<CloneSummary>;
    fn close_iteration(&self) -> Result<Iteration>;
    /// Deletes iteration `id` and every later one with all dependent rows.
    /// Returns the deleted iteration ids.
    fn delete_iterations_from(&self, id: i64) -> Result<Vec<i64>>;

    // Organization units
    fn create_unit(&self, name: &str, parent_id: Option<i64>, iteration_id: i64)
    -> Result<OrganizationUnit>;
    fn get_unit(&self, id: i64) -> Result<Option<OrganizationUnit>>;
    fn list_units(&self, iteration_id: i64) -> Result<Vec<OrganizationUnit>>;
    /// The unit and all units below it.
    fn list_subordinate_units(&self, id: i64) -> Result<Vec<OrganizationUnit>>;
    /// Renames and/or re-parents a unit. `Some(None)` moves it to the top level.
    /// Either both changes are applied or neither is.
    fn update_unit(
        &self,
        id: i64,
        name: Option<&str>,
        parent_id: Option<Option<i64>>,
    ) -> Result<OrganizationUnit>;
    /// Removes the unit, its subtree, their roles and surveys. Returns the number of units removed.
    fn delete_unit(&self, id: i64) -> Result<usize>;

    // People
    fn create_person(&self, name: &str) -> Result<Person>;
    fn get_person(&self, id: i64) -> Result<Option<Person>>;
    fn get_person_by_name(&self, name: &str) -> Result<Option<Person>>;
    fn list_people(&self) -> Result<Vec<Person>>;
    fn delete_person(&self, id: i64) -> Result<bool>;

    // Person roles
    fn create_role(
        &self,
        person_id: i64,
        org_unit_id: i64,
        is_manager: bool,
        description: Option<&str>,
    ) -> Result<PersonRole>;
    fn get_role(&self, id: i64) -> Result<Option<PersonRole>>;
    fn list_roles(&self, filter: RoleFilter) -> Result<Vec<PersonRole>>;
    fn update_role_description(&self, id: i64, description: Option<&str>) -> Result<()>;
    fn delete_role(&self, id: i64) -> Result<bool>;

    // Surveys
    fn submit_survey(
        &self,
        person_role_id: i64,
        filename: Option<&str>,
        results: &[f64],
    ) -> Result<Survey>;
    fn get_individual_survey(&self, person_role_id: i64) -> Result<Option<Survey>>;
    fn get_calculated_survey(&self, org_unit_id: i64) -> Result<Option<Survey>>;
    fn list_surveys(&self, iteration_id: i64) -> Result<Vec<Survey>>;
    fn calculate_unit_survey(&self, request: CalculationRequest) -> Result<Calculation>;

    // Settings
    fn get_setting(&self, key: SettingKey) -> Result<AppSetting>;
    fn set_setting(&self, key: SettingKey, value: &str, updated_by: &str) -> Result<AppSetting>;
}
