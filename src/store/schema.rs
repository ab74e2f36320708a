pub const SCHEMA: &str = r#"
-- Survey cycles; a NULL end_date marks the open one
CREATE TABLE IF NOT EXISTS iterations (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    question_set TEXT NOT NULL
);

-- Management hierarchy, one forest per iteration
CREATE TABLE IF NOT EXISTS organization_units (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id INTEGER REFERENCES organization_units(id),
    iteration_id INTEGER NOT NULL REFERENCES iterations(id)
);

-- People exist across iterations
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- A person's assignment to a unit within one iteration
CREATE TABLE IF NOT EXISTS person_roles (
    id INTEGER PRIMARY KEY,
    person_id INTEGER NOT NULL REFERENCES people(id),
    org_unit_id INTEGER NOT NULL REFERENCES organization_units(id),
    is_manager INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    iteration_id INTEGER NOT NULL REFERENCES iterations(id),

    UNIQUE(person_id, org_unit_id, is_manager, iteration_id)
);

-- Individual responses (keyed by role) and calculated roll-ups (keyed by unit)
CREATE TABLE IF NOT EXISTS surveys (
    id INTEGER PRIMARY KEY,
    person_role_id INTEGER REFERENCES person_roles(id),
    org_unit_id INTEGER REFERENCES organization_units(id),
    survey_type TEXT NOT NULL CHECK (survey_type IN ('individual', 'calculated')),
    filename TEXT NOT NULL,
    survey_results TEXT NOT NULL,   -- JSON array of numbers
    analysis_voxel TEXT NOT NULL,   -- JSON object
    analysis_graphs TEXT NOT NULL,  -- JSON object
    iteration_id INTEGER NOT NULL REFERENCES iterations(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    CHECK (survey_type <> 'individual' OR person_role_id IS NOT NULL),
    CHECK (survey_type <> 'calculated' OR org_unit_id IS NOT NULL)
);

-- Typed application settings with writer audit
CREATE TABLE IF NOT EXISTS app_settings (
    key TEXT PRIMARY KEY CHECK (key IN ('target')),
    value TEXT NOT NULL,
    updated_by TEXT,
    updated_at TEXT NOT NULL
);

-- At most one open iteration
CREATE UNIQUE INDEX IF NOT EXISTS idx_iterations_single_open
    ON iterations((end_date IS NULL)) WHERE end_date IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS idx_surveys_individual
    ON surveys(person_role_id) WHERE survey_type = 'individual';
CREATE UNIQUE INDEX IF NOT EXISTS idx_surveys_calculated
    ON surveys(org_unit_id) WHERE survey_type = 'calculated';

CREATE INDEX IF NOT EXISTS idx_units_iteration ON organization_units(iteration_id);
CREATE INDEX IF NOT EXISTS idx_units_parent ON organization_units(parent_id);
CREATE INDEX IF NOT EXISTS idx_roles_iteration ON person_roles(iteration_id);
CREATE INDEX IF NOT EXISTS idx_roles_unit ON person_roles(org_unit_id);
CREATE INDEX IF NOT EXISTS idx_roles_person ON person_roles(person_id);
CREATE INDEX IF NOT EXISTS idx_surveys_iteration ON surveys(iteration_id);
"#;
