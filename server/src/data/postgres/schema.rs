//! PostgreSQL schema definitions
//!
//! `SCHEMA` is the complete current schema applied to a fresh database.
//! Databases created by an older version are brought forward by the
//! versioned migrations in `migrations.rs`, which must leave them identical.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 3;

/// Complete schema SQL for PostgreSQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT TRUE
);

-- =============================================================================
-- 1. Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 1),
    email TEXT NOT NULL,
    password TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'Developer' CHECK(role IN ('Admin', 'QA', 'Developer')),
    status TEXT NOT NULL DEFAULT 'Active' CHECK(status IN ('Active', 'Inactive')),
    avatar TEXT,
    last_active TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE UNIQUE INDEX IF NOT EXISTS users_email_unique ON users (LOWER(email));

-- =============================================================================
-- 2. Projects
-- =============================================================================
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 1),
    description TEXT,
    status TEXT NOT NULL DEFAULT 'Active'
        CHECK(status IN ('Active', 'On Hold', 'Completed', 'Archived')),
    start_date DATE,
    end_date DATE,
    created_by TEXT REFERENCES users(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- =============================================================================
-- 3. Project Members (references projects + users)
-- =============================================================================
CREATE TABLE IF NOT EXISTS project_members (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'Member',
    joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (project_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_project_members_user ON project_members(user_id);

-- =============================================================================
-- 4. Sprints and Epics (reference projects)
-- =============================================================================
CREATE TABLE IF NOT EXISTS sprints (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK(length(name) >= 1),
    goal TEXT,
    start_date DATE,
    end_date DATE,
    status TEXT NOT NULL DEFAULT 'Planning' CHECK(status IN ('Planning', 'Active', 'Completed')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_sprints_project ON sprints(project_id);

CREATE TABLE IF NOT EXISTS epics (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK(length(name) >= 1),
    description TEXT,
    status TEXT NOT NULL DEFAULT 'Open'
        CHECK(status IN ('Open', 'In Progress', 'Done', 'Cancelled')),
    color TEXT,
    start_date DATE,
    end_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_epics_project ON epics(project_id);

-- =============================================================================
-- 5. Issues (references projects, users, sprints, epics)
-- =============================================================================
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    bug_id TEXT NOT NULL,
    bug_seq INTEGER NOT NULL CHECK(bug_seq >= 1),
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title TEXT NOT NULL CHECK(length(title) >= 1),
    description TEXT,
    module_name TEXT,
    issue_type TEXT NOT NULL DEFAULT 'Bug'
        CHECK(issue_type IN ('Bug', 'Feature', 'Improvement', 'Task')),
    severity TEXT NOT NULL DEFAULT 'Medium'
        CHECK(severity IN ('Critical', 'High', 'Medium', 'Low')),
    status TEXT NOT NULL DEFAULT 'Open'
        CHECK(status IN ('Open', 'In Progress', 'Fixed', 'Closed', 'Reopen')),
    priority TEXT NOT NULL DEFAULT 'P3' CHECK(priority IN ('P1', 'P2', 'P3', 'P4')),
    assigned_to TEXT REFERENCES users(id) ON DELETE SET NULL,
    reported_by TEXT REFERENCES users(id) ON DELETE SET NULL,
    steps_to_reproduce TEXT,
    expected_result TEXT,
    actual_result TEXT,
    environment TEXT,
    screenshots TEXT[] NOT NULL DEFAULT '{}',
    related_links JSONB NOT NULL DEFAULT '[]',
    labels TEXT[] NOT NULL DEFAULT '{}',
    epic_id TEXT REFERENCES epics(id) ON DELETE SET NULL,
    sprint_id TEXT REFERENCES sprints(id) ON DELETE SET NULL,
    due_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT issues_project_seq_unique UNIQUE (project_id, bug_seq),
    CONSTRAINT issues_project_bug_id_unique UNIQUE (project_id, bug_id)
);

CREATE INDEX IF NOT EXISTS idx_issues_assigned_to ON issues(assigned_to);
CREATE INDEX IF NOT EXISTS idx_issues_sprint ON issues(sprint_id);
CREATE INDEX IF NOT EXISTS idx_issues_epic ON issues(epic_id);
CREATE INDEX IF NOT EXISTS idx_issues_project_status ON issues(project_id, status);
CREATE INDEX IF NOT EXISTS idx_issues_labels ON issues USING GIN (labels);

-- =============================================================================
-- 6. Issue children: comments and watchers
-- =============================================================================
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
    user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    content TEXT NOT NULL CHECK(length(content) >= 1),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_comments_issue ON comments(issue_id, created_at);

CREATE TABLE IF NOT EXISTS issue_watchers (
    issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (issue_id, user_id)
);

-- =============================================================================
-- 7. Activities (append-only)
-- =============================================================================
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    action TEXT NOT NULL,
    details TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_activities_project ON activities(project_id, created_at DESC);

-- =============================================================================
-- 8. Reference data: labels and issue types
-- =============================================================================
CREATE TABLE IF NOT EXISTS labels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CONSTRAINT labels_name_unique UNIQUE CHECK(length(name) >= 1),
    color TEXT,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS issue_types (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CONSTRAINT issue_types_name_unique UNIQUE CHECK(length(name) >= 1),
    icon TEXT,
    color TEXT,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// Default data inserted on initial schema creation
pub const DEFAULT_DATA: &str = r#"
INSERT INTO issue_types (id, name, icon, color, description) VALUES
    ('issuetype-bug', 'Bug', 'bug', '#ef4444', 'Something is not working'),
    ('issuetype-feature', 'Feature', 'star', '#3b82f6', 'New functionality'),
    ('issuetype-improvement', 'Improvement', 'trending-up', '#10b981', 'Enhancement of existing functionality'),
    ('issuetype-task', 'Task', 'check-square', '#6b7280', 'Work item')
ON CONFLICT DO NOTHING;
"#;

/// Unique constraints that a concurrent bug id allocation can trip
///
/// Bug ids are unique per project only: the suffix is a short slice of the
/// project id, so two projects may share it.
pub const BUG_ID_CONSTRAINTS: [&str; 2] = ["issues_project_bug_id_unique", "issues_project_seq_unique"];

/// Unique index on `LOWER(email)`
pub const USERS_EMAIL_UNIQUE: &str = "users_email_unique";

/// Unique constraint on label name
pub const LABELS_NAME_UNIQUE: &str = "labels_name_unique";

/// Unique constraint on issue type name
pub const ISSUE_TYPES_NAME_UNIQUE: &str = "issue_types_name_unique";

/// Migration 2: indexes backing the issue list filters
pub const MIGRATION_V2_ISSUE_FILTER_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_issues_assigned_to ON issues(assigned_to);
CREATE INDEX IF NOT EXISTS idx_issues_sprint ON issues(sprint_id);
CREATE INDEX IF NOT EXISTS idx_issues_epic ON issues(epic_id);
CREATE INDEX IF NOT EXISTS idx_issues_project_status ON issues(project_id, status);
CREATE INDEX IF NOT EXISTS idx_issues_labels ON issues USING GIN (labels);
"#;

/// Migration 3: case-insensitive email uniqueness, per-project bug ids
///
/// Emails are folded to lower case unless that would collide with another
/// account; remaining case-variant duplicates make the index build fail.
pub const MIGRATION_V3_EMAIL_AND_BUG_ID: &str = r#"
UPDATE users u SET email = LOWER(u.email)
WHERE u.email <> LOWER(u.email)
  AND NOT EXISTS (SELECT 1 FROM users o WHERE o.id <> u.id AND LOWER(o.email) = LOWER(u.email));
ALTER TABLE users DROP CONSTRAINT IF EXISTS users_email_unique;
CREATE UNIQUE INDEX IF NOT EXISTS users_email_unique ON users (LOWER(email));
ALTER TABLE issues DROP CONSTRAINT IF EXISTS issues_bug_id_unique;
ALTER TABLE issues ADD CONSTRAINT issues_project_bug_id_unique UNIQUE (project_id, bug_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_declares_named_constraints() {
        for name in BUG_ID_CONSTRAINTS
            .iter()
            .chain([USERS_EMAIL_UNIQUE, LABELS_NAME_UNIQUE, ISSUE_TYPES_NAME_UNIQUE].iter())
        {
            assert!(SCHEMA.contains(name), "missing constraint {}", name);
        }
    }

    #[test]
    fn test_migration_v2_indexes_are_in_schema() {
        for line in MIGRATION_V2_ISSUE_FILTER_INDEXES
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        {
            assert!(SCHEMA.contains(line), "schema missing: {}", line);
        }
    }

    #[test]
    fn test_migration_v3_matches_schema() {
        assert!(SCHEMA.contains("CREATE UNIQUE INDEX IF NOT EXISTS users_email_unique ON users (LOWER(email));"));
        assert!(SCHEMA.contains("CONSTRAINT issues_project_bug_id_unique UNIQUE (project_id, bug_id)"));
        assert!(!SCHEMA.contains("issues_bug_id_unique"));
        assert!(MIGRATION_V3_EMAIL_AND_BUG_ID.contains("users_email_unique ON users (LOWER(email))"));
        assert!(MIGRATION_V3_EMAIL_AND_BUG_ID.contains("issues_project_bug_id_unique"));
    }

    #[test]
    fn test_cascades_are_declared() {
        assert!(SCHEMA.contains("project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE"));
        assert!(SCHEMA.contains("issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE"));
        assert!(SCHEMA.contains("sprint_id TEXT REFERENCES sprints(id) ON DELETE SET NULL"));
    }
}
