pub const SCHEMA: &str = r#"
-- Academic departments; names are localized JSON objects
CREATE TABLE IF NOT EXISTS departments (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,          -- JSON: {"fi": ..., "en": ..., "sv": ...}
    created_at TEXT DEFAULT (datetime('now'))
);

-- Users are provisioned at first login from identity-provider headers
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    first_name TEXT,
    last_name TEXT,
    email TEXT,
    department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    is_manual_admin INTEGER NOT NULL DEFAULT 0,   -- promoted via `admin init`, not IAM
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Department admin links: department-scoped admin rights
CREATE TABLE IF NOT EXISTS department_admins (
    id TEXT PRIMARY KEY,
    department_id TEXT NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(department_id, user_id)
);

-- Degree programs, fed by the organisation directory sync
CREATE TABLE IF NOT EXISTS programs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,          -- JSON localized name
    level TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Study tracks within a program, also directory-fed
CREATE TABLE IF NOT EXISTS study_tracks (
    id TEXT PRIMARY KEY,
    program_id TEXT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
    name TEXT NOT NULL           -- JSON localized name
);

-- Program management links: program-scoped rights, optionally with
-- thesis-approval rights
CREATE TABLE IF NOT EXISTS program_managements (
    id TEXT PRIMARY KEY,
    program_id TEXT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    is_thesis_approver INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(program_id, user_id)
);

-- Theses
CREATE TABLE IF NOT EXISTS theses (
    id TEXT PRIMARY KEY,
    program_id TEXT NOT NULL REFERENCES programs(id),
    study_track_id TEXT REFERENCES study_tracks(id) ON DELETE SET NULL,
    topic TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PLANNING',
    started_date TEXT,
    target_date TEXT,
    ethesis_date TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Supervision shares; percentages sum to 100 per thesis, enforced by the
-- editing layer rather than a schema constraint
CREATE TABLE IF NOT EXISTS supervisions (
    thesis_id TEXT NOT NULL REFERENCES theses(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    percentage INTEGER NOT NULL DEFAULT 0,
    is_primary_supervisor INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (thesis_id, user_id)
);

-- Graders
CREATE TABLE IF NOT EXISTS graders (
    thesis_id TEXT NOT NULL REFERENCES theses(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    is_primary_grader INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (thesis_id, user_id)
);

-- Login sessions; only the argon2id hash of the token is stored
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,
    token_lookup TEXT NOT NULL,        -- first 8 chars, for fast lookup
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL,
    last_used_at TEXT
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_users_department ON users(department_id);
CREATE INDEX IF NOT EXISTS idx_department_admins_user ON department_admins(user_id);
CREATE INDEX IF NOT EXISTS idx_department_admins_department ON department_admins(department_id);
CREATE INDEX IF NOT EXISTS idx_study_tracks_program ON study_tracks(program_id);
CREATE INDEX IF NOT EXISTS idx_program_managements_user ON program_managements(user_id);
CREATE INDEX IF NOT EXISTS idx_program_managements_program ON program_managements(program_id);
CREATE INDEX IF NOT EXISTS idx_theses_program ON theses(program_id);
CREATE INDEX IF NOT EXISTS idx_supervisions_user ON supervisions(user_id);
CREATE INDEX IF NOT EXISTS idx_graders_user ON graders(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_lookup ON sessions(token_lookup);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
"#;
