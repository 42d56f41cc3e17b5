use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
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

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
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

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::error!("Invalid date in database: '{}' - {}", s, e);
            None
        }
    }
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_name(s: &str) -> LocalizedName {
    serde_json::from_str(s).unwrap_or_else(|e| {
        tracing::error!("Invalid localized name in database: '{}' - {}", s, e);
        LocalizedName::default()
    })
}

fn format_name(name: &LocalizedName) -> String {
    serde_json::to_string(name).unwrap_or_else(|_| "{}".to_string())
}

fn parse_status(s: &str) -> ThesisStatus {
    ThesisStatus::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid thesis status in database: '{}'", s);
        ThesisStatus::Planning
    })
}

/// Maps unique-constraint violations to AlreadyExists so handlers can
/// answer 409 instead of 500.
fn map_insert_err(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::AlreadyExists
        }
        _ => Error::from(e),
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Department operations

    fn create_department(&self, department: &Department) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO departments (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![
                    department.id,
                    format_name(&department.name),
                    format_datetime(&department.created_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn upsert_department(&self, department: &Department) -> Result<()> {
        self.conn().execute(
            "INSERT INTO departments (id, name, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![
                department.id,
                format_name(&department.name),
                format_datetime(&department.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_department(&self, id: &str) -> Result<Option<Department>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM departments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Department {
                    id: row.get(0)?,
                    name: parse_name(&row.get::<_, String>(1)?),
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_departments(&self, cursor: &str, limit: i32) -> Result<Vec<Department>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at FROM departments WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], |row| {
            Ok(Department {
                id: row.get(0)?,
                name: parse_name(&row.get::<_, String>(1)?),
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_departments_by_ids(&self, ids: &[String]) -> Result<Vec<Department>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, name, created_at FROM departments WHERE id IN ({placeholders}) ORDER BY id"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let bind: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();

        let rows = stmt.query_map(&bind[..], |row| {
            Ok(Department {
                id: row.get(0)?,
                name: parse_name(&row.get::<_, String>(1)?),
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_department(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM departments WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, username, first_name, last_name, email, department_id, is_admin, is_manual_admin, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user.id,
                    user.username,
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.department_id,
                    user.is_admin,
                    user.is_manual_admin,
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET first_name = ?1, last_name = ?2, email = ?3, department_id = ?4,
                 is_admin = ?5, is_manual_admin = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                user.first_name,
                user.last_name,
                user.email,
                user.department_id,
                user.is_admin,
                user.is_manual_admin,
                format_datetime(&user.updated_at),
                user.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, first_name, last_name, email, department_id, is_admin, is_manual_admin, created_at, updated_at
             FROM users WHERE id = ?1",
            params![id],
            map_user_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, first_name, last_name, email, department_id, is_admin, is_manual_admin, created_at, updated_at
             FROM users WHERE username = ?1",
            params![username],
            map_user_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(
        &self,
        search: Option<&str>,
        department_id: Option<&str>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<User>> {
        // Filters go into the query so LIMIT applies to matching rows, not
        // to the scan. Bind order follows clause order.
        let mut sql = String::from(
            "SELECT id, username, first_name, last_name, email, department_id, is_admin, is_manual_admin, created_at, updated_at
             FROM users WHERE id > ?",
        );
        let mut bind: Vec<&dyn ToSql> = vec![&cursor];

        let pattern = search.map(|term| format!("%{term}%"));
        if let Some(pattern) = &pattern {
            sql.push_str(
                " AND (username LIKE ? OR first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)",
            );
            bind.extend([pattern as &dyn ToSql, pattern, pattern, pattern]);
        }
        if let Some(department_id) = &department_id {
            sql.push_str(" AND department_id = ?");
            bind.push(department_id);
        }
        sql.push_str(" ORDER BY id LIMIT ?");
        bind.push(&limit);

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&bind[..], map_user_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Department admin link operations

    fn create_department_admin(&self, link: &DepartmentAdmin) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO department_admins (id, department_id, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    link.id,
                    link.department_id,
                    link.user_id,
                    format_datetime(&link.created_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_department_admin(&self, id: &str) -> Result<Option<DepartmentAdmin>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, department_id, user_id, created_at FROM department_admins WHERE id = ?1",
            params![id],
            map_department_admin_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_department_admins(&self, cursor: &str, limit: i32) -> Result<Vec<DepartmentAdmin>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, department_id, user_id, created_at
             FROM department_admins WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cursor, limit], map_department_admin_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_department_admins_in_departments(
        &self,
        department_ids: &[String],
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<DepartmentAdmin>> {
        if department_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; department_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, department_id, user_id, created_at
             FROM department_admins WHERE department_id IN ({placeholders}) AND id > ? ORDER BY id LIMIT ?"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let mut bind: Vec<&dyn ToSql> = department_ids.iter().map(|id| id as &dyn ToSql).collect();
        bind.push(&cursor);
        bind.push(&limit);

        let rows = stmt.query_map(&bind[..], map_department_admin_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_department_admins(&self, user_id: &str) -> Result<Vec<DepartmentAdmin>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, department_id, user_id, created_at
             FROM department_admins WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], map_department_admin_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_department_admin(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM department_admins WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Program operations

    fn upsert_program(&self, program: &Program) -> Result<()> {
        self.conn().execute(
            "INSERT INTO programs (id, name, level, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 level = excluded.level,
                 updated_at = excluded.updated_at",
            params![
                program.id,
                format_name(&program.name),
                program.level,
                program.enabled,
                format_datetime(&program.created_at),
                format_datetime(&program.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_program(&self, id: &str) -> Result<Option<Program>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, level, enabled, created_at, updated_at FROM programs WHERE id = ?1",
            params![id],
            map_program_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_programs(
        &self,
        include_disabled: bool,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Program>> {
        let conn = self.conn();
        let sql = if include_disabled {
            "SELECT id, name, level, enabled, created_at, updated_at
             FROM programs WHERE id > ?1 ORDER BY id LIMIT ?2"
        } else {
            "SELECT id, name, level, enabled, created_at, updated_at
             FROM programs WHERE enabled = 1 AND id > ?1 ORDER BY id LIMIT ?2"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![cursor, limit], map_program_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_program_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE programs SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
            params![enabled, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Study track operations

    fn upsert_study_track(&self, track: &StudyTrack) -> Result<()> {
        self.conn().execute(
            "INSERT INTO study_tracks (id, program_id, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET program_id = excluded.program_id, name = excluded.name",
            params![track.id, track.program_id, format_name(&track.name)],
        )?;
        Ok(())
    }

    fn get_study_track(&self, id: &str) -> Result<Option<StudyTrack>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, program_id, name FROM study_tracks WHERE id = ?1",
            params![id],
            |row| {
                Ok(StudyTrack {
                    id: row.get(0)?,
                    program_id: row.get(1)?,
                    name: parse_name(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_program_study_tracks(&self, program_id: &str) -> Result<Vec<StudyTrack>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, program_id, name FROM study_tracks WHERE program_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![program_id], |row| {
            Ok(StudyTrack {
                id: row.get(0)?,
                program_id: row.get(1)?,
                name: parse_name(&row.get::<_, String>(2)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Program management link operations

    fn create_program_management(&self, link: &ProgramManagement) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO program_managements (id, program_id, user_id, is_thesis_approver, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    link.id,
                    link.program_id,
                    link.user_id,
                    link.is_thesis_approver,
                    format_datetime(&link.created_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_program_management(&self, id: &str) -> Result<Option<ProgramManagement>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, program_id, user_id, is_thesis_approver, created_at
             FROM program_managements WHERE id = ?1",
            params![id],
            map_program_management_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_program_managements(
        &self,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<ProgramManagement>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, program_id, user_id, is_thesis_approver, created_at
             FROM program_managements WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cursor, limit], map_program_management_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_program_managements_in_programs(
        &self,
        program_ids: &[String],
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<ProgramManagement>> {
        if program_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; program_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, program_id, user_id, is_thesis_approver, created_at
             FROM program_managements WHERE program_id IN ({placeholders}) AND id > ? ORDER BY id LIMIT ?"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let mut bind: Vec<&dyn ToSql> = program_ids.iter().map(|id| id as &dyn ToSql).collect();
        bind.push(&cursor);
        bind.push(&limit);

        let rows = stmt.query_map(&bind[..], map_program_management_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_program_managements(&self, user_id: &str) -> Result<Vec<ProgramManagement>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, program_id, user_id, is_thesis_approver, created_at
             FROM program_managements WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], map_program_management_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_program_management(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM program_managements WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Thesis operations

    fn create_thesis(&self, thesis: &Thesis) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO theses (id, program_id, study_track_id, topic, status, started_date, target_date, ethesis_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    thesis.id,
                    thesis.program_id,
                    thesis.study_track_id,
                    thesis.topic,
                    thesis.status.as_str(),
                    thesis.started_date.as_ref().map(format_date),
                    thesis.target_date.as_ref().map(format_date),
                    thesis.ethesis_date.as_ref().map(format_date),
                    format_datetime(&thesis.created_at),
                    format_datetime(&thesis.updated_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_thesis(&self, id: &str) -> Result<Option<Thesis>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, program_id, study_track_id, topic, status, started_date, target_date, ethesis_date, created_at, updated_at
             FROM theses WHERE id = ?1",
            params![id],
            map_thesis_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_theses(
        &self,
        status: Option<ThesisStatus>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Thesis>> {
        // Status filtering happens before LIMIT so a page is a page of
        // matching rows, same as the enabled filter in list_programs.
        let conn = self.conn();
        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT id, program_id, study_track_id, topic, status, started_date, target_date, ethesis_date, created_at, updated_at
                     FROM theses WHERE status = ?1 AND id > ?2 ORDER BY id LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![status.as_str(), cursor, limit], map_thesis_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, program_id, study_track_id, topic, status, started_date, target_date, ethesis_date, created_at, updated_at
                     FROM theses WHERE id > ?1 ORDER BY id LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![cursor, limit], map_thesis_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
        };
        rows.map_err(Error::from)
    }

    fn list_theses_in_programs(
        &self,
        program_ids: &[String],
        status: Option<ThesisStatus>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Thesis>> {
        if program_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; program_ids.len()].join(", ");
        let status_clause = if status.is_some() {
            " AND status = ?"
        } else {
            ""
        };
        let sql = format!(
            "SELECT id, program_id, study_track_id, topic, status, started_date, target_date, ethesis_date, created_at, updated_at
             FROM theses WHERE program_id IN ({placeholders}){status_clause} AND id > ? ORDER BY id LIMIT ?"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;

        let status_str = status.map(|s| s.as_str());
        let mut bind: Vec<&dyn ToSql> = program_ids.iter().map(|id| id as &dyn ToSql).collect();
        if let Some(status_str) = &status_str {
            bind.push(status_str);
        }
        bind.push(&cursor);
        bind.push(&limit);

        let rows = stmt.query_map(&bind[..], map_thesis_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_theses_supervised_by(
        &self,
        user_id: &str,
        status: Option<ThesisStatus>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Thesis>> {
        let conn = self.conn();
        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT t.id, t.program_id, t.study_track_id, t.topic, t.status, t.started_date, t.target_date, t.ethesis_date, t.created_at, t.updated_at
                     FROM theses t
                     JOIN supervisions s ON s.thesis_id = t.id
                     WHERE s.user_id = ?1 AND t.status = ?2 AND t.id > ?3
                     ORDER BY t.id LIMIT ?4",
                )?;
                let rows = stmt.query_map(
                    params![user_id, status.as_str(), cursor, limit],
                    map_thesis_row,
                )?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT t.id, t.program_id, t.study_track_id, t.topic, t.status, t.started_date, t.target_date, t.ethesis_date, t.created_at, t.updated_at
                     FROM theses t
                     JOIN supervisions s ON s.thesis_id = t.id
                     WHERE s.user_id = ?1 AND t.id > ?2
                     ORDER BY t.id LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![user_id, cursor, limit], map_thesis_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
            }
        };
        rows.map_err(Error::from)
    }

    fn update_thesis(&self, thesis: &Thesis) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE theses SET program_id = ?1, study_track_id = ?2, topic = ?3, status = ?4,
                 started_date = ?5, target_date = ?6, ethesis_date = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                thesis.program_id,
                thesis.study_track_id,
                thesis.topic,
                thesis.status.as_str(),
                thesis.started_date.as_ref().map(format_date),
                thesis.target_date.as_ref().map(format_date),
                thesis.ethesis_date.as_ref().map(format_date),
                format_datetime(&thesis.updated_at),
                thesis.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_thesis(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM theses WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Supervision and grader operations

    fn set_thesis_supervisions(
        &self,
        thesis_id: &str,
        supervisions: &[Supervision],
    ) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM supervisions WHERE thesis_id = ?1",
            params![thesis_id],
        )?;
        for supervision in supervisions {
            tx.execute(
                "INSERT INTO supervisions (thesis_id, user_id, percentage, is_primary_supervisor)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    thesis_id,
                    supervision.user_id,
                    supervision.percentage,
                    supervision.is_primary_supervisor,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_thesis_supervisions(&self, thesis_id: &str) -> Result<Vec<Supervision>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT thesis_id, user_id, percentage, is_primary_supervisor
             FROM supervisions WHERE thesis_id = ?1 ORDER BY user_id",
        )?;
        let rows = stmt.query_map(params![thesis_id], |row| {
            Ok(Supervision {
                thesis_id: row.get(0)?,
                user_id: row.get(1)?,
                percentage: row.get(2)?,
                is_primary_supervisor: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_thesis_graders(&self, thesis_id: &str, graders: &[Grader]) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM graders WHERE thesis_id = ?1", params![thesis_id])?;
        for grader in graders {
            tx.execute(
                "INSERT INTO graders (thesis_id, user_id, is_primary_grader)
                 VALUES (?1, ?2, ?3)",
                params![thesis_id, grader.user_id, grader.is_primary_grader],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_thesis_graders(&self, thesis_id: &str) -> Result<Vec<Grader>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT thesis_id, user_id, is_primary_grader
             FROM graders WHERE thesis_id = ?1 ORDER BY user_id",
        )?;
        let rows = stmt.query_map(params![thesis_id], |row| {
            Ok(Grader {
                thesis_id: row.get(0)?,
                user_id: row.get(1)?,
                is_primary_grader: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO sessions (id, token_hash, token_lookup, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.id,
                    session.token_hash,
                    session.token_lookup,
                    session.user_id,
                    format_datetime(&session.created_at),
                    format_datetime(&session.expires_at),
                ],
            )
            .map_err(|e| match map_insert_err(e) {
                Error::AlreadyExists => Error::SessionLookupCollision,
                other => other,
            })?;
        Ok(())
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM sessions WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: parse_datetime(&row.get::<_, String>(5)?),
                    last_used_at: row
                        .get::<_, Option<String>>(6)?
                        .map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_session_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_expired_sessions(&self) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![format_datetime(&Utc::now())],
        )?;
        Ok(rows)
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        department_id: row.get(5)?,
        is_admin: row.get(6)?,
        is_manual_admin: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn map_department_admin_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DepartmentAdmin> {
    Ok(DepartmentAdmin {
        id: row.get(0)?,
        department_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn map_program_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Program> {
    Ok(Program {
        id: row.get(0)?,
        name: parse_name(&row.get::<_, String>(1)?),
        level: row.get(2)?,
        enabled: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn map_program_management_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgramManagement> {
    Ok(ProgramManagement {
        id: row.get(0)?,
        program_id: row.get(1)?,
        user_id: row.get(2)?,
        is_thesis_approver: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn map_thesis_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thesis> {
    Ok(Thesis {
        id: row.get(0)?,
        program_id: row.get(1)?,
        study_track_id: row.get(2)?,
        topic: row.get(3)?,
        status: parse_status(&row.get::<_, String>(4)?),
        started_date: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| parse_date(&s)),
        target_date: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| parse_date(&s)),
        ethesis_date: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| parse_date(&s)),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::new(":memory:").unwrap();
        store.initialize().unwrap();
        store
    }

    fn test_user(username: &str, is_admin: bool) -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            first_name: None,
            last_name: None,
            email: None,
            department_id: None,
            is_admin,
            is_manual_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_department(name_en: &str) -> Department {
        Department {
            id: uuid::Uuid::new_v4().to_string(),
            name: LocalizedName {
                en: Some(name_en.to_string()),
                ..Default::default()
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_roundtrip_and_username_lookup() {
        let store = test_store();
        let user = test_user("akorhone", false);
        store.create_user(&user).unwrap();

        let found = store.get_user_by_username("akorhone").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(!found.is_admin);
        assert!(!store.has_admin_user().unwrap());

        store.create_user(&test_user("root", true)).unwrap();
        assert!(store.has_admin_user().unwrap());
    }

    #[test]
    fn test_duplicate_username_is_already_exists() {
        let store = test_store();
        store.create_user(&test_user("akorhone", false)).unwrap();
        let err = store.create_user(&test_user("akorhone", false)).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
    }

    #[test]
    fn test_department_admin_link_uniqueness() {
        let store = test_store();
        let department = test_department("Mathematics");
        let user = test_user("akorhone", false);
        store.create_department(&department).unwrap();
        store.create_user(&user).unwrap();

        let link = DepartmentAdmin {
            id: uuid::Uuid::new_v4().to_string(),
            department_id: department.id.clone(),
            user_id: user.id.clone(),
            created_at: Utc::now(),
        };
        store.create_department_admin(&link).unwrap();

        let duplicate = DepartmentAdmin {
            id: uuid::Uuid::new_v4().to_string(),
            ..link.clone()
        };
        assert!(matches!(
            store.create_department_admin(&duplicate).unwrap_err(),
            Error::AlreadyExists
        ));

        let for_user = store.list_user_department_admins(&user.id).unwrap();
        assert_eq!(for_user.len(), 1);
        assert_eq!(for_user[0].department_id, department.id);
    }

    #[test]
    fn test_thesis_with_supervisions_roundtrip() {
        let store = test_store();
        let now = Utc::now();

        let program = Program {
            id: "cs-msc".into(),
            name: LocalizedName {
                en: Some("Computer Science".into()),
                ..Default::default()
            },
            level: "master".into(),
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        store.upsert_program(&program).unwrap();

        let alice = test_user("alice", false);
        let bob = test_user("bob", false);
        store.create_user(&alice).unwrap();
        store.create_user(&bob).unwrap();

        let thesis = Thesis {
            id: uuid::Uuid::new_v4().to_string(),
            program_id: program.id.clone(),
            study_track_id: None,
            topic: "Topic".into(),
            status: ThesisStatus::Planning,
            started_date: Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()),
            target_date: None,
            ethesis_date: None,
            created_at: now,
            updated_at: now,
        };
        store.create_thesis(&thesis).unwrap();

        store
            .set_thesis_supervisions(
                &thesis.id,
                &[
                    Supervision {
                        thesis_id: thesis.id.clone(),
                        user_id: alice.id.clone(),
                        percentage: 60,
                        is_primary_supervisor: true,
                    },
                    Supervision {
                        thesis_id: thesis.id.clone(),
                        user_id: bob.id.clone(),
                        percentage: 40,
                        is_primary_supervisor: false,
                    },
                ],
            )
            .unwrap();

        let found = store.get_thesis(&thesis.id).unwrap().unwrap();
        assert_eq!(found.status, ThesisStatus::Planning);
        assert_eq!(
            found.started_date,
            Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
        );

        let supervisions = store.list_thesis_supervisions(&thesis.id).unwrap();
        assert_eq!(supervisions.len(), 2);
        assert_eq!(supervisions.iter().map(|s| s.percentage).sum::<i32>(), 100);

        let supervised = store
            .list_theses_supervised_by(&alice.id, None, "", 10)
            .unwrap();
        assert_eq!(supervised.len(), 1);

        let in_programs = store
            .list_theses_in_programs(&[program.id.clone()], None, "", 10)
            .unwrap();
        assert_eq!(in_programs.len(), 1);
        assert!(
            store
                .list_theses_in_programs(&["other".to_string()], None, "", 10)
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .list_theses_in_programs(
                    &[program.id.clone()],
                    Some(ThesisStatus::Cancelled),
                    "",
                    10
                )
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_thesis_status_filter_reaches_past_a_page_of_nonmatches() {
        let store = test_store();
        let now = Utc::now();

        let program = Program {
            id: "cs-msc".into(),
            name: LocalizedName::default(),
            level: "master".into(),
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        store.upsert_program(&program).unwrap();

        // 60 theses in id order, with a single CANCELLED one at position 55.
        for i in 0..60 {
            let status = if i == 54 {
                ThesisStatus::Cancelled
            } else {
                ThesisStatus::Planning
            };
            let thesis = Thesis {
                id: format!("t{i:03}"),
                program_id: program.id.clone(),
                study_track_id: None,
                topic: format!("Topic {i}"),
                status,
                started_date: None,
                target_date: None,
                ethesis_date: None,
                created_at: now,
                updated_at: now,
            };
            store.create_thesis(&thesis).unwrap();
        }

        let cancelled = store
            .list_theses(Some(ThesisStatus::Cancelled), "", 51)
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, "t054");

        let cancelled_in_program = store
            .list_theses_in_programs(
                &[program.id.clone()],
                Some(ThesisStatus::Cancelled),
                "",
                51,
            )
            .unwrap();
        assert_eq!(cancelled_in_program.len(), 1);
        assert_eq!(cancelled_in_program[0].id, "t054");
    }

    #[test]
    fn test_user_department_filter_reaches_past_a_page_of_nonmatches() {
        let store = test_store();
        let department = test_department("Physics");
        store.create_department(&department).unwrap();

        // 55 users in id order; only the 53rd belongs to the department.
        for i in 0..55 {
            let mut user = test_user(&format!("user{i:03}"), false);
            user.id = format!("u{i:03}");
            if i == 52 {
                user.department_id = Some(department.id.clone());
            }
            store.create_user(&user).unwrap();
        }

        let in_department = store
            .list_users(None, Some(&department.id), "", 51)
            .unwrap();
        assert_eq!(in_department.len(), 1);
        assert_eq!(in_department[0].id, "u052");

        // Search and department filters combine.
        let searched = store
            .list_users(Some("user052"), Some(&department.id), "", 51)
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert!(
            store
                .list_users(Some("user000"), Some(&department.id), "", 51)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_link_listing_paginates_and_scopes_by_department() {
        let store = test_store();
        let math = test_department("Mathematics");
        let physics = test_department("Physics");
        store.create_department(&math).unwrap();
        store.create_department(&physics).unwrap();

        for i in 0..3 {
            let user = test_user(&format!("user{i}"), false);
            store.create_user(&user).unwrap();
            let department = if i < 2 { &math } else { &physics };
            store
                .create_department_admin(&DepartmentAdmin {
                    id: format!("link{i}"),
                    department_id: department.id.clone(),
                    user_id: user.id.clone(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }

        let first = store.list_department_admins("", 2).unwrap();
        assert_eq!(first.len(), 2);
        let rest = store.list_department_admins(&first[1].id, 2).unwrap();
        assert_eq!(rest.len(), 1);

        let math_links = store
            .list_department_admins_in_departments(&[math.id.clone()], "", 10)
            .unwrap();
        assert_eq!(math_links.len(), 2);
        let math_rest = store
            .list_department_admins_in_departments(&[math.id.clone()], &math_links[0].id, 10)
            .unwrap();
        assert_eq!(math_rest.len(), 1);
        assert!(
            store
                .list_department_admins_in_departments(&[], "", 10)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_expired_session_cleanup() {
        let store = test_store();
        let user = test_user("akorhone", false);
        store.create_user(&user).unwrap();

        let now = Utc::now();
        let expired = Session {
            id: "s1".into(),
            token_hash: "hash".into(),
            token_lookup: "lookup01".into(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now - chrono::Duration::hours(1),
            last_used_at: None,
        };
        let live = Session {
            id: "s2".into(),
            token_hash: "hash".into(),
            token_lookup: "lookup02".into(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
            last_used_at: None,
        };
        store.create_session(&expired).unwrap();
        store.create_session(&live).unwrap();

        assert_eq!(store.delete_expired_sessions().unwrap(), 1);
        assert!(store.get_session_by_lookup("lookup01").unwrap().is_none());
        assert!(store.get_session_by_lookup("lookup02").unwrap().is_some());
    }
}
