mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Department operations
    fn create_department(&self, department: &Department) -> Result<()>;
    fn upsert_department(&self, department: &Department) -> Result<()>;
    fn get_department(&self, id: &str) -> Result<Option<Department>>;
    fn list_departments(&self, cursor: &str, limit: i32) -> Result<Vec<Department>>;
    fn list_departments_by_ids(&self, ids: &[String]) -> Result<Vec<Department>>;
    fn delete_department(&self, id: &str) -> Result<bool>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(
        &self,
        search: Option<&str>,
        department_id: Option<&str>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<User>>;
    fn has_admin_user(&self) -> Result<bool>;

    // Department admin link operations
    fn create_department_admin(&self, link: &DepartmentAdmin) -> Result<()>;
    fn get_department_admin(&self, id: &str) -> Result<Option<DepartmentAdmin>>;
    fn list_department_admins(&self, cursor: &str, limit: i32) -> Result<Vec<DepartmentAdmin>>;
    fn list_department_admins_in_departments(
        &self,
        department_ids: &[String],
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<DepartmentAdmin>>;
    fn list_user_department_admins(&self, user_id: &str) -> Result<Vec<DepartmentAdmin>>;
    fn delete_department_admin(&self, id: &str) -> Result<bool>;

    // Program operations
    fn upsert_program(&self, program: &Program) -> Result<()>;
    fn get_program(&self, id: &str) -> Result<Option<Program>>;
    fn list_programs(&self, include_disabled: bool, cursor: &str, limit: i32)
    -> Result<Vec<Program>>;
    fn set_program_enabled(&self, id: &str, enabled: bool) -> Result<()>;

    // Study track operations
    fn upsert_study_track(&self, track: &StudyTrack) -> Result<()>;
    fn get_study_track(&self, id: &str) -> Result<Option<StudyTrack>>;
    fn list_program_study_tracks(&self, program_id: &str) -> Result<Vec<StudyTrack>>;

    // Program management link operations
    fn create_program_management(&self, link: &ProgramManagement) -> Result<()>;
    fn get_program_management(&self, id: &str) -> Result<Option<ProgramManagement>>;
    fn list_program_managements(&self, cursor: &str, limit: i32)
    -> Result<Vec<ProgramManagement>>;
    fn list_program_managements_in_programs(
        &self,
        program_ids: &[String],
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<ProgramManagement>>;
    fn list_user_program_managements(&self, user_id: &str) -> Result<Vec<ProgramManagement>>;
    fn delete_program_management(&self, id: &str) -> Result<bool>;

    // Thesis operations
    fn create_thesis(&self, thesis: &Thesis) -> Result<()>;
    fn get_thesis(&self, id: &str) -> Result<Option<Thesis>>;
    fn list_theses(
        &self,
        status: Option<ThesisStatus>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Thesis>>;
    fn list_theses_in_programs(
        &self,
        program_ids: &[String],
        status: Option<ThesisStatus>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Thesis>>;
    fn list_theses_supervised_by(
        &self,
        user_id: &str,
        status: Option<ThesisStatus>,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<Thesis>>;
    fn update_thesis(&self, thesis: &Thesis) -> Result<()>;
    fn delete_thesis(&self, id: &str) -> Result<bool>;

    // Supervision and grader operations (replaced as a set per thesis)
    fn set_thesis_supervisions(&self, thesis_id: &str, supervisions: &[Supervision])
    -> Result<()>;
    fn list_thesis_supervisions(&self, thesis_id: &str) -> Result<Vec<Supervision>>;
    fn set_thesis_graders(&self, thesis_id: &str, graders: &[Grader]) -> Result<()>;
    fn list_thesis_graders(&self, thesis_id: &str) -> Result<Vec<Grader>>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn update_session_last_used(&self, id: &str) -> Result<()>;
    fn delete_expired_sessions(&self) -> Result<usize>;
}
