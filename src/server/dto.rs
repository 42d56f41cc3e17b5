use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{LocalizedName, ThesisStatus, User};

/// Distinguishes an absent field from an explicit `null`: absent stays
/// `None`, present (null or a value) becomes `Some(..)`. Lets PATCH-style
/// updates clear a nullable field.
fn some_if_present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListDepartmentsParams {
    #[serde(default)]
    pub include_not_managed: Option<bool>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: LocalizedName,
}

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentAdminRequest {
    pub department_id: String,
    pub user_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProgramsParams {
    #[serde(default)]
    pub include_disabled: Option<bool>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProgramRequest {
    pub id: Option<String>,
    pub name: LocalizedName,
    pub level: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgramRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateProgramManagementRequest {
    pub program_id: String,
    pub user_id: String,
    #[serde(default)]
    pub is_thesis_approver: bool,
}

#[derive(Debug, Deserialize)]
pub struct SupervisionInput {
    pub user_id: String,
    pub percentage: i32,
    #[serde(default)]
    pub is_primary_supervisor: bool,
}

#[derive(Debug, Deserialize)]
pub struct GraderInput {
    pub user_id: String,
    #[serde(default)]
    pub is_primary_grader: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateThesisRequest {
    pub program_id: String,
    #[serde(default)]
    pub study_track_id: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub status: Option<ThesisStatus>,
    #[serde(default)]
    pub started_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub ethesis_date: Option<NaiveDate>,
    pub supervisions: Vec<SupervisionInput>,
    #[serde(default)]
    pub graders: Vec<GraderInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThesisRequest {
    #[serde(default)]
    pub program_id: Option<String>,
    #[serde(default)]
    pub study_track_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub status: Option<ThesisStatus>,
    #[serde(default, deserialize_with = "some_if_present")]
    pub started_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "some_if_present")]
    pub target_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "some_if_present")]
    pub ethesis_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub supervisions: Option<Vec<SupervisionInput>>,
    #[serde(default)]
    pub graders: Option<Vec<GraderInput>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListThesesParams {
    #[serde(default)]
    pub status: Option<ThesisStatus>,
    #[serde(default)]
    pub cursor: Option<String>,
}
