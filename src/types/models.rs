use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Display name in the three university languages. Stored as JSON in the
/// database; any subset of the languages may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sv: Option<String>,
}

impl LocalizedName {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fi.is_none() && self.en.is_none() && self.sv.is_none()
    }
}

/// Lifecycle status of a thesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThesisStatus {
    Planning,
    InProgress,
    Completed,
    Cancelled,
    Ethesis,
    EthesisSent,
}

impl ThesisStatus {
    /// Database representation; matches the JSON wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "PLANNING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Ethesis => "ETHESIS",
            Self::EthesisSent => "ETHESIS_SENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLANNING" => Some(Self::Planning),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            "ETHESIS" => Some(Self::Ethesis),
            "ETHESIS_SENT" => Some(Self::EthesisSent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: LocalizedName,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    pub is_admin: bool,
    /// Promoted by an operator rather than IAM group membership; login
    /// never demotes these users.
    #[serde(skip)]
    pub is_manual_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grants a user admin rights scoped to one department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentAdmin {
    pub id: String,
    pub department_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: LocalizedName,
    pub level: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyTrack {
    pub id: String,
    pub program_id: String,
    pub name: LocalizedName,
}

/// Grants a user management rights scoped to one program. Approvers may
/// additionally perform approval-gated actions within that program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramManagement {
    pub id: String,
    pub program_id: String,
    pub user_id: String,
    pub is_thesis_approver: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thesis {
    pub id: String,
    pub program_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_track_id: Option<String>,
    pub topic: String,
    pub status: ThesisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethesis_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One supervisor's share of responsibility for a thesis. Shares for a
/// thesis sum to 100, enforced during editing rather than in the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supervision {
    pub thesis_id: String,
    pub user_id: String,
    pub percentage: i32,
    pub is_primary_supervisor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grader {
    pub thesis_id: String,
    pub user_id: String,
    pub is_primary_grader: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThesisWithRelations {
    #[serde(flatten)]
    pub thesis: Thesis,
    pub supervisions: Vec<Supervision>,
    pub graders: Vec<Grader>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ThesisStatus::Planning,
            ThesisStatus::InProgress,
            ThesisStatus::Completed,
            ThesisStatus::Cancelled,
            ThesisStatus::Ethesis,
            ThesisStatus::EthesisSent,
        ] {
            assert_eq!(ThesisStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ThesisStatus::parse("DONE"), None);
    }

    #[test]
    fn test_status_wire_form_matches_db_form() {
        let json = serde_json::to_string(&ThesisStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
