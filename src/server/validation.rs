use std::collections::HashSet;

use crate::allocation::MAX_PARTICIPANTS;
use crate::server::dto::{GraderInput, SupervisionInput};
use crate::server::response::ApiError;
use crate::types::LocalizedName;

const MAX_TOPIC_LEN: usize = 500;

pub fn validate_topic(topic: &str) -> Result<(), ApiError> {
    if topic.trim().is_empty() {
        return Err(ApiError::bad_request("Topic cannot be empty"));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(ApiError::bad_request(format!(
            "Topic cannot exceed {MAX_TOPIC_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_localized_name(name: &LocalizedName) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request(
            "Name must carry at least one language",
        ));
    }
    Ok(())
}

/// Shape checks for a supervision set. The sum-to-100 invariant belongs to
/// the editing layer and is intentionally not re-checked here.
pub fn validate_supervisions(supervisions: &[SupervisionInput]) -> Result<(), ApiError> {
    if supervisions.is_empty() {
        return Err(ApiError::bad_request(
            "A thesis needs at least one supervisor",
        ));
    }
    if supervisions.len() > MAX_PARTICIPANTS {
        return Err(ApiError::bad_request(format!(
            "A thesis can have at most {MAX_PARTICIPANTS} supervisors"
        )));
    }

    let mut seen = HashSet::new();
    for supervision in supervisions {
        if !(0..=100).contains(&supervision.percentage) {
            return Err(ApiError::bad_request(
                "Supervision percentage must be between 0 and 100",
            ));
        }
        if !seen.insert(supervision.user_id.as_str()) {
            return Err(ApiError::bad_request(
                "A user can appear only once among supervisors",
            ));
        }
    }

    let primaries = supervisions
        .iter()
        .filter(|s| s.is_primary_supervisor)
        .count();
    if primaries != 1 {
        return Err(ApiError::bad_request(
            "Exactly one supervisor must be marked primary",
        ));
    }

    Ok(())
}

pub fn validate_graders(graders: &[GraderInput]) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for grader in graders {
        if !seen.insert(grader.user_id.as_str()) {
            return Err(ApiError::bad_request(
                "A user can appear only once among graders",
            ));
        }
    }
    if graders.iter().filter(|g| g.is_primary_grader).count() > 1 {
        return Err(ApiError::bad_request(
            "At most one grader can be marked primary",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervision(user_id: &str, percentage: i32, primary: bool) -> SupervisionInput {
        SupervisionInput {
            user_id: user_id.to_string(),
            percentage,
            is_primary_supervisor: primary,
        }
    }

    #[test]
    fn test_supervision_shape_accepts_sum_not_100() {
        // Shape only; the sum invariant is owned by the form editing layer.
        let set = [supervision("a", 50, true), supervision("b", 49, false)];
        assert!(validate_supervisions(&set).is_ok());
    }

    #[test]
    fn test_supervision_shape_rejections() {
        assert!(validate_supervisions(&[]).is_err());

        let out_of_range = [supervision("a", 101, true)];
        assert!(validate_supervisions(&out_of_range).is_err());

        let duplicate = [supervision("a", 50, true), supervision("a", 50, false)];
        assert!(validate_supervisions(&duplicate).is_err());

        let no_primary = [supervision("a", 100, false)];
        assert!(validate_supervisions(&no_primary).is_err());

        let too_many: Vec<_> = (0..6)
            .map(|i| supervision(&format!("u{i}"), 16, i == 0))
            .collect();
        assert!(validate_supervisions(&too_many).is_err());
    }

    #[test]
    fn test_topic_validation() {
        assert!(validate_topic("Distributed consensus in practice").is_ok());
        assert!(validate_topic("  ").is_err());
        assert!(validate_topic(&"x".repeat(501)).is_err());
    }
}
