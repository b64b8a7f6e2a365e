use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::family::FamilyId;
use crate::shared::AppError;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_TARGET_STAMPS: i32 = 1;
pub const MAX_TARGET_STAMPS: i32 = 100;

/// Database model for children table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ChildModel {
    pub id: Uuid,
    pub family_id: i64,
    pub name: String,
    /// Stamps per card; snapshotted onto each new card
    pub target_stamps: i32,
    pub created_at: DateTime<Utc>,
}

impl ChildModel {
    /// Creates a child after validating name and target
    pub fn new(family: FamilyId, name: &str, target_stamps: i32) -> Result<Self, AppError> {
        Ok(Self {
            id: Uuid::new_v4(),
            family_id: family.0,
            name: validate_name(name)?,
            target_stamps: validate_target_stamps(target_stamps)?,
            created_at: Utc::now(),
        })
    }
}

/// Trims the name and checks its length
pub fn validate_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Child name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Child name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_target_stamps(target_stamps: i32) -> Result<i32, AppError> {
    if !(MIN_TARGET_STAMPS..=MAX_TARGET_STAMPS).contains(&target_stamps) {
        return Err(AppError::Validation(format!(
            "Target stamps must be between {MIN_TARGET_STAMPS} and {MAX_TARGET_STAMPS}"
        )));
    }
    Ok(target_stamps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_child_trims_name() {
        let child = ChildModel::new(FamilyId(1), "  Ash  ", 10).unwrap();
        assert_eq!(child.name, "Ash");
        assert_eq!(child.family_id, 1);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("a-name-that-is-definitely-longer-than-fifty-characters-in-total")]
    fn test_invalid_names(#[case] name: &str) {
        assert!(matches!(
            ChildModel::new(FamilyId(1), name, 10),
            Err(AppError::Validation(_))
        ));
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(100, true)]
    #[case(101, false)]
    #[case(-3, false)]
    fn test_target_stamp_bounds(#[case] target: i32, #[case] valid: bool) {
        assert_eq!(validate_target_stamps(target).is_ok(), valid);
    }
}
