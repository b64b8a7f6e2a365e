use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::AppError;

pub const MAX_TITLE_LENGTH: usize = 100;

/// Database model for goals table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct GoalModel {
    pub id: Uuid,
    pub child_id: Uuid,
    pub title: String,
    /// Stamps to earn from `created_at` onwards
    pub target_stamps: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalState {
    Active,
    Completed,
    Cancelled,
}

impl GoalModel {
    pub fn new(child_id: Uuid, title: &str, target_stamps: i32) -> Result<Self, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Goal title cannot be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(AppError::Validation(format!(
                "Goal title cannot exceed {MAX_TITLE_LENGTH} characters"
            )));
        }
        if target_stamps <= 0 {
            return Err(AppError::Validation(
                "Goal target must be a positive number of stamps".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            child_id,
            title: title.to_string(),
            target_stamps,
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
        })
    }

    pub fn state(&self) -> GoalState {
        if self.cancelled_at.is_some() {
            GoalState::Cancelled
        } else if self.completed_at.is_some() {
            GoalState::Completed
        } else {
            GoalState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == GoalState::Active
    }

    fn ensure_active(&self) -> Result<(), AppError> {
        if !self.is_active() {
            return Err(AppError::Conflict(format!("Goal {} is no longer active", self.id)));
        }
        Ok(())
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_active()?;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_active()?;
        self.cancelled_at = Some(at);
        Ok(())
    }
}
