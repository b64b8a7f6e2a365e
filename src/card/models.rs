use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::AppError;

/// A numbered card a child fills with stamps.
///
/// `target_stamps` is a snapshot of the child's setting when the card was
/// opened. Once completed a card never changes again.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StampCard {
    pub id: Uuid,
    pub child_id: Uuid,
    pub card_number: i32,
    pub target_stamps: i32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StampCard {
    pub fn new(child_id: Uuid, card_number: i32, target_stamps: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            child_id,
            card_number,
            target_stamps,
            is_completed: false,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// The card that follows this one, using the given target
    pub fn next(&self, target_stamps: i32) -> Self {
        Self::new(self.child_id, self.card_number + 1, target_stamps)
    }

    /// Whether `progress` stamps fill this card
    pub fn is_full(&self, progress: i32) -> bool {
        progress >= self.target_stamps
    }

    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.is_completed {
            return Err(AppError::Conflict(format!(
                "Card #{} is already completed",
                self.card_number
            )));
        }
        Ok(())
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_open()?;
        self.is_completed = true;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Re-snapshots the target of an open card
    pub fn retarget(&mut self, target_stamps: i32) -> Result<(), AppError> {
        self.ensure_open()?;
        self.target_stamps = target_stamps;
        Ok(())
    }
}
