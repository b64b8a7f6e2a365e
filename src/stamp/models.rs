use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::AppError;

/// Database model for stamps table.
///
/// The reward is fixed at issuance; `opened_at` only records when it was
/// revealed.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StampModel {
    pub id: Uuid,
    pub child_id: Uuid,
    pub stamp_card_id: Option<Uuid>,
    pub reward_item_id: i32,
    pub stamped_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl StampModel {
    pub fn new(child_id: Uuid, reward_item_id: i32, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            child_id,
            stamp_card_id: None,
            reward_item_id,
            stamped_at: Utc::now(),
            opened_at: None,
            comment,
        }
    }

    pub fn is_opened(&self) -> bool {
        self.opened_at.is_some()
    }

    /// Records the reveal time. Returns false if the stamp was already open.
    pub fn open(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_opened() {
            return false;
        }
        self.opened_at = Some(at);
        true
    }

    /// Places the stamp on a card; the assignment never changes afterwards
    pub fn assign_to(&mut self, card_id: Uuid) -> Result<(), AppError> {
        match self.stamp_card_id {
            Some(existing) if existing == card_id => Ok(()),
            Some(_) => Err(AppError::Conflict(format!(
                "Stamp {} is already assigned to a card",
                self.id
            ))),
            None => {
                self.stamp_card_id = Some(card_id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_idempotent() {
        let mut stamp = StampModel::new(Uuid::new_v4(), 25, None);
        let first = Utc::now();

        assert!(stamp.open(first));
        assert!(!stamp.open(first + chrono::Duration::minutes(5)));
        assert_eq!(stamp.opened_at, Some(first));
    }

    #[test]
    fn test_assignment_is_immutable() {
        let mut stamp = StampModel::new(Uuid::new_v4(), 25, None);
        let card = Uuid::new_v4();

        stamp.assign_to(card).unwrap();
        stamp.assign_to(card).unwrap();
        assert!(matches!(
            stamp.assign_to(Uuid::new_v4()),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(stamp.stamp_card_id, Some(card));
    }
}
