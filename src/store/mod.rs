//! Persistence port for the stamp engine.
//!
//! Every read and write goes through a [`StoreTransaction`]. Dropping a
//! transaction without calling [`StoreTransaction::commit`] discards all of its
//! writes, so an early `?` return rolls back the whole operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::card::models::StampCard;
use crate::child::models::ChildModel;
use crate::family::FamilyId;
use crate::goal::models::GoalModel;
use crate::reward::RewardItem;
use crate::shared::AppError;
use crate::stamp::models::StampModel;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

mod memory;
mod postgres;

/// Opens transactions against the backing store
#[async_trait]
pub trait StampStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, AppError>;
}

/// Unit of work over children, cards, stamps, goals and the reward catalog
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_child(&mut self, child: &ChildModel) -> Result<(), AppError>;
    async fn get_child(
        &mut self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Option<ChildModel>, AppError>;

    /// Fetches the child and holds a write lock on it until the transaction
    /// ends, serializing concurrent writers for the same child
    async fn lock_child(
        &mut self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Option<ChildModel>, AppError>;
    async fn list_children(&mut self, family: FamilyId) -> Result<Vec<ChildModel>, AppError>;
    async fn update_child(&mut self, child: &ChildModel) -> Result<(), AppError>;

    /// Removes the child with its cards, stamps and goals. Returns false when
    /// no such child exists in the family.
    async fn delete_child(&mut self, family: FamilyId, child_id: Uuid) -> Result<bool, AppError>;

    async fn list_reward_items(&mut self) -> Result<Vec<RewardItem>, AppError>;
    async fn get_reward_item(&mut self, reward_id: i32) -> Result<Option<RewardItem>, AppError>;
    async fn upsert_reward_item(&mut self, item: &RewardItem) -> Result<(), AppError>;

    async fn find_open_card(&mut self, child_id: Uuid) -> Result<Option<StampCard>, AppError>;
    async fn last_card_number(&mut self, child_id: Uuid) -> Result<Option<i32>, AppError>;
    async fn insert_card(&mut self, card: &StampCard) -> Result<(), AppError>;

    /// Persists a card change. Fails with Conflict if the stored card is
    /// already completed.
    async fn update_card(&mut self, card: &StampCard) -> Result<(), AppError>;

    /// Cards ordered by card number
    async fn list_cards(&mut self, child_id: Uuid) -> Result<Vec<StampCard>, AppError>;
    async fn count_card_stamps(&mut self, card_id: Uuid) -> Result<i32, AppError>;

    async fn insert_stamp(&mut self, stamp: &StampModel) -> Result<(), AppError>;
    async fn get_stamp(&mut self, stamp_id: Uuid) -> Result<Option<StampModel>, AppError>;

    /// Attaches an unassigned stamp to an open card. Fails with Conflict when
    /// the stamp already has a card or the card is completed.
    async fn assign_stamp(&mut self, stamp_id: Uuid, card_id: Uuid) -> Result<(), AppError>;

    /// Sets `opened_at` if it is still empty and returns the stored stamp
    async fn mark_stamp_opened(
        &mut self,
        stamp_id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<StampModel, AppError>;

    /// Stamps ordered by `stamped_at`, oldest first
    async fn list_stamps(&mut self, child_id: Uuid) -> Result<Vec<StampModel>, AppError>;
    async fn list_unassigned_stamps(&mut self, child_id: Uuid)
        -> Result<Vec<StampModel>, AppError>;

    async fn insert_goal(&mut self, goal: &GoalModel) -> Result<(), AppError>;
    async fn find_active_goal(&mut self, child_id: Uuid) -> Result<Option<GoalModel>, AppError>;
    async fn update_goal(&mut self, goal: &GoalModel) -> Result<(), AppError>;

    /// Goals ordered newest first
    async fn list_goals(&mut self, child_id: Uuid) -> Result<Vec<GoalModel>, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
