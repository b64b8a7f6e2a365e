use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{StampStore, StoreTransaction};
use crate::card::models::StampCard;
use crate::child::models::ChildModel;
use crate::family::FamilyId;
use crate::goal::models::GoalModel;
use crate::reward::{default_catalog, RewardItem};
use crate::shared::AppError;
use crate::stamp::models::StampModel;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    children: HashMap<Uuid, ChildModel>,
    rewards: BTreeMap<i32, RewardItem>,
    cards: Vec<StampCard>,
    stamps: Vec<StampModel>,
    goals: Vec<GoalModel>,
}

/// In-memory implementation of StampStore for development and testing
///
/// A transaction holds the single state lock for its whole lifetime and works
/// on a private copy that replaces the shared state on commit, so writers are
/// serialized and an uncommitted transaction leaves no trace.
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with no reward catalog
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Creates a store with the given reward catalog
    pub fn with_catalog(items: Vec<RewardItem>) -> Self {
        let state = MemoryState {
            rewards: items.into_iter().map(|item| (item.id, item)).collect(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_default_catalog() -> Self {
        Self::with_catalog(default_catalog())
    }

    /// Returns the number of committed stamps
    pub async fn stamp_count(&self) -> usize {
        self.state.lock().await.stamps.len()
    }

    /// Returns the number of committed cards
    pub async fn card_count(&self) -> usize {
        self.state.lock().await.cards.len()
    }

    /// Inserts a stamp that bypasses card assignment, as imported legacy data would
    pub async fn insert_legacy_stamp(&self, stamp: StampModel) {
        self.state.lock().await.stamps.push(stamp);
    }
}

#[async_trait]
impl StampStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, AppError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl InMemoryTransaction {
    fn child_in_family(&self, family: FamilyId, child_id: Uuid) -> Option<ChildModel> {
        self.working
            .children
            .get(&child_id)
            .filter(|child| child.family_id == family.0)
            .cloned()
    }

    fn card_mut(&mut self, card_id: Uuid) -> Result<&mut StampCard, AppError> {
        self.working
            .cards
            .iter_mut()
            .find(|card| card.id == card_id)
            .ok_or_else(|| AppError::NotFound("Card not found".to_string()))
    }

    fn stamp_mut(&mut self, stamp_id: Uuid) -> Result<&mut StampModel, AppError> {
        self.working
            .stamps
            .iter_mut()
            .find(|stamp| stamp.id == stamp_id)
            .ok_or_else(|| AppError::NotFound("Stamp not found".to_string()))
    }

    fn sorted_stamps<F>(&self, filter: F) -> Vec<StampModel>
    where
        F: Fn(&StampModel) -> bool,
    {
        let mut stamps: Vec<StampModel> = self
            .working
            .stamps
            .iter()
            .filter(|stamp| filter(stamp))
            .cloned()
            .collect();
        stamps.sort_by_key(|stamp| (stamp.stamped_at, stamp.id));
        stamps
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    #[instrument(skip(self, child))]
    async fn insert_child(&mut self, child: &ChildModel) -> Result<(), AppError> {
        debug!(child_id = %child.id, "Creating child in memory");

        if self.working.children.contains_key(&child.id) {
            warn!(child_id = %child.id, "Child already exists in memory");
            return Err(AppError::Conflict("Child already exists".to_string()));
        }
        self.working.children.insert(child.id, child.clone());
        Ok(())
    }

    async fn get_child(
        &mut self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Option<ChildModel>, AppError> {
        Ok(self.child_in_family(family, child_id))
    }

    async fn lock_child(
        &mut self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Option<ChildModel>, AppError> {
        // The transaction already owns the whole state
        Ok(self.child_in_family(family, child_id))
    }

    async fn list_children(&mut self, family: FamilyId) -> Result<Vec<ChildModel>, AppError> {
        let mut children: Vec<ChildModel> = self
            .working
            .children
            .values()
            .filter(|child| child.family_id == family.0)
            .cloned()
            .collect();
        children.sort_by_key(|child| child.created_at);
        Ok(children)
    }

    #[instrument(skip(self, child))]
    async fn update_child(&mut self, child: &ChildModel) -> Result<(), AppError> {
        match self.working.children.get_mut(&child.id) {
            Some(existing) => {
                *existing = child.clone();
                Ok(())
            }
            None => {
                warn!(child_id = %child.id, "Child not found for update in memory");
                Err(AppError::NotFound("Child not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_child(&mut self, family: FamilyId, child_id: Uuid) -> Result<bool, AppError> {
        if self.child_in_family(family, child_id).is_none() {
            return Ok(false);
        }

        self.working.children.remove(&child_id);
        self.working.cards.retain(|card| card.child_id != child_id);
        self.working.stamps.retain(|stamp| stamp.child_id != child_id);
        self.working.goals.retain(|goal| goal.child_id != child_id);

        debug!(child_id = %child_id, "Child and dependents deleted from memory");
        Ok(true)
    }

    async fn list_reward_items(&mut self) -> Result<Vec<RewardItem>, AppError> {
        Ok(self.working.rewards.values().cloned().collect())
    }

    async fn get_reward_item(&mut self, reward_id: i32) -> Result<Option<RewardItem>, AppError> {
        Ok(self.working.rewards.get(&reward_id).cloned())
    }

    async fn upsert_reward_item(&mut self, item: &RewardItem) -> Result<(), AppError> {
        self.working.rewards.insert(item.id, item.clone());
        Ok(())
    }

    async fn find_open_card(&mut self, child_id: Uuid) -> Result<Option<StampCard>, AppError> {
        Ok(self
            .working
            .cards
            .iter()
            .find(|card| card.child_id == child_id && !card.is_completed)
            .cloned())
    }

    async fn last_card_number(&mut self, child_id: Uuid) -> Result<Option<i32>, AppError> {
        Ok(self
            .working
            .cards
            .iter()
            .filter(|card| card.child_id == child_id)
            .map(|card| card.card_number)
            .max())
    }

    #[instrument(skip(self, card))]
    async fn insert_card(&mut self, card: &StampCard) -> Result<(), AppError> {
        let duplicate = self.working.cards.iter().any(|existing| {
            existing.child_id == card.child_id
                && (existing.card_number == card.card_number
                    || (!existing.is_completed && !card.is_completed))
        });
        if duplicate {
            warn!(child_id = %card.child_id, card_number = card.card_number, "Conflicting card in memory");
            return Err(AppError::Conflict(
                "Child already has an open card or this card number".to_string(),
            ));
        }

        debug!(card_id = %card.id, card_number = card.card_number, "Creating card in memory");
        self.working.cards.push(card.clone());
        Ok(())
    }

    #[instrument(skip(self, card))]
    async fn update_card(&mut self, card: &StampCard) -> Result<(), AppError> {
        let existing = self.card_mut(card.id)?;
        if existing.is_completed {
            warn!(card_id = %card.id, "Refusing to modify completed card");
            return Err(AppError::Conflict(format!(
                "Card #{} is already completed",
                existing.card_number
            )));
        }
        *existing = card.clone();
        Ok(())
    }

    async fn list_cards(&mut self, child_id: Uuid) -> Result<Vec<StampCard>, AppError> {
        let mut cards: Vec<StampCard> = self
            .working
            .cards
            .iter()
            .filter(|card| card.child_id == child_id)
            .cloned()
            .collect();
        cards.sort_by_key(|card| card.card_number);
        Ok(cards)
    }

    async fn count_card_stamps(&mut self, card_id: Uuid) -> Result<i32, AppError> {
        Ok(self
            .working
            .stamps
            .iter()
            .filter(|stamp| stamp.stamp_card_id == Some(card_id))
            .count() as i32)
    }

    #[instrument(skip(self, stamp))]
    async fn insert_stamp(&mut self, stamp: &StampModel) -> Result<(), AppError> {
        if self.working.stamps.iter().any(|s| s.id == stamp.id) {
            return Err(AppError::Conflict("Stamp already exists".to_string()));
        }
        debug!(stamp_id = %stamp.id, child_id = %stamp.child_id, "Creating stamp in memory");
        self.working.stamps.push(stamp.clone());
        Ok(())
    }

    async fn get_stamp(&mut self, stamp_id: Uuid) -> Result<Option<StampModel>, AppError> {
        Ok(self
            .working
            .stamps
            .iter()
            .find(|stamp| stamp.id == stamp_id)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn assign_stamp(&mut self, stamp_id: Uuid, card_id: Uuid) -> Result<(), AppError> {
        let card = self.card_mut(card_id)?;
        card.ensure_open()?;

        let stamp = self.stamp_mut(stamp_id)?;
        if stamp.stamp_card_id.is_some() {
            warn!(stamp_id = %stamp_id, "Stamp already assigned to a card");
            return Err(AppError::Conflict(
                "Stamp is already assigned to a card".to_string(),
            ));
        }
        stamp.assign_to(card_id)
    }

    async fn mark_stamp_opened(
        &mut self,
        stamp_id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<StampModel, AppError> {
        let stamp = self.stamp_mut(stamp_id)?;
        stamp.open(opened_at);
        Ok(stamp.clone())
    }

    async fn list_stamps(&mut self, child_id: Uuid) -> Result<Vec<StampModel>, AppError> {
        Ok(self.sorted_stamps(|stamp| stamp.child_id == child_id))
    }

    async fn list_unassigned_stamps(
        &mut self,
        child_id: Uuid,
    ) -> Result<Vec<StampModel>, AppError> {
        Ok(self.sorted_stamps(|stamp| stamp.child_id == child_id && stamp.stamp_card_id.is_none()))
    }

    async fn insert_goal(&mut self, goal: &GoalModel) -> Result<(), AppError> {
        self.working.goals.push(goal.clone());
        Ok(())
    }

    async fn find_active_goal(&mut self, child_id: Uuid) -> Result<Option<GoalModel>, AppError> {
        Ok(self
            .working
            .goals
            .iter()
            .find(|goal| goal.child_id == child_id && goal.is_active())
            .cloned())
    }

    async fn update_goal(&mut self, goal: &GoalModel) -> Result<(), AppError> {
        let existing = self
            .working
            .goals
            .iter_mut()
            .find(|existing| existing.id == goal.id)
            .ok_or_else(|| AppError::NotFound("Goal not found".to_string()))?;
        *existing = goal.clone();
        Ok(())
    }

    async fn list_goals(&mut self, child_id: Uuid) -> Result<Vec<GoalModel>, AppError> {
        let mut goals: Vec<GoalModel> = self
            .working
            .goals
            .iter()
            .filter(|goal| goal.child_id == child_id)
            .cloned()
            .collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::Rarity;

    fn child(family: i64) -> ChildModel {
        ChildModel::new(FamilyId(family), "Misty", 3).unwrap()
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let store = InMemoryStore::new();
        let child = child(1);

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_child(&child).await.unwrap();
            tx.insert_stamp(&StampModel::new(child.id, 1, None))
                .await
                .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_child(FamilyId(1), child.id).await.unwrap().is_none());
        assert_eq!(store_stamps(&mut tx, child.id).await, 0);
    }

    #[tokio::test]
    async fn test_committed_writes_are_visible() {
        let store = InMemoryStore::new();
        let child = child(1);

        let mut tx = store.begin().await.unwrap();
        tx.insert_child(&child).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.get_child(FamilyId(1), child.id).await.unwrap(),
            Some(child)
        );
    }

    #[tokio::test]
    async fn test_children_scoped_by_family() {
        let store = InMemoryStore::new();
        let child = child(1);

        let mut tx = store.begin().await.unwrap();
        tx.insert_child(&child).await.unwrap();

        assert!(tx.get_child(FamilyId(2), child.id).await.unwrap().is_none());
        assert!(tx.list_children(FamilyId(2)).await.unwrap().is_empty());
        assert!(!tx.delete_child(FamilyId(2), child.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_single_open_card_per_child() {
        let store = InMemoryStore::new();
        let child_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.insert_card(&StampCard::new(child_id, 1, 3)).await.unwrap();
        let result = tx.insert_card(&StampCard::new(child_id, 2, 3)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_completed_card_rejects_changes() {
        let store = InMemoryStore::new();
        let child_id = Uuid::new_v4();
        let mut card = StampCard::new(child_id, 1, 1);
        let stamp = StampModel::new(child_id, 1, None);

        let mut tx = store.begin().await.unwrap();
        tx.insert_card(&card).await.unwrap();
        tx.insert_stamp(&stamp).await.unwrap();
        card.complete(Utc::now()).unwrap();
        tx.update_card(&card).await.unwrap();

        assert!(matches!(
            tx.update_card(&card).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            tx.assign_stamp(stamp.id, card.id).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_child_cascades() {
        let store = InMemoryStore::with_catalog(vec![RewardItem::new(1, "Bulbasaur", Rarity::Normal)]);
        let child = child(1);
        let card = StampCard::new(child.id, 1, 3);

        let mut tx = store.begin().await.unwrap();
        tx.insert_child(&child).await.unwrap();
        tx.insert_card(&card).await.unwrap();
        tx.insert_stamp(&StampModel::new(child.id, 1, None))
            .await
            .unwrap();
        tx.insert_goal(&GoalModel::new(child.id, "Bike", 5).unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.delete_child(FamilyId(1), child.id).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.stamp_count().await, 0);
        assert_eq!(store.card_count().await, 0);
        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_goals(child.id).await.unwrap().is_empty());
        assert_eq!(tx.list_reward_items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_simultaneous_stamps_ordered_by_id() {
        let store = InMemoryStore::new();
        let child_id = Uuid::new_v4();
        let at = Utc::now();
        let stamp = |id: u128, stamped_at: DateTime<Utc>| StampModel {
            id: Uuid::from_u128(id),
            stamped_at,
            ..StampModel::new(child_id, 1, None)
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_stamp(&stamp(3, at)).await.unwrap();
        tx.insert_stamp(&stamp(1, at)).await.unwrap();
        tx.insert_stamp(&stamp(9, at - chrono::Duration::seconds(1)))
            .await
            .unwrap();
        tx.insert_stamp(&stamp(2, at)).await.unwrap();

        let expected: Vec<Uuid> = [9, 1, 2, 3].into_iter().map(Uuid::from_u128).collect();
        let unassigned: Vec<Uuid> = tx
            .list_unassigned_stamps(child_id)
            .await
            .unwrap()
            .iter()
            .map(|stamp| stamp.id)
            .collect();
        let all: Vec<Uuid> = tx
            .list_stamps(child_id)
            .await
            .unwrap()
            .iter()
            .map(|stamp| stamp.id)
            .collect();
        assert_eq!(unassigned, expected);
        assert_eq!(all, expected);
    }

    async fn store_stamps(tx: &mut Box<dyn StoreTransaction>, child_id: Uuid) -> usize {
        tx.list_stamps(child_id).await.unwrap().len()
    }
}
