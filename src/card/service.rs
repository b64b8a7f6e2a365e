use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::tracker::{CardProgressionTracker, CardSummary, MigrationReport};
use crate::child::find_child;
use crate::family::FamilyId;
use crate::shared::AppError;
use crate::store::StampStore;

/// Card queries and the legacy reconciliation trigger
pub struct CardService {
    store: Arc<dyn StampStore>,
    tracker: CardProgressionTracker,
}

impl CardService {
    pub fn new(store: Arc<dyn StampStore>) -> Self {
        Self {
            store,
            tracker: CardProgressionTracker::new(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_cards(
        &self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Vec<CardSummary>, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;
        let summaries = self.tracker.card_summaries(tx.as_mut(), &child).await?;
        Ok(summaries)
    }

    /// The open card with its progress. A child that has never been stamped
    /// has no card yet.
    #[instrument(skip(self))]
    pub async fn current_card(
        &self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<CardSummary, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;
        let card = tx
            .find_open_card(child.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Child has no open card".to_string()))?;
        let progress = tx.count_card_stamps(card.id).await?;
        Ok(CardSummary { card, progress })
    }

    #[instrument(skip(self))]
    pub async fn migrate_cards(
        &self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<MigrationReport, AppError> {
        let mut tx = self.store.begin().await?;
        let child = tx
            .lock_child(family, child_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Child not found".to_string()))?;

        let report = self.tracker.migrate_unassigned(tx.as_mut(), &child).await?;
        tx.commit().await?;

        info!(child_id = %child.id, stamps_assigned = report.stamps_assigned, "Card migration finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::child::models::ChildModel;
    use crate::stamp::models::StampModel;
    use crate::store::InMemoryStore;

    async fn child_with_legacy_stamps(store: &InMemoryStore, count: usize) -> ChildModel {
        let child = ChildModel::new(FamilyId(1), "Tracey", 2).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_child(&child).await.unwrap();
        tx.commit().await.unwrap();

        for _ in 0..count {
            store
                .insert_legacy_stamp(StampModel::new(child.id, 25, None))
                .await;
        }
        child
    }

    #[tokio::test]
    async fn test_current_card_missing_before_first_stamp() {
        let store = Arc::new(InMemoryStore::with_default_catalog());
        let child = child_with_legacy_stamps(&store, 0).await;

        let result = CardService::new(store).current_card(FamilyId(1), child.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_migrate_then_list() {
        let store = Arc::new(InMemoryStore::with_default_catalog());
        let child = child_with_legacy_stamps(&store, 3).await;
        let service = CardService::new(store);

        let report = service.migrate_cards(FamilyId(1), child.id).await.unwrap();
        assert_eq!(report.stamps_assigned, 3);
        assert_eq!(report.cards_completed, 1);

        let cards = service.list_cards(FamilyId(1), child.id).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].progress, 2);

        let current = service.current_card(FamilyId(1), child.id).await.unwrap();
        assert_eq!(current.card.card_number, 2);
        assert_eq!(current.progress, 1);
    }

    #[tokio::test]
    async fn test_migrate_other_family_child_is_not_found() {
        let store = Arc::new(InMemoryStore::with_default_catalog());
        let child = child_with_legacy_stamps(&store, 1).await;

        let result = CardService::new(store).migrate_cards(FamilyId(9), child.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
