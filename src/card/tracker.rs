use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::models::StampCard;
use crate::child::models::ChildModel;
use crate::shared::AppError;
use crate::stamp::models::StampModel;
use crate::store::StoreTransaction;

/// Outcome of placing one stamp on a card
#[derive(Debug, Clone)]
pub struct ProgressResult {
    /// The card the stamp landed on, completed or not
    pub card: StampCard,
    pub progress: i32,
    pub completed: bool,
    pub completed_card_number: Option<i32>,
    /// The freshly opened card when this stamp completed `card`
    pub new_card: Option<StampCard>,
}

/// Card with its current stamp count
#[derive(Debug, Clone, Serialize)]
pub struct CardSummary {
    #[serde(flatten)]
    pub card: StampCard,
    pub progress: i32,
}

/// What a legacy reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub stamps_assigned: usize,
    pub cards_completed: usize,
    pub cards_created: usize,
}

/// Keeps each child's card sequence consistent: exactly one open card once
/// the child has stamped, numbered after the last card, completed as soon as
/// its stamp count reaches the card's own target.
#[derive(Debug, Default, Clone, Copy)]
pub struct CardProgressionTracker;

impl CardProgressionTracker {
    pub fn new() -> Self {
        Self
    }

    /// Returns the child's open card, opening the next one if none exists
    #[instrument(skip(self, tx, child), fields(child_id = %child.id))]
    pub async fn get_or_create_current_card(
        &self,
        tx: &mut dyn StoreTransaction,
        child: &ChildModel,
    ) -> Result<StampCard, AppError> {
        if let Some(card) = tx.find_open_card(child.id).await? {
            return Ok(card);
        }

        let card_number = tx.last_card_number(child.id).await?.unwrap_or(0) + 1;
        let card = StampCard::new(child.id, card_number, child.target_stamps);
        tx.insert_card(&card).await?;

        info!(
            card_number,
            target_stamps = card.target_stamps,
            "Opened new stamp card"
        );
        Ok(card)
    }

    /// Attaches the stamp to the card and completes the card when full.
    ///
    /// Completion opens the next card straight away with the child's current
    /// target, so a child always has an open card afterwards.
    #[instrument(skip(self, tx, child, card, stamp), fields(card_number = card.card_number))]
    pub async fn record_stamp(
        &self,
        tx: &mut dyn StoreTransaction,
        child: &ChildModel,
        card: &StampCard,
        stamp: &mut StampModel,
    ) -> Result<ProgressResult, AppError> {
        card.ensure_open()?;
        stamp.assign_to(card.id)?;
        tx.assign_stamp(stamp.id, card.id).await?;

        let progress = tx.count_card_stamps(card.id).await?;
        let mut card = card.clone();

        if !card.is_full(progress) {
            debug!(progress, target = card.target_stamps, "Card progress updated");
            return Ok(ProgressResult {
                card,
                progress,
                completed: false,
                completed_card_number: None,
                new_card: None,
            });
        }

        card.complete(Utc::now())?;
        tx.update_card(&card).await?;

        let next = card.next(child.target_stamps);
        tx.insert_card(&next).await?;

        info!(
            completed_card = card.card_number,
            next_card = next.card_number,
            "Stamp card completed"
        );

        Ok(ProgressResult {
            completed_card_number: Some(card.card_number),
            card,
            progress,
            completed: true,
            new_card: Some(next),
        })
    }

    /// Every card of the child with its progress, by card number
    pub async fn card_summaries(
        &self,
        tx: &mut dyn StoreTransaction,
        child: &ChildModel,
    ) -> Result<Vec<CardSummary>, AppError> {
        let cards = tx.list_cards(child.id).await?;
        let mut summaries = Vec::with_capacity(cards.len());
        for card in cards {
            let progress = tx.count_card_stamps(card.id).await?;
            summaries.push(CardSummary { card, progress });
        }
        Ok(summaries)
    }

    /// Packs stamps that predate cards onto cards, oldest first.
    ///
    /// Fills the open card (creating one if needed), completing each card as
    /// it fills. Running it again finds nothing unassigned and does nothing.
    #[instrument(skip(self, tx, child), fields(child_id = %child.id))]
    pub async fn migrate_unassigned(
        &self,
        tx: &mut dyn StoreTransaction,
        child: &ChildModel,
    ) -> Result<MigrationReport, AppError> {
        let unassigned = tx.list_unassigned_stamps(child.id).await?;
        let mut report = MigrationReport::default();
        if unassigned.is_empty() {
            debug!("No unassigned stamps to migrate");
            return Ok(report);
        }

        let had_open_card = tx.find_open_card(child.id).await?.is_some();
        let mut card = self.get_or_create_current_card(tx, child).await?;
        if !had_open_card {
            report.cards_created += 1;
        }

        for mut stamp in unassigned {
            let result = self.record_stamp(tx, child, &card, &mut stamp).await?;
            report.stamps_assigned += 1;

            if let Some(next) = result.new_card {
                report.cards_completed += 1;
                report.cards_created += 1;
                card = next;
            }
        }

        info!(
            stamps_assigned = report.stamps_assigned,
            cards_completed = report.cards_completed,
            "Migrated unassigned stamps onto cards"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::FamilyId;
    use crate::store::{InMemoryStore, StampStore};
    use chrono::Duration;

    async fn setup(target: i32) -> (InMemoryStore, ChildModel) {
        let store = InMemoryStore::with_default_catalog();
        let child = ChildModel::new(FamilyId(1), "Brock", target).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_child(&child).await.unwrap();
        tx.commit().await.unwrap();
        (store, child)
    }

    async fn stamp_once(
        tx: &mut dyn StoreTransaction,
        child: &ChildModel,
    ) -> ProgressResult {
        let tracker = CardProgressionTracker::new();
        let card = tracker.get_or_create_current_card(tx, child).await.unwrap();
        let mut stamp = StampModel::new(child.id, 25, None);
        tx.insert_stamp(&stamp).await.unwrap();
        tracker.record_stamp(tx, child, &card, &mut stamp).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_card_is_number_one() {
        let (store, child) = setup(5).await;
        let mut tx = store.begin().await.unwrap();

        let card = CardProgressionTracker::new()
            .get_or_create_current_card(tx.as_mut(), &child)
            .await
            .unwrap();

        assert_eq!(card.card_number, 1);
        assert_eq!(card.target_stamps, 5);

        let again = CardProgressionTracker::new()
            .get_or_create_current_card(tx.as_mut(), &child)
            .await
            .unwrap();
        assert_eq!(again.id, card.id);
    }

    #[tokio::test]
    async fn test_card_completes_and_next_opens() {
        let (store, child) = setup(2).await;
        let mut tx = store.begin().await.unwrap();

        let first = stamp_once(tx.as_mut(), &child).await;
        assert!(!first.completed);
        assert_eq!(first.progress, 1);

        let second = stamp_once(tx.as_mut(), &child).await;
        assert!(second.completed);
        assert_eq!(second.completed_card_number, Some(1));
        assert!(second.card.is_completed);

        let next = second.new_card.unwrap();
        assert_eq!(next.card_number, 2);
        assert_eq!(tx.count_card_stamps(next.id).await.unwrap(), 0);
        assert_eq!(tx.find_open_card(child.id).await.unwrap().unwrap().id, next.id);
    }

    #[tokio::test]
    async fn test_completed_card_rejects_stamps() {
        let (store, child) = setup(1).await;
        let mut tx = store.begin().await.unwrap();

        let result = stamp_once(tx.as_mut(), &child).await;
        let mut stray = StampModel::new(child.id, 25, None);
        tx.insert_stamp(&stray).await.unwrap();

        let outcome = CardProgressionTracker::new()
            .record_stamp(tx.as_mut(), &child, &result.card, &mut stray)
            .await;
        assert!(matches!(outcome, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cards_keep_their_own_target() {
        let (store, mut child) = setup(2).await;
        let mut tx = store.begin().await.unwrap();

        stamp_once(tx.as_mut(), &child).await;
        child.target_stamps = 4;
        let result = stamp_once(tx.as_mut(), &child).await;

        assert!(result.completed);
        assert_eq!(result.card.target_stamps, 2);
        assert_eq!(result.new_card.unwrap().target_stamps, 4);
    }

    #[tokio::test]
    async fn test_migration_packs_legacy_stamps_in_order() {
        let (store, child) = setup(3).await;
        let base = Utc::now() - Duration::days(10);
        let mut ids = Vec::new();
        for day in (0..7).rev() {
            let mut stamp = StampModel::new(child.id, 25, None);
            stamp.stamped_at = base + Duration::days(day);
            ids.push((stamp.stamped_at, stamp.id));
            store.insert_legacy_stamp(stamp).await;
        }
        ids.sort();

        let mut tx = store.begin().await.unwrap();
        let tracker = CardProgressionTracker::new();
        let report = tracker
            .migrate_unassigned(tx.as_mut(), &child)
            .await
            .unwrap();

        assert_eq!(
            report,
            MigrationReport {
                stamps_assigned: 7,
                cards_completed: 2,
                cards_created: 3,
            }
        );

        let summaries = tracker.card_summaries(tx.as_mut(), &child).await.unwrap();
        let progress: Vec<(i32, i32, bool)> = summaries
            .iter()
            .map(|s| (s.card.card_number, s.progress, s.card.is_completed))
            .collect();
        assert_eq!(progress, vec![(1, 3, true), (2, 3, true), (3, 1, false)]);

        let oldest = tx.get_stamp(ids[0].1).await.unwrap().unwrap();
        assert_eq!(oldest.stamp_card_id, Some(summaries[0].card.id));
        let newest = tx.get_stamp(ids[6].1).await.unwrap().unwrap();
        assert_eq!(newest.stamp_card_id, Some(summaries[2].card.id));

        let rerun = tracker
            .migrate_unassigned(tx.as_mut(), &child)
            .await
            .unwrap();
        assert_eq!(rerun, MigrationReport::default());
    }

    #[tokio::test]
    async fn test_migration_without_legacy_stamps_is_noop() {
        let (store, child) = setup(3).await;
        let mut tx = store.begin().await.unwrap();

        let report = CardProgressionTracker::new()
            .migrate_unassigned(tx.as_mut(), &child)
            .await
            .unwrap();

        assert_eq!(report, MigrationReport::default());
        assert!(tx.list_cards(child.id).await.unwrap().is_empty());
    }
}
