use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    aggregation::{
        calendar_month, collection_progress, current_streak, longest_streak, rarity_breakdown,
        stamp_days,
    },
    models::{CalendarMonth, ChildStats},
};
use crate::card::{CardProgressionTracker, CardSummary};
use crate::child::find_child;
use crate::family::FamilyId;
use crate::reward::RewardItem;
use crate::shared::AppError;
use crate::stamp::models::StampModel;
use crate::store::StampStore;

/// Read-only aggregations over a child's stamps and cards
pub struct StatsService {
    store: Arc<dyn StampStore>,
}

impl StatsService {
    pub fn new(store: Arc<dyn StampStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn child_stats(
        &self,
        family: FamilyId,
        child_id: Uuid,
        today: NaiveDate,
    ) -> Result<ChildStats, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;

        let stamps = tx.list_stamps(child.id).await?;
        let catalog = tx.list_reward_items().await?;
        let cards = CardProgressionTracker::new()
            .card_summaries(tx.as_mut(), &child)
            .await?;

        let stats = summarize(child.id, &stamps, &catalog, cards, today);
        debug!(total_stamps = stats.total_stamps, "Child stats computed");
        Ok(stats)
    }

    #[instrument(skip(self))]
    pub async fn calendar(
        &self,
        family: FamilyId,
        child_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<CalendarMonth, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;
        let stamps = tx.list_stamps(child.id).await?;
        calendar_month(year, month, &stamps)
    }

    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}

fn summarize(
    child_id: Uuid,
    stamps: &[StampModel],
    catalog: &[RewardItem],
    cards: Vec<CardSummary>,
    today: NaiveDate,
) -> ChildStats {
    // Unopened rewards stay secret, so only opened stamps feed the reward figures
    let opened: Vec<StampModel> = stamps.iter().filter(|s| s.is_opened()).cloned().collect();
    let days = stamp_days(stamps);

    let completed_cards = cards.iter().filter(|c| c.card.is_completed).count();
    let current_card = cards.into_iter().find(|c| !c.card.is_completed);

    ChildStats {
        child_id,
        total_stamps: stamps.len(),
        opened_stamps: opened.len(),
        unopened_stamps: stamps.len() - opened.len(),
        completed_cards,
        current_card,
        rarity_breakdown: rarity_breakdown(&opened, catalog),
        collection: collection_progress(&opened, catalog),
        current_streak: current_streak(&days, today),
        longest_streak: longest_streak(&days),
        first_stamp_at: stamps.iter().map(|s| s.stamped_at).min(),
        last_stamp_at: stamps.iter().map(|s| s.stamped_at).max(),
    }
}
