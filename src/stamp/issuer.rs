use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::StampModel,
    types::{CardInfo, IssueStampRequest, IssueStampResponse, SpecialRewardInfo},
};
use crate::card::{CardProgressionTracker, ProgressResult};
use crate::family::FamilyId;
use crate::reward::{RewardSelection, RewardSelector};
use crate::shared::AppError;
use crate::store::StampStore;

/// Orchestrates one stamp issuance as a single transaction.
///
/// The child row is locked first, so two issuances for the same child never
/// both see the same card progress. Nothing is committed unless the reward,
/// the stamp and the card update all succeed.
pub struct StampIssuer {
    store: Arc<dyn StampStore>,
    selector: RewardSelector,
    tracker: CardProgressionTracker,
    max_comment_length: usize,
}

impl StampIssuer {
    pub fn new(
        store: Arc<dyn StampStore>,
        selector: RewardSelector,
        max_comment_length: usize,
    ) -> Self {
        Self {
            store,
            selector,
            tracker: CardProgressionTracker::new(),
            max_comment_length,
        }
    }

    /// Issues a stamp, retrying once if a concurrent writer got there first
    #[instrument(skip(self, request))]
    pub async fn issue_stamp(
        &self,
        family: FamilyId,
        child_id: Uuid,
        request: IssueStampRequest,
    ) -> Result<IssueStampResponse, AppError> {
        let comment = request.validated_comment(self.max_comment_length)?;

        match self.try_issue(family, child_id, comment.clone()).await {
            Err(AppError::Conflict(reason)) => {
                warn!(reason = %reason, "Stamp issuance conflicted, retrying once");
                self.try_issue(family, child_id, comment).await
            }
            result => result,
        }
    }

    async fn try_issue(
        &self,
        family: FamilyId,
        child_id: Uuid,
        comment: Option<String>,
    ) -> Result<IssueStampResponse, AppError> {
        let mut tx = self.store.begin().await?;

        let child = tx
            .lock_child(family, child_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Child not found".to_string()))?;

        let card = self
            .tracker
            .get_or_create_current_card(tx.as_mut(), &child)
            .await?;
        let progress = tx.count_card_stamps(card.id).await?;

        // The stamp about to be placed is the one that would fill the card
        let is_card_completion = card.is_full(progress + 1);

        let catalog = tx.list_reward_items().await?;
        let selection = self.selector.select_reward(&catalog, is_card_completion)?;

        let mut stamp = StampModel::new(child.id, selection.item.id, comment);
        tx.insert_stamp(&stamp).await?;

        let outcome = self
            .tracker
            .record_stamp(tx.as_mut(), &child, &card, &mut stamp)
            .await?;

        tx.commit().await?;

        info!(
            stamp_id = %stamp.id,
            reward_id = selection.item.id,
            rarity = %selection.item.rarity,
            card_number = outcome.card.card_number,
            progress = outcome.progress,
            card_completed = outcome.completed,
            "Stamp issued"
        );

        Ok(build_response(stamp, &selection, is_card_completion, &outcome))
    }
}

fn build_response(
    stamp: StampModel,
    selection: &RewardSelection,
    is_card_completion: bool,
    outcome: &ProgressResult,
) -> IssueStampResponse {
    let current_card_number = outcome
        .new_card
        .as_ref()
        .map(|card| card.card_number)
        .unwrap_or(outcome.card.card_number);

    let message = match outcome.completed_card_number {
        Some(number) => format!(
            "Card #{number} is complete! Card #{current_card_number} has started."
        ),
        None => format!(
            "{} of {} stamps on card #{}.",
            outcome.progress, outcome.card.target_stamps, outcome.card.card_number
        ),
    };

    IssueStampResponse {
        stamp,
        card_info: CardInfo {
            progress: outcome.progress,
            target: outcome.card.target_stamps,
            card_completed: outcome.completed,
            completed_card_number: outcome.completed_card_number,
            current_card_number,
        },
        special_pokemon_info: SpecialRewardInfo {
            is_special: selection.special.is_some(),
            reason: selection.special.map(|special| special.reason().to_string()),
            is_card_completion,
        },
        message,
    }
}
