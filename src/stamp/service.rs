use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    models::StampModel,
    types::{OpenStampResponse, StampView},
};
use crate::child::find_child;
use crate::family::FamilyId;
use crate::reward::RewardItem;
use crate::shared::AppError;
use crate::store::{StampStore, StoreTransaction};

/// Loads a stamp whose child belongs to the family
async fn find_stamp(
    tx: &mut dyn StoreTransaction,
    family: FamilyId,
    stamp_id: Uuid,
) -> Result<StampModel, AppError> {
    let stamp = tx
        .get_stamp(stamp_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Stamp not found".to_string()))?;

    // Stamps of another family's child are reported as missing
    if tx.get_child(family, stamp.child_id).await?.is_none() {
        return Err(AppError::NotFound("Stamp not found".to_string()));
    }
    Ok(stamp)
}

async fn reward_for(
    tx: &mut dyn StoreTransaction,
    stamp: &StampModel,
) -> Result<RewardItem, AppError> {
    tx.get_reward_item(stamp.reward_item_id).await?.ok_or_else(|| {
        AppError::NotFound(format!("Reward item {} not found", stamp.reward_item_id))
    })
}

/// Read and reveal operations on issued stamps
pub struct StampService {
    store: Arc<dyn StampStore>,
}

impl StampService {
    pub fn new(store: Arc<dyn StampStore>) -> Self {
        Self { store }
    }

    /// The child's stamps oldest first, rewards shown only for opened stamps
    #[instrument(skip(self))]
    pub async fn list_stamps(
        &self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Vec<StampView>, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;

        let stamps = tx.list_stamps(child.id).await?;
        let catalog: HashMap<i32, RewardItem> = tx
            .list_reward_items()
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let views = stamps
            .into_iter()
            .map(|stamp| {
                let reward = stamp
                    .is_opened()
                    .then(|| catalog.get(&stamp.reward_item_id).cloned())
                    .flatten();
                StampView { stamp, reward }
            })
            .collect::<Vec<_>>();

        debug!(stamp_count = views.len(), "Stamps listed");
        Ok(views)
    }

    #[instrument(skip(self))]
    pub async fn get_stamp(&self, family: FamilyId, stamp_id: Uuid) -> Result<StampView, AppError> {
        let mut tx = self.store.begin().await?;
        let stamp = find_stamp(tx.as_mut(), family, stamp_id).await?;
        let reward = if stamp.is_opened() {
            Some(reward_for(tx.as_mut(), &stamp).await?)
        } else {
            None
        };
        Ok(StampView { stamp, reward })
    }

    /// Reveals the stamp's reward, recording the first reveal time only
    #[instrument(skip(self))]
    pub async fn open_stamp(
        &self,
        family: FamilyId,
        stamp_id: Uuid,
    ) -> Result<OpenStampResponse, AppError> {
        let mut tx = self.store.begin().await?;
        let stamp = find_stamp(tx.as_mut(), family, stamp_id).await?;
        let newly_opened = !stamp.is_opened();

        let stamp = tx.mark_stamp_opened(stamp.id, Utc::now()).await?;
        let reward = reward_for(tx.as_mut(), &stamp).await?;
        tx.commit().await?;

        if newly_opened {
            info!(stamp_id = %stamp.id, reward_id = reward.id, "Stamp opened");
        } else {
            debug!(stamp_id = %stamp.id, "Stamp was already open");
        }

        Ok(OpenStampResponse {
            stamp,
            reward,
            newly_opened,
        })
    }
}
