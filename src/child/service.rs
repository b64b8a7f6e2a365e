use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{validate_name, validate_target_stamps, ChildModel},
    types::{CreateChildRequest, UpdateChildRequest},
};
use crate::family::FamilyId;
use crate::shared::AppError;
use crate::store::{StampStore, StoreTransaction};

/// Loads a child of the family or fails with NotFound
pub async fn find_child(
    tx: &mut dyn StoreTransaction,
    family: FamilyId,
    child_id: Uuid,
) -> Result<ChildModel, AppError> {
    tx.get_child(family, child_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Child not found".to_string()))
}

/// Service for handling child business logic
pub struct ChildService {
    store: Arc<dyn StampStore>,
    default_target_stamps: i32,
}

impl ChildService {
    pub fn new(store: Arc<dyn StampStore>, default_target_stamps: i32) -> Self {
        Self {
            store,
            default_target_stamps,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_child(
        &self,
        family: FamilyId,
        request: CreateChildRequest,
    ) -> Result<ChildModel, AppError> {
        let target = request.target_stamps.unwrap_or(self.default_target_stamps);
        let child = ChildModel::new(family, &request.name, target)?;

        let mut tx = self.store.begin().await?;
        tx.insert_child(&child).await?;
        tx.commit().await?;

        info!(child_id = %child.id, target_stamps = child.target_stamps, "Child created");
        Ok(child)
    }

    #[instrument(skip(self))]
    pub async fn list_children(&self, family: FamilyId) -> Result<Vec<ChildModel>, AppError> {
        let mut tx = self.store.begin().await?;
        let children = tx.list_children(family).await?;
        Ok(children)
    }

    #[instrument(skip(self))]
    pub async fn get_child(&self, family: FamilyId, child_id: Uuid) -> Result<ChildModel, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;
        Ok(child)
    }

    /// Applies name and target changes.
    ///
    /// The target may only change while the open card is empty. An empty open
    /// card takes the new target immediately.
    #[instrument(skip(self, request))]
    pub async fn update_child(
        &self,
        family: FamilyId,
        child_id: Uuid,
        request: UpdateChildRequest,
    ) -> Result<ChildModel, AppError> {
        let name = request.name.as_deref().map(validate_name).transpose()?;
        let target = request
            .target_stamps
            .map(validate_target_stamps)
            .transpose()?;

        let mut tx = self.store.begin().await?;
        let mut child = tx
            .lock_child(family, child_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Child not found".to_string()))?;

        if let Some(name) = name {
            child.name = name;
        }

        if let Some(target) = target.filter(|t| *t != child.target_stamps) {
            if let Some(mut open_card) = tx.find_open_card(child.id).await? {
                let progress = tx.count_card_stamps(open_card.id).await?;
                if progress > 0 {
                    warn!(child_id = %child.id, progress, "Target change blocked by card in progress");
                    return Err(AppError::Validation(
                        "Target stamps cannot change while the current card has stamps"
                            .to_string(),
                    ));
                }
                open_card.retarget(target)?;
                tx.update_card(&open_card).await?;
            }
            child.target_stamps = target;
        }

        tx.update_child(&child).await?;
        tx.commit().await?;

        info!(child_id = %child.id, "Child updated");
        Ok(child)
    }

    #[instrument(skip(self))]
    pub async fn delete_child(&self, family: FamilyId, child_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_child(family, child_id).await? {
            return Err(AppError::NotFound("Child not found".to_string()));
        }
        tx.commit().await?;

        info!(child_id = %child_id, "Child deleted");
        Ok(())
    }
}
