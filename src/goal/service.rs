use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::GoalModel,
    types::{CreateGoalRequest, CurrentGoalResponse, GoalProgress},
};
use crate::child::models::ChildModel;
use crate::child::find_child;
use crate::family::FamilyId;
use crate::shared::AppError;
use crate::store::{StampStore, StoreTransaction};

/// Stamps the child earned since the goal was set
async fn goal_progress(
    tx: &mut dyn StoreTransaction,
    goal: &GoalModel,
) -> Result<i32, AppError> {
    let stamps = tx.list_stamps(goal.child_id).await?;
    let earned = stamps
        .iter()
        .filter(|stamp| stamp.stamped_at >= goal.created_at)
        .count();
    Ok(earned as i32)
}

/// Service for handling goal business logic
pub struct GoalService {
    store: Arc<dyn StampStore>,
}

impl GoalService {
    pub fn new(store: Arc<dyn StampStore>) -> Self {
        Self { store }
    }

    /// Loads the active goal with its progress, completing it if the target
    /// has been reached. Returns the goal and whether it completed just now.
    async fn settle_active_goal(
        tx: &mut dyn StoreTransaction,
        child: &ChildModel,
    ) -> Result<Option<(GoalProgress, bool)>, AppError> {
        let Some(goal) = tx.find_active_goal(child.id).await? else {
            return Ok(None);
        };

        let progress = goal_progress(tx, &goal).await?;
        let mut current = GoalProgress::new(goal, progress);
        if !current.is_reached() {
            return Ok(Some((current, false)));
        }

        current.goal.complete(Utc::now())?;
        current.state = current.goal.state();
        tx.update_goal(&current.goal).await?;
        info!(goal_id = %current.goal.id, progress, "Goal completed");
        Ok(Some((current, true)))
    }

    #[instrument(skip(self, request))]
    pub async fn create_goal(
        &self,
        family: FamilyId,
        child_id: Uuid,
        request: CreateGoalRequest,
    ) -> Result<GoalProgress, AppError> {
        let mut tx = self.store.begin().await?;
        let child = tx
            .lock_child(family, child_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Child not found".to_string()))?;

        if let Some((existing, false)) = Self::settle_active_goal(tx.as_mut(), &child).await? {
            warn!(goal_id = %existing.goal.id, "Child already has an active goal");
            return Err(AppError::Conflict(
                "Child already has an active goal. Cancel or complete it first.".to_string(),
            ));
        }

        let goal = GoalModel::new(child.id, &request.title, request.target_stamps)?;
        tx.insert_goal(&goal).await?;
        tx.commit().await?;

        info!(goal_id = %goal.id, target_stamps = goal.target_stamps, "Goal created");
        Ok(GoalProgress::new(goal, 0))
    }

    #[instrument(skip(self))]
    pub async fn current_goal(
        &self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<CurrentGoalResponse, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;

        let settled = Self::settle_active_goal(tx.as_mut(), &child).await?;
        tx.commit().await?;

        Ok(match settled {
            Some((goal, just_completed)) => CurrentGoalResponse {
                goal: Some(goal),
                just_completed,
            },
            None => CurrentGoalResponse {
                goal: None,
                just_completed: false,
            },
        })
    }

    #[instrument(skip(self))]
    pub async fn cancel_goal(
        &self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<GoalModel, AppError> {
        let mut tx = self.store.begin().await?;
        let child = tx
            .lock_child(family, child_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Child not found".to_string()))?;

        let mut goal = tx
            .find_active_goal(child.id)
            .await?
            .ok_or_else(|| AppError::NotFound("No active goal to cancel".to_string()))?;
        goal.cancel(Utc::now())?;
        tx.update_goal(&goal).await?;
        tx.commit().await?;

        info!(goal_id = %goal.id, "Goal cancelled");
        Ok(goal)
    }

    /// Every goal of the child, newest first
    #[instrument(skip(self))]
    pub async fn goal_history(
        &self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Vec<GoalModel>, AppError> {
        let mut tx = self.store.begin().await?;
        let child = find_child(tx.as_mut(), family, child_id).await?;
        let goals = tx.list_goals(child.id).await?;
        Ok(goals)
    }
}
