use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    models::GoalModel,
    service::GoalService,
    types::{CreateGoalRequest, CurrentGoalResponse, GoalProgress},
};
use crate::family::FamilyId;
use crate::shared::{AppError, AppState};

fn service(state: &AppState) -> GoalService {
    GoalService::new(Arc::clone(&state.store))
}

/// POST /api/children/:id/goal
#[instrument(name = "create_goal", skip(state, request))]
pub async fn create_goal(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
    Json(request): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<GoalProgress>), AppError> {
    let goal = service(&state).create_goal(family, child_id, request).await?;
    info!(goal_id = %goal.goal.id, "Goal created successfully");
    Ok((StatusCode::CREATED, Json(goal)))
}

/// GET /api/children/:id/goal
#[instrument(name = "current_goal", skip(state))]
pub async fn current_goal(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<CurrentGoalResponse>, AppError> {
    Ok(Json(service(&state).current_goal(family, child_id).await?))
}

/// DELETE /api/children/:id/goal
#[instrument(name = "cancel_goal", skip(state))]
pub async fn cancel_goal(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<GoalModel>, AppError> {
    Ok(Json(service(&state).cancel_goal(family, child_id).await?))
}

/// GET /api/children/:id/goals
#[instrument(name = "goal_history", skip(state))]
pub async fn goal_history(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Vec<GoalModel>>, AppError> {
    Ok(Json(service(&state).goal_history(family, child_id).await?))
}
