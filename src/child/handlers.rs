use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    models::ChildModel,
    service::ChildService,
    types::{CreateChildRequest, UpdateChildRequest},
};
use crate::family::FamilyId;
use crate::shared::{AppError, AppState};

fn service(state: &AppState) -> ChildService {
    ChildService::new(Arc::clone(&state.store), state.config.default_target_stamps)
}

/// HTTP handler for creating a child
///
/// POST /api/children
#[instrument(name = "create_child", skip(state, request))]
pub async fn create_child(
    State(state): State<AppState>,
    family: FamilyId,
    Json(request): Json<CreateChildRequest>,
) -> Result<(StatusCode, Json<ChildModel>), AppError> {
    let child = service(&state).create_child(family, request).await?;
    info!(child_id = %child.id, "Child created successfully");
    Ok((StatusCode::CREATED, Json(child)))
}

/// HTTP handler for listing the family's children
///
/// GET /api/children
#[instrument(name = "list_children", skip(state))]
pub async fn list_children(
    State(state): State<AppState>,
    family: FamilyId,
) -> Result<Json<Vec<ChildModel>>, AppError> {
    let children = service(&state).list_children(family).await?;
    info!(child_count = children.len(), "Children listed successfully");
    Ok(Json(children))
}

/// GET /api/children/:id
#[instrument(name = "get_child", skip(state))]
pub async fn get_child(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<ChildModel>, AppError> {
    Ok(Json(service(&state).get_child(family, child_id).await?))
}

/// PATCH /api/children/:id
#[instrument(name = "update_child", skip(state, request))]
pub async fn update_child(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
    Json(request): Json<UpdateChildRequest>,
) -> Result<Json<ChildModel>, AppError> {
    let child = service(&state)
        .update_child(family, child_id, request)
        .await?;
    Ok(Json(child))
}

/// DELETE /api/children/:id
#[instrument(name = "delete_child", skip(state))]
pub async fn delete_child(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service(&state).delete_child(family, child_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
