use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    service::CardService,
    tracker::{CardSummary, MigrationReport},
};
use crate::family::FamilyId;
use crate::shared::{AppError, AppState};

/// GET /api/children/:id/cards
#[instrument(name = "list_cards", skip(state))]
pub async fn list_cards(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Vec<CardSummary>>, AppError> {
    let cards = CardService::new(Arc::clone(&state.store))
        .list_cards(family, child_id)
        .await?;
    Ok(Json(cards))
}

/// GET /api/children/:id/cards/current
#[instrument(name = "current_card", skip(state))]
pub async fn current_card(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<CardSummary>, AppError> {
    let card = CardService::new(Arc::clone(&state.store))
        .current_card(family, child_id)
        .await?;
    Ok(Json(card))
}

/// HTTP handler for packing pre-card stamps onto cards
///
/// POST /api/children/:id/cards/migrate
#[instrument(name = "migrate_cards", skip(state))]
pub async fn migrate_cards(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<MigrationReport>, AppError> {
    let report = CardService::new(Arc::clone(&state.store))
        .migrate_cards(family, child_id)
        .await?;
    info!(cards_created = report.cards_created, "Cards migrated successfully");
    Ok(Json(report))
}
