use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Datelike;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::{
    models::{CalendarMonth, ChildStats},
    service::StatsService,
};
use crate::family::FamilyId;
use crate::shared::{AppError, AppState};

/// Month to show; missing parts default to the current month
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// GET /api/children/:id/stats
#[instrument(name = "child_stats", skip(state))]
pub async fn child_stats(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<ChildStats>, AppError> {
    let stats = StatsService::new(Arc::clone(&state.store))
        .child_stats(family, child_id, StatsService::today())
        .await?;
    Ok(Json(stats))
}

/// GET /api/children/:id/calendar?year=2025&month=3
#[instrument(name = "calendar", skip(state))]
pub async fn calendar(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarMonth>, AppError> {
    let today = StatsService::today();
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());

    let calendar = StatsService::new(Arc::clone(&state.store))
        .calendar(family, child_id, year, month)
        .await?;
    Ok(Json(calendar))
}
