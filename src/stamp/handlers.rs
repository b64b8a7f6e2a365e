use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{
    issuer::StampIssuer,
    service::StampService,
    types::{IssueStampRequest, IssueStampResponse, OpenStampResponse, StampView},
};
use crate::family::FamilyId;
use crate::reward::RewardSelector;
use crate::shared::{AppError, AppState};

/// HTTP handler for issuing a stamp to a child
///
/// POST /api/children/:id/stamps
///
/// The body is optional. Failures are logged in full and reported with a
/// generic message.
#[instrument(name = "issue_stamp", skip(state, body))]
pub async fn issue_stamp(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
    body: Bytes,
) -> Result<(StatusCode, Json<IssueStampResponse>), AppError> {
    let request = parse_issue_request(&body)?;
    let issuer = StampIssuer::new(
        Arc::clone(&state.store),
        RewardSelector::new(Arc::clone(&state.dice)),
        state.config.max_comment_length,
    );

    match issuer.issue_stamp(family, child_id, request).await {
        Ok(response) => {
            info!(stamp_id = %response.stamp.id, "Stamp issued successfully");
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(e) => {
            error!(error = %e, child_id = %child_id, "Failed to issue stamp");
            Err(e.redacted("Failed to issue stamp"))
        }
    }
}

fn parse_issue_request(body: &[u8]) -> Result<IssueStampRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IssueStampRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

/// GET /api/children/:id/stamps
#[instrument(name = "list_stamps", skip(state))]
pub async fn list_stamps(
    State(state): State<AppState>,
    family: FamilyId,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Vec<StampView>>, AppError> {
    let stamps = StampService::new(Arc::clone(&state.store))
        .list_stamps(family, child_id)
        .await?;
    Ok(Json(stamps))
}

/// GET /api/stamps/:id
#[instrument(name = "get_stamp", skip(state))]
pub async fn get_stamp(
    State(state): State<AppState>,
    family: FamilyId,
    Path(stamp_id): Path<Uuid>,
) -> Result<Json<StampView>, AppError> {
    let stamp = StampService::new(Arc::clone(&state.store))
        .get_stamp(family, stamp_id)
        .await?;
    Ok(Json(stamp))
}

/// HTTP handler for revealing a stamp's reward
///
/// POST /api/stamps/:id/open
#[instrument(name = "open_stamp", skip(state))]
pub async fn open_stamp(
    State(state): State<AppState>,
    family: FamilyId,
    Path(stamp_id): Path<Uuid>,
) -> Result<Json<OpenStampResponse>, AppError> {
    let opened = StampService::new(Arc::clone(&state.store))
        .open_stamp(family, stamp_id)
        .await?;
    Ok(Json(opened))
}
