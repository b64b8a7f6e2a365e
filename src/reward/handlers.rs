use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::models::{Rarity, RewardItem};
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct RewardQuery {
    pub rarity: Option<String>,
}

/// HTTP handler for browsing the reward catalog
///
/// GET /api/rewards?rarity=legendary
#[instrument(name = "list_rewards", skip(state))]
pub async fn list_rewards(
    State(state): State<AppState>,
    Query(query): Query<RewardQuery>,
) -> Result<Json<Vec<RewardItem>>, AppError> {
    let rarity = query
        .rarity
        .as_deref()
        .map(|raw| {
            Rarity::try_from(raw)
                .map_err(|value| AppError::Validation(format!("Unknown rarity '{value}'")))
        })
        .transpose()?;

    let mut tx = state.store.begin().await?;
    let items: Vec<RewardItem> = tx
        .list_reward_items()
        .await?
        .into_iter()
        .filter(|item| rarity.map_or(true, |r| item.rarity == r))
        .collect();

    debug!(item_count = items.len(), "Reward catalog listed");
    Ok(Json(items))
}
