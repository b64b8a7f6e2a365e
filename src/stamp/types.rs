use serde::{Deserialize, Serialize};

use super::models::StampModel;
use crate::reward::RewardItem;
use crate::shared::AppError;

/// Request payload for issuing a stamp
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct IssueStampRequest {
    pub comment: Option<String>,
}

impl IssueStampRequest {
    /// Trimmed comment, `None` when blank; fails if longer than `max_length`
    pub fn validated_comment(&self, max_length: usize) -> Result<Option<String>, AppError> {
        let Some(comment) = self.comment.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if comment.is_empty() {
            return Ok(None);
        }
        if comment.chars().count() > max_length {
            return Err(AppError::Validation(format!(
                "Comment cannot exceed {max_length} characters"
            )));
        }
        Ok(Some(comment.to_string()))
    }
}

/// Card progress after an issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Stamps on the card the new stamp landed on
    pub progress: i32,
    pub target: i32,
    pub card_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_card_number: Option<i32>,
    /// The child's open card after the issuance
    pub current_card_number: i32,
}

/// Whether the reward bypassed the weighted draw, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialRewardInfo {
    pub is_special: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub is_card_completion: bool,
}

/// Response for stamp issuance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueStampResponse {
    pub stamp: StampModel,
    pub card_info: CardInfo,
    pub special_pokemon_info: SpecialRewardInfo,
    pub message: String,
}

/// A stamp as listed to callers; the reward stays hidden until opened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampView {
    #[serde(flatten)]
    pub stamp: StampModel,
    pub reward: Option<RewardItem>,
}

/// Response for revealing a stamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenStampResponse {
    pub stamp: StampModel,
    pub reward: RewardItem,
    /// False when the stamp had already been opened
    pub newly_opened: bool,
}
