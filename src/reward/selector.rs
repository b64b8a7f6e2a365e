use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    dice::Dice,
    models::{Rarity, RewardItem},
};
use crate::shared::AppError;

/// Upper bound of every percentage draw
pub const DRAW_RANGE: u32 = 100;

/// Override draw value that forces a mythical reward (1-in-100)
pub const MYTHICAL_OVERRIDE_DRAW: u32 = 1;

/// Cumulative tier boundaries for the default weighted draw:
/// mythical 5%, legendary 10%, normal 85%
pub const MYTHICAL_CUTOFF: u32 = 5;
pub const LEGENDARY_CUTOFF: u32 = 15;

/// Why a reward bypassed the default weighted draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialReward {
    MythicalOverride,
    CardCompletionLegendary,
}

impl SpecialReward {
    pub fn reason(&self) -> &'static str {
        match self {
            SpecialReward::MythicalOverride => "1-in-100 mythical",
            SpecialReward::CardCompletionLegendary => "card-completion legendary",
        }
    }
}

/// Outcome of a reward draw
#[derive(Debug, Clone, PartialEq)]
pub struct RewardSelection {
    pub item: RewardItem,
    pub special: Option<SpecialReward>,
}

/// Maps a default-mode draw in `1..=100` onto its tier
pub fn tier_for_draw(draw: u32) -> Rarity {
    if draw <= MYTHICAL_CUTOFF {
        Rarity::Mythical
    } else if draw <= LEGENDARY_CUTOFF {
        Rarity::Legendary
    } else {
        Rarity::Normal
    }
}

/// Chooses the reward carried by a new stamp.
///
/// Rules are checked in priority order and the first one that applies wins:
/// 1. a 1-in-100 override draw picks among mythical items,
/// 2. the stamp completing a card picks among legendary items,
/// 3. otherwise a weighted tier draw picks within the tier, falling back to
///    the normal tier when the drawn tier has no items.
pub struct RewardSelector {
    dice: Arc<dyn Dice>,
}

impl RewardSelector {
    pub fn new(dice: Arc<dyn Dice>) -> Self {
        Self { dice }
    }

    #[instrument(skip(self, catalog), fields(catalog_size = catalog.len()))]
    pub fn select_reward(
        &self,
        catalog: &[RewardItem],
        is_card_completion: bool,
    ) -> Result<RewardSelection, AppError> {
        let override_draw = self.dice.roll(1, DRAW_RANGE);
        if override_draw == MYTHICAL_OVERRIDE_DRAW {
            if let Some(item) = self.pick(catalog, Rarity::Mythical) {
                debug!(reward_id = item.id, "Mythical override fired");
                return Ok(RewardSelection {
                    item,
                    special: Some(SpecialReward::MythicalOverride),
                });
            }
            debug!("Mythical override fired but the mythical pool is empty");
        }

        if is_card_completion {
            let item = self.pick(catalog, Rarity::Legendary).ok_or_else(|| {
                AppError::NotFound("No legendary reward items available".to_string())
            })?;
            debug!(reward_id = item.id, "Card completion legendary selected");
            return Ok(RewardSelection {
                item,
                special: Some(SpecialReward::CardCompletionLegendary),
            });
        }

        let draw = self.dice.roll(1, DRAW_RANGE);
        let tier = tier_for_draw(draw);
        debug!(draw, tier = %tier, "Weighted tier draw");

        let item = match self.pick(catalog, tier) {
            Some(item) => Some(item),
            None if tier != Rarity::Normal => {
                debug!(tier = %tier, "Drawn tier is empty, falling back to normal");
                self.pick(catalog, Rarity::Normal)
            }
            None => None,
        }
        .ok_or_else(|| AppError::NotFound("No reward items available".to_string()))?;

        Ok(RewardSelection {
            item,
            special: None,
        })
    }

    /// Uniform pick among catalog items of one tier
    fn pick(&self, catalog: &[RewardItem], rarity: Rarity) -> Option<RewardItem> {
        let pool: Vec<&RewardItem> = catalog.iter().filter(|i| i.rarity == rarity).collect();
        if pool.is_empty() {
            return None;
        }
        let index = self.dice.roll(0, (pool.len() - 1) as u32) as usize;
        pool.get(index).map(|item| (*item).clone())
    }
}
