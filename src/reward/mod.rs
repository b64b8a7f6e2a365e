// Public API - what other modules can use
pub use catalog::{default_catalog, seed_catalog};
pub use dice::{Dice, ScriptedDice, ThreadRngDice};
pub use handlers::list_rewards;
pub use models::{Rarity, RewardItem};
pub use selector::{RewardSelection, RewardSelector, SpecialReward};

// Internal modules
mod catalog;
mod dice;
mod handlers;
pub mod models;
pub mod selector;
