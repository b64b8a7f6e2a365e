use tracing::{info, instrument};

use super::models::{Rarity, RewardItem};
use crate::shared::AppError;
use crate::store::StampStore;

const NORMAL: &[(i32, &str)] = &[
    (1, "Bulbasaur"),
    (4, "Charmander"),
    (7, "Squirtle"),
    (10, "Caterpie"),
    (16, "Pidgey"),
    (19, "Rattata"),
    (25, "Pikachu"),
    (35, "Clefairy"),
    (39, "Jigglypuff"),
    (43, "Oddish"),
    (52, "Meowth"),
    (54, "Psyduck"),
    (58, "Growlithe"),
    (60, "Poliwag"),
    (63, "Abra"),
    (66, "Machop"),
    (74, "Geodude"),
    (77, "Ponyta"),
    (79, "Slowpoke"),
    (92, "Gastly"),
    (104, "Cubone"),
    (113, "Chansey"),
    (129, "Magikarp"),
    (131, "Lapras"),
    (133, "Eevee"),
    (137, "Porygon"),
    (143, "Snorlax"),
    (147, "Dratini"),
    (152, "Chikorita"),
    (155, "Cyndaquil"),
    (158, "Totodile"),
    (175, "Togepi"),
];

const LEGENDARY: &[(i32, &str)] = &[
    (144, "Articuno"),
    (145, "Zapdos"),
    (146, "Moltres"),
    (150, "Mewtwo"),
    (243, "Raikou"),
    (244, "Entei"),
    (245, "Suicune"),
    (249, "Lugia"),
    (250, "Ho-Oh"),
    (382, "Kyogre"),
    (383, "Groudon"),
    (384, "Rayquaza"),
];

const MYTHICAL: &[(i32, &str)] = &[
    (151, "Mew"),
    (251, "Celebi"),
    (385, "Jirachi"),
    (386, "Deoxys"),
    (490, "Manaphy"),
    (492, "Shaymin"),
];

/// Built-in reward catalog seeded into an empty store
pub fn default_catalog() -> Vec<RewardItem> {
    let tiers = [
        (NORMAL, Rarity::Normal),
        (LEGENDARY, Rarity::Legendary),
        (MYTHICAL, Rarity::Mythical),
    ];

    let mut items: Vec<RewardItem> = tiers
        .iter()
        .flat_map(|(entries, rarity)| {
            entries
                .iter()
                .map(move |(id, name)| RewardItem::new(*id, name, *rarity))
        })
        .collect();
    items.sort_by_key(|item| item.id);
    items
}

/// Upserts the built-in catalog. Safe to run on every startup.
#[instrument(skip(store))]
pub async fn seed_catalog(store: &dyn StampStore) -> Result<usize, AppError> {
    let items = default_catalog();
    let mut tx = store.begin().await?;
    for item in &items {
        tx.upsert_reward_item(item).await?;
    }
    tx.commit().await?;

    info!(item_count = items.len(), "Reward catalog seeded");
    Ok(items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[tokio::test]
    async fn test_seeding_twice_keeps_one_copy() {
        let store = crate::store::InMemoryStore::new();
        seed_catalog(&store).await.unwrap();
        let seeded = seed_catalog(&store).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let items = tx.list_reward_items().await.unwrap();
        assert_eq!(items.len(), seeded);
    }

    #[test]
    fn test_default_catalog_ids_unique() {
        let catalog = default_catalog();
        let ids: HashSet<i32> = catalog.iter().map(|item| item.id).collect();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn test_default_catalog_covers_every_tier() {
        let catalog = default_catalog();
        for rarity in Rarity::iter() {
            assert!(
                catalog.iter().any(|item| item.rarity == rarity),
                "missing {rarity} items"
            );
        }
    }
}
