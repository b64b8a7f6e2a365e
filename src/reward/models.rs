use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::EnumIter;

/// Rarity tier of a reward item, ordered from most to least common
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Normal,
    Legendary,
    Mythical,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Normal => "normal",
            Rarity::Legendary => "legendary",
            Rarity::Mythical => "mythical",
        }
    }

    pub fn is_rare(&self) -> bool {
        !matches!(self, Rarity::Normal)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Rarity {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "normal" => Ok(Rarity::Normal),
            "legendary" => Ok(Rarity::Legendary),
            "mythical" => Ok(Rarity::Mythical),
            _ => Err(s.to_string()),
        }
    }
}

/// Catalog entry revealed by a stamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardItem {
    pub id: i32,
    pub name: String,
    pub rarity: Rarity,
}

impl RewardItem {
    pub fn new(id: i32, name: &str, rarity: Rarity) -> Self {
        Self {
            id,
            name: name.to_string(),
            rarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_rarity_string_round_trip() {
        for rarity in Rarity::iter() {
            assert_eq!(Rarity::try_from(rarity.as_str()), Ok(rarity));
        }
        assert!(Rarity::try_from("shiny").is_err());
    }

    #[test]
    fn test_rarity_serializes_lowercase() {
        let json = serde_json::to_string(&Rarity::Mythical).unwrap();
        assert_eq!(json, "\"mythical\"");
    }

    #[test]
    fn test_only_normal_is_common() {
        assert!(!Rarity::Normal.is_rare());
        assert!(Rarity::Legendary.is_rare());
        assert!(Rarity::Mythical.is_rare());
    }
}
