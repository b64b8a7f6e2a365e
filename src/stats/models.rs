use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::card::CardSummary;
use crate::reward::Rarity;

/// Stamp activity on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub stamp_count: usize,
    pub opened_count: usize,
    pub stamp_ids: Vec<Uuid>,
}

/// Every day of one month, including days without stamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub total_stamps: usize,
    pub days: Vec<CalendarDay>,
}

/// Distinct items collected out of one tier of the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCollection {
    pub collected: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionProgress {
    pub unique_collected: usize,
    pub total_items: usize,
    pub by_rarity: BTreeMap<Rarity, TierCollection>,
}

/// Dashboard figures for one child
#[derive(Debug, Clone, Serialize)]
pub struct ChildStats {
    pub child_id: Uuid,
    pub total_stamps: usize,
    pub opened_stamps: usize,
    pub unopened_stamps: usize,
    pub completed_cards: usize,
    pub current_card: Option<CardSummary>,
    /// Counted over opened stamps only
    pub rarity_breakdown: BTreeMap<Rarity, usize>,
    pub collection: CollectionProgress,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub first_stamp_at: Option<DateTime<Utc>>,
    pub last_stamp_at: Option<DateTime<Utc>>,
}
