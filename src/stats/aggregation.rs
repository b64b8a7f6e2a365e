//! Pure aggregations over a child's stamps.
//!
//! Every function takes stamps already loaded from the store and never
//! touches persistence. Days are UTC calendar days of `stamped_at`.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use strum::IntoEnumIterator;

use super::models::{CalendarDay, CalendarMonth, CollectionProgress, TierCollection};
use crate::reward::{Rarity, RewardItem};
use crate::shared::AppError;
use crate::stamp::models::StampModel;

pub fn group_by_day(stamps: &[StampModel]) -> BTreeMap<NaiveDate, Vec<StampModel>> {
    let mut days: BTreeMap<NaiveDate, Vec<StampModel>> = BTreeMap::new();
    for stamp in stamps {
        days.entry(stamp.stamped_at.date_naive())
            .or_default()
            .push(stamp.clone());
    }
    days
}

/// Distinct days with at least one stamp
pub fn stamp_days(stamps: &[StampModel]) -> BTreeSet<NaiveDate> {
    stamps
        .iter()
        .map(|stamp| stamp.stamped_at.date_naive())
        .collect()
}

/// Builds the month grid. Fails with Validation for an impossible month.
pub fn calendar_month(
    year: i32,
    month: u32,
    stamps: &[StampModel],
) -> Result<CalendarMonth, AppError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        AppError::Validation(format!("Invalid calendar month {year}-{month}"))
    })?;

    let by_day = group_by_day(stamps);
    let days: Vec<CalendarDay> = first
        .iter_days()
        .take_while(|date| date.month() == month)
        .map(|date| {
            let stamps = by_day.get(&date).map(Vec::as_slice).unwrap_or_default();
            CalendarDay {
                date,
                stamp_count: stamps.len(),
                opened_count: stamps.iter().filter(|s| s.is_opened()).count(),
                stamp_ids: stamps.iter().map(|s| s.id).collect(),
            }
        })
        .collect();

    Ok(CalendarMonth {
        year,
        month,
        total_stamps: days.iter().map(|day| day.stamp_count).sum(),
        days,
    })
}

/// Stamps per tier, with every tier present. Stamps whose item is missing
/// from the catalog are skipped.
pub fn rarity_breakdown(stamps: &[StampModel], catalog: &[RewardItem]) -> BTreeMap<Rarity, usize> {
    let rarity_of: HashMap<i32, Rarity> = catalog.iter().map(|i| (i.id, i.rarity)).collect();
    let mut breakdown: BTreeMap<Rarity, usize> = Rarity::iter().map(|r| (r, 0)).collect();

    for rarity in stamps
        .iter()
        .filter_map(|stamp| rarity_of.get(&stamp.reward_item_id))
    {
        *breakdown.entry(*rarity).or_default() += 1;
    }
    breakdown
}

pub fn collection_progress(stamps: &[StampModel], catalog: &[RewardItem]) -> CollectionProgress {
    let owned: HashSet<i32> = stamps.iter().map(|stamp| stamp.reward_item_id).collect();
    let mut by_rarity: BTreeMap<Rarity, TierCollection> =
        Rarity::iter().map(|r| (r, TierCollection::default())).collect();

    for item in catalog {
        let tier = by_rarity.entry(item.rarity).or_default();
        tier.total += 1;
        if owned.contains(&item.id) {
            tier.collected += 1;
        }
    }

    CollectionProgress {
        unique_collected: by_rarity.values().map(|tier| tier.collected).sum(),
        total_items: catalog.len(),
        by_rarity,
    }
}

/// Consecutive stamped days ending today. A streak that last stamped
/// yesterday is still running.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut day = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        run = match previous {
            Some(prev) if *day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stamp_on(y: i32, m: u32, d: u32, reward_id: i32) -> StampModel {
        let mut stamp = StampModel::new(Uuid::nil(), reward_id, None);
        stamp.stamped_at = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        stamp
    }

    fn catalog() -> Vec<RewardItem> {
        vec![
            RewardItem::new(1, "Bulbasaur", Rarity::Normal),
            RewardItem::new(4, "Charmander", Rarity::Normal),
            RewardItem::new(150, "Mewtwo", Rarity::Legendary),
            RewardItem::new(151, "Mew", Rarity::Mythical),
        ]
    }

    #[test]
    fn test_group_by_day() {
        let stamps = vec![
            stamp_on(2025, 3, 1, 1),
            stamp_on(2025, 3, 1, 4),
            stamp_on(2025, 3, 4, 1),
        ];
        let days = group_by_day(&stamps);

        assert_eq!(days.len(), 2);
        assert_eq!(days[&date(2025, 3, 1)].len(), 2);
        assert_eq!(days[&date(2025, 3, 4)].len(), 1);
    }

    #[rstest]
    #[case(2025, 2, 28)]
    #[case(2024, 2, 29)]
    #[case(2025, 4, 30)]
    #[case(2025, 12, 31)]
    fn test_calendar_month_covers_every_day(
        #[case] year: i32,
        #[case] month: u32,
        #[case] expected_days: usize,
    ) {
        let calendar = calendar_month(year, month, &[]).unwrap();
        assert_eq!(calendar.days.len(), expected_days);
        assert_eq!(calendar.days[0].date, date(year, month, 1));
        assert_eq!(calendar.total_stamps, 0);
    }

    #[test]
    fn test_calendar_month_counts_stamps() {
        let mut opened = stamp_on(2025, 3, 2, 1);
        opened.opened_at = Some(opened.stamped_at);
        let stamps = vec![
            stamp_on(2025, 2, 28, 1),
            opened.clone(),
            stamp_on(2025, 3, 2, 4),
        ];

        let calendar = calendar_month(2025, 3, &stamps).unwrap();
        let day = &calendar.days[1];

        assert_eq!(calendar.total_stamps, 2);
        assert_eq!(day.stamp_count, 2);
        assert_eq!(day.opened_count, 1);
        assert!(day.stamp_ids.contains(&opened.id));
    }

    #[rstest]
    #[case(2025, 0)]
    #[case(2025, 13)]
    fn test_calendar_month_rejects_bad_month(#[case] year: i32, #[case] month: u32) {
        assert!(matches!(
            calendar_month(year, month, &[]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_rarity_breakdown_lists_every_tier() {
        let stamps = vec![
            stamp_on(2025, 3, 1, 1),
            stamp_on(2025, 3, 2, 1),
            stamp_on(2025, 3, 3, 150),
            stamp_on(2025, 3, 4, 999),
        ];
        let breakdown = rarity_breakdown(&stamps, &catalog());

        assert_eq!(breakdown[&Rarity::Normal], 2);
        assert_eq!(breakdown[&Rarity::Legendary], 1);
        assert_eq!(breakdown[&Rarity::Mythical], 0);
    }

    #[test]
    fn test_collection_progress_counts_distinct_items() {
        let stamps = vec![
            stamp_on(2025, 3, 1, 1),
            stamp_on(2025, 3, 2, 1),
            stamp_on(2025, 3, 3, 151),
        ];
        let progress = collection_progress(&stamps, &catalog());

        assert_eq!(progress.unique_collected, 2);
        assert_eq!(progress.total_items, 4);
        assert_eq!(
            progress.by_rarity[&Rarity::Normal],
            TierCollection {
                collected: 1,
                total: 2
            }
        );
        assert_eq!(progress.by_rarity[&Rarity::Legendary].collected, 0);
        assert_eq!(progress.by_rarity[&Rarity::Mythical].collected, 1);
    }

    #[rstest]
    #[case(vec![], date(2025, 3, 10), 0)]
    #[case(vec![date(2025, 3, 10)], date(2025, 3, 10), 1)]
    #[case(vec![date(2025, 3, 8), date(2025, 3, 9)], date(2025, 3, 10), 2)]
    #[case(vec![date(2025, 3, 7), date(2025, 3, 8)], date(2025, 3, 10), 0)]
    #[case(vec![date(2025, 2, 28), date(2025, 3, 1), date(2025, 3, 2)], date(2025, 3, 2), 3)]
    fn test_current_streak(
        #[case] days: Vec<NaiveDate>,
        #[case] today: NaiveDate,
        #[case] expected: u32,
    ) {
        let days: BTreeSet<NaiveDate> = days.into_iter().collect();
        assert_eq!(current_streak(&days, today), expected);
    }

    #[test]
    fn test_longest_streak() {
        let days: BTreeSet<NaiveDate> = [
            date(2025, 1, 1),
            date(2025, 1, 2),
            date(2025, 1, 5),
            date(2025, 1, 6),
            date(2025, 1, 7),
            date(2025, 1, 9),
        ]
        .into_iter()
        .collect();

        assert_eq!(longest_streak(&days), 3);
        assert_eq!(longest_streak(&BTreeSet::new()), 0);
    }
}
