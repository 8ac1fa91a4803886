//! Event calendar arithmetic: grand-prix and season-grade ids, rank targets,
//! and the `dayN_` prefix used for export file names.

use chrono::NaiveDate;

use crate::app_config::BattleType;

/// Period number of the grand-prix cycle that started in April 2025.
const PERIOD_NUMBER: u32 = 5;
const PERIOD_START_YEAR: i32 = 2025;
const PERIOD_START_MONTH: u32 = 4;

const GRADE_BASE_YEAR: i32 = 2025;
const GRADE_BASE_MONTH: u32 = 5;
const GRADE_BASE_ID: u32 = 1_005_006;

/// Returns the starting offsets needed to cover ranks `1..=target_count`
/// with pages of `step` entries: `1, 1 + step, 1 + 2·step, …`.
///
/// A `step` of zero is treated as one.
#[must_use]
pub fn generate_rank_targets(target_count: u32, step: u32) -> Vec<u32> {
    let step = step.max(1);
    let mut targets = Vec::new();
    let mut current = 1u32;
    while current <= target_count {
        targets.push(current);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    targets
}

/// Computes the grand-prix event id for a calendar month.
///
/// The id has the shape `pSS1MM`: `p` is 8 for personal and 7 for guild
/// battles, `SS` the period number, `MM` the month within the period
/// (01 to 12). Months before the period started map to month 01.
#[must_use]
pub fn grand_prix_event_id(battle: BattleType, year: i32, month: u32) -> u32 {
    let total_months =
        i64::from(year - PERIOD_START_YEAR) * 12 + i64::from(month) - i64::from(PERIOD_START_MONTH) + 1;
    let month_in_period = if total_months <= 0 {
        1
    } else {
        u32::try_from((total_months - 1) % 12 + 1).unwrap_or(1)
    };
    battle.event_prefix() * 100_000 + PERIOD_NUMBER * 1_000 + 100 + month_in_period
}

/// Computes the season-grade ladder id for a calendar month.
///
/// May 2025 is `1005006`; the id advances by one every two months. Earlier
/// months clamp to the base id.
#[must_use]
pub fn grade_id_for(year: i32, month: u32) -> u32 {
    let total_months =
        i64::from(year - GRADE_BASE_YEAR) * 12 + i64::from(month) - i64::from(GRADE_BASE_MONTH);
    if total_months < 0 {
        return GRADE_BASE_ID;
    }
    let increment = u32::try_from(total_months / 2).unwrap_or(u32::MAX - GRADE_BASE_ID);
    GRADE_BASE_ID.saturating_add(increment)
}

/// Returns the `dayN_` file-name prefix for a run on `today` of an event
/// that started on `event_start` (the start day is day 1).
///
/// Previous-day rankings describe yesterday, so `N` is reduced by one but
/// never below 1. Before the event starts the prefix is empty.
#[must_use]
pub fn day_prefix(event_start: NaiveDate, today: NaiveDate, previous_day: bool) -> String {
    if today < event_start {
        return String::new();
    }
    let mut day = (today - event_start).num_days() + 1;
    if previous_day && day > 1 {
        day -= 1;
    }
    format!("day{day}_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rank_targets_cover_target_count() {
        assert_eq!(generate_rank_targets(100, 26), vec![1, 27, 53, 79]);
    }

    #[test]
    fn rank_targets_include_exact_boundary() {
        assert_eq!(generate_rank_targets(53, 26), vec![1, 27, 53]);
    }

    #[test]
    fn rank_targets_empty_for_zero() {
        assert!(generate_rank_targets(0, 26).is_empty());
    }

    #[test]
    fn rank_targets_do_not_overflow() {
        let targets = generate_rank_targets(u32::MAX, u32::MAX);
        assert_eq!(targets, vec![1]);
    }

    #[test]
    fn event_id_first_month_of_period() {
        assert_eq!(grand_prix_event_id(BattleType::Personal, 2025, 4), 805_101);
        assert_eq!(grand_prix_event_id(BattleType::Guild, 2025, 4), 705_101);
    }

    #[test]
    fn event_id_later_month() {
        assert_eq!(grand_prix_event_id(BattleType::Personal, 2025, 6), 805_103);
        assert_eq!(grand_prix_event_id(BattleType::Personal, 2026, 3), 805_112);
    }

    #[test]
    fn event_id_wraps_after_twelve_months() {
        assert_eq!(grand_prix_event_id(BattleType::Personal, 2026, 4), 805_101);
    }

    #[test]
    fn event_id_before_period_clamps_to_first_month() {
        assert_eq!(grand_prix_event_id(BattleType::Guild, 2025, 1), 705_101);
    }

    #[test]
    fn grade_id_base_and_increments() {
        assert_eq!(grade_id_for(2025, 5), 1_005_006);
        assert_eq!(grade_id_for(2025, 6), 1_005_006);
        assert_eq!(grade_id_for(2025, 7), 1_005_007);
        assert_eq!(grade_id_for(2026, 1), 1_005_010);
    }

    #[test]
    fn grade_id_before_base_clamps() {
        assert_eq!(grade_id_for(2025, 4), 1_005_006);
        assert_eq!(grade_id_for(2024, 12), 1_005_006);
    }

    #[test]
    fn day_prefix_counts_from_start() {
        assert_eq!(day_prefix(date(2025, 6, 1), date(2025, 6, 1), false), "day1_");
        assert_eq!(day_prefix(date(2025, 6, 1), date(2025, 6, 5), false), "day5_");
    }

    #[test]
    fn day_prefix_previous_day() {
        assert_eq!(day_prefix(date(2025, 6, 1), date(2025, 6, 5), true), "day4_");
        assert_eq!(day_prefix(date(2025, 6, 1), date(2025, 6, 1), true), "day1_");
    }

    #[test]
    fn day_prefix_before_start_is_empty() {
        assert_eq!(day_prefix(date(2025, 6, 10), date(2025, 6, 5), false), "");
    }
}
