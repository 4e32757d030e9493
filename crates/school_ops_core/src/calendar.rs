//! crates/school_ops_core/src/calendar.rs
//!
//! Month-grid construction and month navigation for the scheduling view.
//! Months are zero-based (0 = January) throughout.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A displayed (year, month) pair. Always normalized: `month` is in `0..12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthCursor {
    pub year: i32,
    pub month: u32,
}

impl MonthCursor {
    /// Builds a cursor, rolling out-of-range months into neighbouring years
    /// (`-1` is December of `year - 1`, `12` is January of `year + 1`). The year
    /// saturates at the ends of `i32`.
    pub fn new(year: i32, month: i32) -> Self {
        Self {
            year: year.saturating_add(month.div_euclid(12)),
            month: month.rem_euclid(12) as u32,
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    pub fn previous(self) -> Self {
        Self::new(self.year, self.month as i32 - 1)
    }

    pub fn next(self) -> Self {
        Self::new(self.year, self.month as i32 + 1)
    }

    /// `None` only for years outside chrono's supported range.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
    }

    /// Whether chrono can represent this month. Unsupported months have an empty grid.
    pub fn is_supported(self) -> bool {
        self.first_day().is_some()
    }

    /// 0 for an unsupported month.
    pub fn days_in_month(self) -> u32 {
        (28..=31)
            .rev()
            .find(|&day| NaiveDate::from_ymd_opt(self.year, self.month + 1, day).is_some())
            .unwrap_or(0)
    }

    /// Sunday-based weekday of day 1 (0 = Sunday).
    pub fn leading_blanks(self) -> usize {
        self.first_day()
            .map(|d| d.weekday().num_days_from_sunday() as usize)
            .unwrap_or(0)
    }

    /// ISO date string for `day` of this month.
    pub fn date_string(self, day: u32) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month + 1, day)
    }
}

/// Day cells for a month with `None` placeholders in front so the first day lands
/// in its weekday column.
pub fn build_month_grid(year: i32, month: i32) -> Vec<Option<u32>> {
    let cursor = MonthCursor::new(year, month);
    let blanks = cursor.leading_blanks();
    let days = cursor.days_in_month();

    let mut grid = Vec::with_capacity(blanks + days as usize);
    grid.extend(std::iter::repeat(None).take(blanks));
    grid.extend((1..=days).map(Some));
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_year_boundaries() {
        assert_eq!(MonthCursor::new(2024, -1), MonthCursor { year: 2023, month: 11 });
        assert_eq!(MonthCursor::new(2024, 12), MonthCursor { year: 2025, month: 0 });
        assert_eq!(MonthCursor::new(2024, 25), MonthCursor { year: 2026, month: 1 });
        assert_eq!(
            MonthCursor::new(2024, 0).previous(),
            MonthCursor { year: 2023, month: 11 }
        );
        assert_eq!(
            MonthCursor::new(2024, 11).next(),
            MonthCursor { year: 2025, month: 0 }
        );
    }

    #[test]
    fn days_in_month_follows_the_calendar() {
        assert_eq!(MonthCursor::new(2024, 1).days_in_month(), 29);
        assert_eq!(MonthCursor::new(2023, 1).days_in_month(), 28);
        assert_eq!(MonthCursor::new(1900, 1).days_in_month(), 28);
        assert_eq!(MonthCursor::new(2000, 1).days_in_month(), 29);
        assert_eq!(MonthCursor::new(2024, 3).days_in_month(), 30);
        assert_eq!(MonthCursor::new(2024, 11).days_in_month(), 31);
    }

    #[test]
    fn february_2024_starts_on_thursday() {
        let grid = build_month_grid(2024, 1);
        assert_eq!(grid.len(), 4 + 29);
        assert!(grid[..4].iter().all(Option::is_none));
        assert_eq!(grid[4], Some(1));
        assert_eq!(grid.last(), Some(&Some(29)));
    }

    #[test]
    fn month_starting_on_sunday_has_no_blanks() {
        // 2023-10-01 was a Sunday.
        let grid = build_month_grid(2023, 9);
        assert_eq!(grid[0], Some(1));
        assert_eq!(grid.len(), 31);
    }

    #[test]
    fn extreme_years_give_empty_grids_without_overflow() {
        assert_eq!(MonthCursor::new(i32::MAX, 12), MonthCursor { year: i32::MAX, month: 0 });
        assert_eq!(MonthCursor::new(i32::MIN, -1), MonthCursor { year: i32::MIN, month: 11 });
        assert_eq!(MonthCursor::new(i32::MAX, 11).next().year, i32::MAX);

        assert!(build_month_grid(i32::MAX, 11).is_empty());
        assert!(build_month_grid(i32::MIN, 0).is_empty());
        assert!(!MonthCursor::new(i32::MAX, 11).is_supported());

        // The last month chrono supports still has all of its days.
        let last = MonthCursor::containing(NaiveDate::MAX);
        assert!(last.is_supported());
        assert_eq!(last.days_in_month(), 31);
    }

    #[test]
    fn grid_is_idempotent() {
        assert_eq!(build_month_grid(2025, 6), build_month_grid(2025, 6));
    }

    #[test]
    fn date_string_is_zero_padded() {
        let cursor = MonthCursor::new(2024, 2);
        assert_eq!(cursor.date_string(5), "2024-03-05");
        let from_date = MonthCursor::containing(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(from_date, cursor);
    }
}
