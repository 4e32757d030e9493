use chrono::{Datelike, NaiveDate};
use school_ops_core::{build_month_grid, MonthCursor};

#[test]
fn grid_length_is_blanks_plus_days_for_every_month() {
    for year in [1999, 2000, 2023, 2024, 2100] {
        for month in 0..12 {
            let grid = build_month_grid(year, month);
            let first = NaiveDate::from_ymd_opt(year, month as u32 + 1, 1).unwrap();
            let blanks = first.weekday().num_days_from_sunday() as usize;
            let days = MonthCursor::new(year, month).days_in_month() as usize;

            assert_eq!(grid.len(), blanks + days, "{}-{}", year, month);
            assert!(grid[..blanks].iter().all(Option::is_none));
            let numbered: Vec<u32> = grid[blanks..].iter().map(|d| d.unwrap()).collect();
            assert_eq!(numbered, (1..=days as u32).collect::<Vec<_>>());
        }
    }
}

#[test]
fn leap_february_2024() {
    let grid = build_month_grid(2024, 1);
    assert_eq!(grid.iter().filter(|d| d.is_some()).count(), 29);
    assert_eq!(grid.iter().take_while(|d| d.is_none()).count(), 4);
}

#[test]
fn out_of_range_months_roll_over() {
    assert_eq!(build_month_grid(2024, -1), build_month_grid(2023, 11));
    assert_eq!(build_month_grid(2024, 12), build_month_grid(2025, 0));
}
