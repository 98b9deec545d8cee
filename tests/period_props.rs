use chrono::{Datelike, Days, NaiveDate, Weekday};
use mahiti_dashboard::period::{
    Frequency, PeriodBounds, compute_daily_periods, compute_periods, dates_between, format_date,
    monday_of, weeks_between, years_between,
};
use proptest::prelude::*;

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.checked_add_days(Days::new(offset)))
        .unwrap()
}

proptest! {
    #[test]
    fn prop_dates_between_is_inclusive(start in 0..20_000u64, span in 0..400u64) {
        let s = day(start);
        let e = day(start + span);
        let days = dates_between(&format_date(s), &format_date(e));

        prop_assert_eq!(days.len() as u64, span + 1);
        prop_assert_eq!(days.first().cloned(), Some(format_date(s)));
        prop_assert_eq!(days.last().cloned(), Some(format_date(e)));
    }

    #[test]
    fn prop_reversed_range_is_empty(start in 0..20_000u64, span in 1..400u64) {
        let s = format_date(day(start));
        let e = format_date(day(start + span));
        prop_assert!(dates_between(&e, &s).is_empty());
    }

    #[test]
    fn prop_monday_of_is_idempotent(offset in 0..20_000u64) {
        let d = format_date(day(offset));
        let monday = monday_of(&d).unwrap();

        prop_assert_eq!(monday_of(&monday), Some(monday.clone()));
        let parsed = NaiveDate::parse_from_str(&monday, "%Y-%m-%d").unwrap();
        prop_assert_eq!(parsed.weekday(), Weekday::Mon);
        prop_assert!(monday <= d);
    }

    #[test]
    fn prop_weeks_are_seven_days_apart(start in 0..20_000u64, span in 0..200u64) {
        let s = format_date(day(start));
        let e = format_date(day(start + span));
        let weeks = weeks_between(&s, &e);

        prop_assert_eq!(weeks.first().cloned(), monday_of(&s));
        prop_assert_eq!(weeks.last().cloned(), monday_of(&e));
        for pair in weeks.windows(2) {
            let a = NaiveDate::parse_from_str(&pair[0], "%Y-%m-%d").unwrap();
            let b = NaiveDate::parse_from_str(&pair[1], "%Y-%m-%d").unwrap();
            prop_assert_eq!((b - a).num_days(), 7);
        }
    }

    #[test]
    fn prop_daily_periods_stay_inside_the_month(year in 1990..2100i32, month in 1..=12u32) {
        let days = compute_daily_periods(year, &month.to_string(), None, None);
        let prefix = format!("{}-{:02}-", year, month);

        prop_assert!(days.len() >= 28 && days.len() <= 31);
        prop_assert!(days.iter().all(|d| d.starts_with(&prefix)));
        prop_assert_eq!(days[0].clone(), format!("{}01", prefix));
    }
}

#[test]
fn years_between_is_inclusive_and_ordered() {
    assert_eq!(
        years_between("2020", "2023"),
        vec!["2020", "2021", "2022", "2023"]
    );
    assert!(years_between("2023", "2020").is_empty());
}

#[test]
fn leap_february_has_29_days() {
    let days = compute_daily_periods(2024, "02", None, None);
    assert_eq!(days.len(), 29);
    assert_eq!(days.first().map(String::as_str), Some("2024-02-01"));
    assert_eq!(days.last().map(String::as_str), Some("2024-02-29"));
}

#[test]
fn every_frequency_ignores_unselected_pickers() {
    for frequency in Frequency::ALL {
        assert!(
            compute_periods(frequency, &PeriodBounds::default()).is_empty(),
            "{} produced periods with nothing selected",
            frequency
        );
    }
}

#[test]
fn weekly_identifiers_from_bounds() {
    let bounds = PeriodBounds {
        start_date: Some("2024-03-06".into()),
        end_date: Some("2024-03-18".into()),
        ..Default::default()
    };
    assert_eq!(
        compute_periods(Frequency::Weekly, &bounds),
        vec!["week_2024-03-04", "week_2024-03-11", "week_2024-03-18"]
    );
}
