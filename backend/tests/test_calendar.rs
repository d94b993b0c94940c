//! Tests for the simulation calendar

use campus_seir_core::core::calendar::{add_days, next_day, sub_days};
use campus_seir_core::SimulationClock;
use chrono::NaiveDate;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, m, d).unwrap()
}

#[test]
fn test_clock_visits_every_day_inclusive() {
    let mut clock = SimulationClock::new(date(9, 2), date(11, 13));
    assert_eq!(clock.num_days(), 73);

    let mut visited = 0;
    while !clock.is_finished() {
        visited += 1;
        clock.advance_day();
    }
    assert_eq!(visited, 73);
    assert_eq!(clock.current_date(), date(11, 14));
}

#[test]
fn test_single_day_clock() {
    let mut clock = SimulationClock::new(date(9, 2), date(9, 2));
    assert!(clock.is_last_day());
    assert!(!clock.is_finished());
    clock.advance_day();
    assert!(clock.is_finished());
}

#[test]
fn test_weekday_index_is_monday_based() {
    // 2020-09-07 is a Monday
    let mut clock = SimulationClock::new(date(9, 7), date(9, 13));
    let mut weekdays = Vec::new();
    while !clock.is_finished() {
        weekdays.push(clock.weekday_index());
        clock.advance_day();
    }
    assert_eq!(weekdays, vec![0, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_date_arithmetic_crosses_months() {
    assert_eq!(add_days(date(9, 28), 14), date(10, 12));
    assert_eq!(next_day(date(9, 30)), date(10, 1));
    assert_eq!(sub_days(date(10, 2), 3), date(9, 29));
}

#[test]
#[should_panic(expected = "start date must not be after end date")]
fn test_inverted_clock_panics() {
    SimulationClock::new(date(9, 3), date(9, 2));
}
