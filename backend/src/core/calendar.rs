//! Calendar management for the simulation
//!
//! The simulation advances in whole days, from a start date to an end date
//! (both inclusive). This module provides deterministic date advancement.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Manages the simulated date between a start and an end date
///
/// # Example
/// ```
/// use campus_seir_core::SimulationClock;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2020, 9, 2).unwrap();
/// let end = NaiveDate::from_ymd_opt(2020, 9, 4).unwrap();
/// let mut clock = SimulationClock::new(start, end);
/// assert_eq!(clock.current_day(), 0);
///
/// clock.advance_day();
/// assert_eq!(clock.current_day(), 1);
/// assert!(!clock.is_finished());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    /// First simulated date
    start: NaiveDate,
    /// Last simulated date (inclusive)
    end: NaiveDate,
    /// Date currently being simulated
    current: NaiveDate,
}

impl SimulationClock {
    /// Create a new clock positioned at `start`
    ///
    /// # Panics
    /// Panics if `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        assert!(start <= end, "start date must not be after end date");
        Self {
            start,
            end,
            current: start,
        }
    }

    /// Advance the clock by one day
    pub fn advance_day(&mut self) {
        self.current = next_day(self.current);
    }

    /// Date currently being simulated
    pub fn current_date(&self) -> NaiveDate {
        self.current
    }

    /// Days elapsed since the start date (0-indexed)
    ///
    /// # Example
    /// ```
    /// use campus_seir_core::SimulationClock;
    /// use chrono::NaiveDate;
    ///
    /// let start = NaiveDate::from_ymd_opt(2020, 9, 2).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2020, 11, 13).unwrap();
    /// let mut clock = SimulationClock::new(start, end);
    /// for _ in 0..7 {
    ///     clock.advance_day();
    /// }
    /// assert_eq!(clock.current_day(), 7);
    /// ```
    pub fn current_day(&self) -> usize {
        (self.current - self.start).num_days() as usize
    }

    /// Weekday of the current date, 0 = Monday ... 6 = Sunday
    pub fn weekday_index(&self) -> u32 {
        self.current.weekday().num_days_from_monday()
    }

    /// True once the clock has moved past the end date
    pub fn is_finished(&self) -> bool {
        self.current > self.end
    }

    /// True while the current date is the last simulated date
    pub fn is_last_day(&self) -> bool {
        self.current == self.end
    }

    /// First simulated date
    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// Last simulated date (inclusive)
    pub fn end_date(&self) -> NaiveDate {
        self.end
    }

    /// Total number of simulated days, counting both ends
    pub fn num_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }
}

/// `date + days`, saturating at the last representable date
pub fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

/// The day after `date`
pub fn next_day(date: NaiveDate) -> NaiveDate {
    add_days(date, 1)
}

/// `date - days`, saturating at the first representable date
pub fn sub_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}
