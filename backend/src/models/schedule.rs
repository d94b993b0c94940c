//! Schedule transforms
//!
//! Pure `&Roster -> Roster` functions producing alternative teaching plans
//! from a base roster. The input roster is never modified.
//!
//! Weeks are counted in 7-day blocks starting at the roster's first
//! scheduled date.

use chrono::NaiveDate;
use log::debug;

use crate::models::roster::{IndividualId, MeetingKind, Roster, RosterBuilder, RosterError};

/// Zero-based week index of `date` relative to `origin`
fn week_of(origin: NaiveDate, date: NaiveDate) -> i64 {
    (date - origin).num_days().div_euclid(7)
}

/// Hybrid schedule: half of the courses are online each week
///
/// Courses are numbered by their position in the roster. Even-numbered
/// courses meet in person on odd weeks only, odd-numbered courses on even
/// weeks only. Non-course meetings are unchanged.
pub fn alternate_hybrid(roster: &Roster) -> Result<Roster, RosterError> {
    let Some(origin) = roster.first_date() else {
        return Ok(roster.clone());
    };

    let mut builder = RosterBuilder::from_roster(roster);
    for (position, meeting) in roster.meetings().enumerate() {
        if meeting.kind() != MeetingKind::Course {
            continue;
        }
        let in_person_parity = if position % 2 == 1 { 0 } else { 1 };
        for (date, schedule) in roster.calendar() {
            if schedule.contains_key(&meeting.id())
                && week_of(origin, *date).rem_euclid(2) != in_person_parity
            {
                builder.clear_occurrence(*date, meeting.id());
            }
        }
    }
    debug!("Built hybrid schedule over {} meetings", roster.num_meetings());
    builder.build()
}

/// Split every course into two sections meeting on alternate weeks
///
/// Members are dealt alternately (in id order) into "`name` W1", which
/// keeps the course's first-week occurrences, and "`name` W2", which
/// keeps the second-week ones. Empty sections are not created.
pub fn split_classes(roster: &Roster) -> Result<Roster, RosterError> {
    let Some(origin) = roster.first_date() else {
        return Ok(roster.clone());
    };

    let mut builder = RosterBuilder::from_roster(roster);
    for meeting in roster.meetings() {
        if meeting.kind() != MeetingKind::Course {
            continue;
        }
        let members: Vec<IndividualId> = roster.members(meeting.id()).iter().copied().collect();
        let occurrences: Vec<(NaiveDate, u32)> = roster
            .calendar()
            .filter_map(|(date, schedule)| {
                schedule.get(&meeting.id()).map(|minutes| (*date, *minutes))
            })
            .collect();
        let label = meeting.declared_label().map(str::to_string);

        builder.remove_meeting(meeting.id());
        for section in 0..2usize {
            let section_members: Vec<IndividualId> = members
                .iter()
                .skip(section)
                .step_by(2)
                .copied()
                .collect();
            if section_members.is_empty() {
                continue;
            }
            let section_dates = occurrences
                .iter()
                .filter(|(date, _)| week_of(origin, *date).rem_euclid(2) == section as i64)
                .copied();
            builder.insert_meeting(
                &format!("{} W{}", meeting.name(), section + 1),
                meeting.kind(),
                label.clone(),
                section_members,
                section_dates,
            );
        }
    }
    debug!("Split courses of {} meetings into weekly sections", roster.num_meetings());
    builder.build()
}

/// Cancel every course with more than `max_size` members
pub fn small_classes_only(roster: &Roster, max_size: usize) -> Result<Roster, RosterError> {
    let mut builder = RosterBuilder::from_roster(roster);
    let mut cancelled = 0;
    for meeting in roster.meetings() {
        if meeting.kind() == MeetingKind::Course && roster.members(meeting.id()).len() > max_size
        {
            builder.remove_meeting(meeting.id());
            cancelled += 1;
        }
    }
    debug!("Cancelled {} courses larger than {}", cancelled, max_size);
    builder.build()
}
