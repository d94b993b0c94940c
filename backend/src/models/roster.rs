//! Roster model
//!
//! Static description of one population: the individuals, the meetings they
//! are enrolled in, and the calendar of meeting occurrences (which meetings
//! happen on which dates, and for how many minutes).
//!
//! A `Roster` is immutable once built. Runs share it through an `Arc`, and
//! schedule variants are produced as new rosters (see `models::schedule`).
//!
//! # Critical Invariants
//!
//! 1. **Mirrored Enrollment**: `i ∈ members(m)` ⟺ `m ∈ enrollment(i)`
//! 2. **Known References**: every occurrence and enrollment names a meeting
//!    and individual that exist on the roster
//! 3. **Positive Durations**: only occurrences with a non-zero duration are stored

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

static NO_MEETINGS: BTreeSet<MeetingId> = BTreeSet::new();
static NO_INDIVIDUALS: BTreeSet<IndividualId> = BTreeSet::new();

/// Identifier of an individual on the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndividualId(pub u32);

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a meeting on the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(pub u32);

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Kind of a meeting
///
/// Governs whether contact tracing may use the meeting and whether
/// pre-class interaction time is added to its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MeetingKind {
    /// Scheduled class; traceable, gets pre-class interaction time
    #[default]
    Course,
    /// Recurring social cluster; traceable
    Social,
    /// Contact that a tracer cannot reconstruct (e.g. broad campus mixing)
    Untraceable,
}

impl MeetingKind {
    /// Whether contact tracing may look through this kind of meeting
    pub fn is_traceable(self) -> bool {
        !matches!(self, MeetingKind::Untraceable)
    }

    /// Whether pre-class interaction time applies
    pub fn has_preclass_time(self) -> bool {
        matches!(self, MeetingKind::Course)
    }
}

/// Errors raised while building or validating a roster
#[derive(Debug, Error, PartialEq)]
pub enum RosterError {
    #[error("Malformed date '{0}': expected YYYY-MM-DD or MM/DD/YYYY")]
    MalformedDate(String),

    #[error("Unknown weekday code '{0}' (expected one of M, T, W, R, F, S, U)")]
    UnknownWeekday(char),

    #[error("Weekly pattern ends on {end} before it starts on {start}")]
    InvertedPattern { start: NaiveDate, end: NaiveDate },

    #[error("Individual {0} is not on the roster")]
    UnknownIndividual(IndividualId),

    #[error("Meeting {0} is not on the roster")]
    UnknownMeeting(MeetingId),

    #[error("Enrollment of individual {individual} disagrees with members of meeting {meeting}")]
    EnrollmentMismatch {
        individual: IndividualId,
        meeting: MeetingId,
    },
}

/// One meeting: a class, social cluster, household...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    id: MeetingId,
    name: String,
    kind: MeetingKind,
    source_label: Option<String>,
}

impl Meeting {
    pub fn id(&self) -> MeetingId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MeetingKind {
        self.kind
    }

    /// Label used when attributing an infection to this meeting
    ///
    /// Falls back to "Unknown" when the meeting declares no label.
    pub fn source_label(&self) -> &str {
        self.source_label.as_deref().unwrap_or("Unknown")
    }

    /// Label as declared, without the fallback
    pub fn declared_label(&self) -> Option<&str> {
        self.source_label.as_deref()
    }
}

/// Immutable population and meeting calendar for one experiment
///
/// # Example
///
/// ```rust
/// use campus_seir_core::models::roster::{IndividualId, MeetingKind, RosterBuilder};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2020, 9, 2).unwrap();
/// let mut builder = RosterBuilder::new();
/// let lecture = builder.insert_meeting(
///     "CS 101",
///     MeetingKind::Course,
///     Some("Classroom".to_string()),
///     [IndividualId(1), IndividualId(2)],
///     [(day, 75)],
/// );
/// let roster = builder.build().unwrap();
///
/// assert_eq!(roster.num_individuals(), 2);
/// assert_eq!(roster.duration_on(day, lecture), Some(75));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    individuals: BTreeSet<IndividualId>,
    meetings: BTreeMap<MeetingId, Meeting>,
    enrollment: BTreeMap<IndividualId, BTreeSet<MeetingId>>,
    members: BTreeMap<MeetingId, BTreeSet<IndividualId>>,
    occurrences: BTreeMap<NaiveDate, BTreeMap<MeetingId, u32>>,
}

impl Roster {
    /// All individuals
    pub fn individuals(&self) -> &BTreeSet<IndividualId> {
        &self.individuals
    }

    pub fn num_individuals(&self) -> usize {
        self.individuals.len()
    }

    pub fn contains_individual(&self, individual: IndividualId) -> bool {
        self.individuals.contains(&individual)
    }

    /// All meetings, in id order
    pub fn meetings(&self) -> impl Iterator<Item = &Meeting> {
        self.meetings.values()
    }

    pub fn num_meetings(&self) -> usize {
        self.meetings.len()
    }

    pub fn meeting(&self, meeting: MeetingId) -> Option<&Meeting> {
        self.meetings.get(&meeting)
    }

    /// Look up a meeting by its name
    pub fn meeting_by_name(&self, name: &str) -> Option<&Meeting> {
        self.meetings.values().find(|m| m.name == name)
    }

    /// Kind of a meeting; unknown meetings are treated as untraceable
    pub fn meeting_kind(&self, meeting: MeetingId) -> MeetingKind {
        self.meetings
            .get(&meeting)
            .map(|m| m.kind)
            .unwrap_or(MeetingKind::Untraceable)
    }

    /// Meetings an individual is enrolled in (empty for unknown individuals)
    pub fn enrollment(&self, individual: IndividualId) -> &BTreeSet<MeetingId> {
        self.enrollment.get(&individual).unwrap_or(&NO_MEETINGS)
    }

    /// Members of a meeting (empty for unknown meetings)
    pub fn members(&self, meeting: MeetingId) -> &BTreeSet<IndividualId> {
        self.members.get(&meeting).unwrap_or(&NO_INDIVIDUALS)
    }

    /// Meetings occurring on `date` with their durations in minutes
    pub fn occurrences_on(&self, date: NaiveDate) -> Option<&BTreeMap<MeetingId, u32>> {
        self.occurrences.get(&date)
    }

    /// Duration of `meeting` on `date`, if it meets that day
    pub fn duration_on(&self, date: NaiveDate, meeting: MeetingId) -> Option<u32> {
        self.occurrences
            .get(&date)
            .and_then(|day| day.get(&meeting))
            .copied()
    }

    pub fn meets_on(&self, date: NaiveDate, meeting: MeetingId) -> bool {
        self.duration_on(date, meeting).is_some()
    }

    /// First date with any occurrence
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.occurrences.keys().next().copied()
    }

    /// Last date with any occurrence
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.occurrences.keys().next_back().copied()
    }

    /// All dates with at least one occurrence, with their schedules
    pub fn calendar(&self) -> impl Iterator<Item = (&NaiveDate, &BTreeMap<MeetingId, u32>)> {
        self.occurrences.iter()
    }

    /// Meeting with the most members (ties broken by lowest id)
    pub fn largest_meeting(&self) -> Option<MeetingId> {
        self.members
            .iter()
            .max_by(|(a_id, a), (b_id, b)| a.len().cmp(&b.len()).then(b_id.cmp(a_id)))
            .map(|(id, _)| *id)
    }

    /// Check the roster invariants
    pub fn validate(&self) -> Result<(), RosterError> {
        for (individual, meetings) in &self.enrollment {
            if !self.individuals.contains(individual) {
                return Err(RosterError::UnknownIndividual(*individual));
            }
            for meeting in meetings {
                let members = self
                    .members
                    .get(meeting)
                    .ok_or(RosterError::UnknownMeeting(*meeting))?;
                if !members.contains(individual) {
                    return Err(RosterError::EnrollmentMismatch {
                        individual: *individual,
                        meeting: *meeting,
                    });
                }
            }
        }

        for (meeting, members) in &self.members {
            if !self.meetings.contains_key(meeting) {
                return Err(RosterError::UnknownMeeting(*meeting));
            }
            for individual in members {
                if !self.enrollment(*individual).contains(meeting) {
                    return Err(RosterError::EnrollmentMismatch {
                        individual: *individual,
                        meeting: *meeting,
                    });
                }
            }
        }

        for meeting in self.meetings.keys() {
            if !self.members.contains_key(meeting) {
                return Err(RosterError::UnknownMeeting(*meeting));
            }
        }

        for schedule in self.occurrences.values() {
            for meeting in schedule.keys() {
                if !self.meetings.contains_key(meeting) {
                    return Err(RosterError::UnknownMeeting(*meeting));
                }
            }
        }

        Ok(())
    }
}

/// Mutable construction form of a [`Roster`]
///
/// Schedule transforms start from [`RosterBuilder::from_roster`], edit, and
/// build a fresh roster; the source roster is never touched.
#[derive(Debug, Clone, Default)]
pub struct RosterBuilder {
    roster: Roster,
    holidays: BTreeSet<NaiveDate>,
    next_meeting_id: u32,
}

impl RosterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a copy of an existing roster
    pub fn from_roster(roster: &Roster) -> Self {
        let next_meeting_id = roster
            .meetings
            .keys()
            .next_back()
            .map(|id| id.0 + 1)
            .unwrap_or(0);
        Self {
            roster: roster.clone(),
            holidays: BTreeSet::new(),
            next_meeting_id,
        }
    }

    /// Dates on which weekly patterns never produce an occurrence
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Add an individual (no-op if already present)
    pub fn add_individual(&mut self, individual: IndividualId) -> &mut Self {
        self.roster.individuals.insert(individual);
        self
    }

    /// Add or extend a meeting with explicit `(date, minutes)` occurrences
    ///
    /// If a meeting with the same name exists, its members are extended and
    /// its kind and label are replaced. Members are added as individuals
    /// when missing. Zero-minute occurrences are ignored.
    pub fn insert_meeting(
        &mut self,
        name: &str,
        kind: MeetingKind,
        source_label: Option<String>,
        members: impl IntoIterator<Item = IndividualId>,
        occurrences: impl IntoIterator<Item = (NaiveDate, u32)>,
    ) -> MeetingId {
        let id = match self.roster.meeting_by_name(name) {
            Some(existing) => existing.id,
            None => {
                let id = MeetingId(self.next_meeting_id);
                self.next_meeting_id += 1;
                id
            }
        };

        self.roster.meetings.insert(
            id,
            Meeting {
                id,
                name: name.to_string(),
                kind,
                source_label,
            },
        );

        let member_set = self.roster.members.entry(id).or_default();
        for individual in members {
            member_set.insert(individual);
            self.roster.individuals.insert(individual);
            self.roster
                .enrollment
                .entry(individual)
                .or_default()
                .insert(id);
        }

        for (date, minutes) in occurrences {
            self.set_occurrence(date, id, minutes);
        }

        id
    }

    /// Add a meeting described by a [`MeetingSpec`]
    pub fn add_meeting(&mut self, spec: &MeetingSpec) -> Result<MeetingId, RosterError> {
        let occurrences = spec.schedule.resolve(&self.holidays)?;
        Ok(self.insert_meeting(
            &spec.name,
            spec.kind,
            spec.source_label.clone(),
            spec.members.iter().copied(),
            occurrences,
        ))
    }

    /// Set the duration of `meeting` on `date`; zero removes the occurrence
    pub fn set_occurrence(&mut self, date: NaiveDate, meeting: MeetingId, minutes: u32) {
        if minutes == 0 {
            self.clear_occurrence(date, meeting);
        } else {
            self.roster
                .occurrences
                .entry(date)
                .or_default()
                .insert(meeting, minutes);
        }
    }

    /// Remove the occurrence of `meeting` on `date`, if any
    pub fn clear_occurrence(&mut self, date: NaiveDate, meeting: MeetingId) {
        if let Some(day) = self.roster.occurrences.get_mut(&date) {
            day.remove(&meeting);
            if day.is_empty() {
                self.roster.occurrences.remove(&date);
            }
        }
    }

    /// Remove a meeting with its enrollment and all its occurrences
    pub fn remove_meeting(&mut self, meeting: MeetingId) -> Option<Meeting> {
        let removed = self.roster.meetings.remove(&meeting)?;
        if let Some(members) = self.roster.members.remove(&meeting) {
            for individual in members {
                if let Some(enrolled) = self.roster.enrollment.get_mut(&individual) {
                    enrolled.remove(&meeting);
                }
            }
        }
        self.roster.occurrences.retain(|_, day| {
            day.remove(&meeting);
            !day.is_empty()
        });
        Some(removed)
    }

    /// Remove an individual and all their enrollments
    pub fn remove_individual(&mut self, individual: IndividualId) -> bool {
        if !self.roster.individuals.remove(&individual) {
            return false;
        }
        if let Some(meetings) = self.roster.enrollment.remove(&individual) {
            for meeting in meetings {
                if let Some(members) = self.roster.members.get_mut(&meeting) {
                    members.remove(&individual);
                }
            }
        }
        true
    }

    /// Read access to the roster under construction
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Validate and return the finished roster
    pub fn build(self) -> Result<Roster, RosterError> {
        self.roster.validate()?;
        Ok(self.roster)
    }
}

// ============================================================================
// Serde input form
// ============================================================================

/// Serializable description of a roster, as handed over by a loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterSpec {
    /// Individuals without any enrollment (enrolled members are implicit)
    #[serde(default)]
    pub individuals: Vec<IndividualId>,

    /// Meetings with their members and schedules
    #[serde(default)]
    pub meetings: Vec<MeetingSpec>,

    /// Dates excluded from weekly patterns
    #[serde(default)]
    pub holidays: Vec<String>,
}

impl RosterSpec {
    /// Build the roster, parsing every date
    pub fn build(&self) -> Result<Roster, RosterError> {
        let holidays = self
            .holidays
            .iter()
            .map(|raw| parse_date(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let mut builder = RosterBuilder::new().with_holidays(holidays);
        for individual in &self.individuals {
            builder.add_individual(*individual);
        }
        for meeting in &self.meetings {
            builder.add_meeting(meeting)?;
        }
        builder.build()
    }
}

/// Serializable description of one meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSpec {
    pub name: String,

    #[serde(default)]
    pub kind: MeetingKind,

    /// Infection source label (e.g. "Classroom", "Dorm")
    #[serde(default)]
    pub source_label: Option<String>,

    pub members: Vec<IndividualId>,

    pub schedule: MeetingSchedule,
}

/// When a meeting takes place
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MeetingSchedule {
    /// Recurring weekly patterns
    Weekly(Vec<WeeklyPattern>),
    /// Explicit date → minutes map
    Dates(BTreeMap<String, u32>),
}

/// A weekly recurrence between two dates (inclusive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyPattern {
    pub start: String,
    pub end: String,
    /// Weekday codes, e.g. "MWF" or "TR"
    pub weekdays: String,
    pub minutes: u32,
}

impl MeetingSchedule {
    /// Expand into concrete `(date, minutes)` occurrences
    pub fn resolve(
        &self,
        holidays: &BTreeSet<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, u32)>, RosterError> {
        match self {
            MeetingSchedule::Weekly(patterns) => {
                let mut occurrences = Vec::new();
                for pattern in patterns {
                    let start = parse_date(&pattern.start)?;
                    let end = parse_date(&pattern.end)?;
                    occurrences.extend(weekly_occurrences(
                        start,
                        end,
                        &pattern.weekdays,
                        pattern.minutes,
                        holidays,
                    )?);
                }
                Ok(occurrences)
            }
            MeetingSchedule::Dates(dates) => dates
                .iter()
                .map(|(raw, minutes)| Ok((parse_date(raw)?, *minutes)))
                .collect(),
        }
    }
}

/// Occurrences of a weekly pattern between `start` and `end` (inclusive)
pub fn weekly_occurrences(
    start: NaiveDate,
    end: NaiveDate,
    weekdays: &str,
    minutes: u32,
    holidays: &BTreeSet<NaiveDate>,
) -> Result<Vec<(NaiveDate, u32)>, RosterError> {
    if end < start {
        return Err(RosterError::InvertedPattern { start, end });
    }
    let days = weekdays
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(weekday_index)
        .collect::<Result<BTreeSet<u32>, _>>()?;

    let mut occurrences = Vec::new();
    let mut date = start;
    while date <= end {
        if days.contains(&date.weekday().num_days_from_monday()) && !holidays.contains(&date) {
            occurrences.push((date, minutes));
        }
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }
    Ok(occurrences)
}

/// Monday-based index of a weekday code
fn weekday_index(code: char) -> Result<u32, RosterError> {
    match code {
        'M' => Ok(0),
        'T' => Ok(1),
        'W' => Ok(2),
        'R' => Ok(3),
        'F' => Ok(4),
        'S' => Ok(5),
        'U' => Ok(6),
        other => Err(RosterError::UnknownWeekday(other)),
    }
}

/// Parse `YYYY-MM-DD` or `MM/DD/YYYY`
pub fn parse_date(raw: &str) -> Result<NaiveDate, RosterError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .map_err(|_| RosterError::MalformedDate(raw.to_string()))
}
