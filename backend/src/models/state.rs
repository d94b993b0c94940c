//! Simulation State
//!
//! Mutable compartment bookkeeping for one run. The state offers primitive
//! moves between compartments; the rules deciding *when* to move (due dates,
//! quarantine caps, test results) live in the orchestrator.
//!
//! Each move keeps two derived views in step with the compartment maps:
//! - the susceptible members of every meeting (used by transmission)
//! - the S/E/I/R health buckets of every meeting (used by statistics)
//!
//! # Critical Invariants
//!
//! 1. **Partition**: every roster individual is in exactly one compartment
//! 2. **Meeting Susceptibles**: `susceptible_in(m) == members(m) ∩ Susceptible`
//! 3. **Meeting Health**: each member sits in the bucket of their compartment
//!    (none while quarantined susceptible)
//! 4. **No Strangers**: the state tracks no individual absent from the roster

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::models::compartment::{
    Compartment, HealthBucket, InfectionTimeline, MeetingHealth,
};
use crate::models::roster::{IndividualId, MeetingId, Roster};

static EMPTY: BTreeSet<IndividualId> = BTreeSet::new();

/// Broken state invariant
#[derive(Debug, Error, PartialEq)]
pub enum InvariantViolation {
    #[error("Individual {individual} is in {count} compartments")]
    MultipleCompartments {
        individual: IndividualId,
        count: usize,
    },

    #[error("Individual {0} is in no compartment")]
    MissingCompartment(IndividualId),

    #[error("Susceptible set of meeting {0} differs from its susceptible members")]
    MeetingSusceptibleMismatch(MeetingId),

    #[error("Health buckets of meeting {0} disagree with member compartments")]
    MeetingHealthMismatch(MeetingId),

    #[error("State tracks individual {0} who is not on the roster")]
    UnknownMember(IndividualId),
}

/// Compartment maps and derived per-meeting views for one run
///
/// # Example
///
/// ```rust
/// use campus_seir_core::models::compartment::{Compartment, InfectionTimeline};
/// use campus_seir_core::models::roster::{IndividualId, MeetingKind, RosterBuilder};
/// use campus_seir_core::SimulationState;
/// use chrono::NaiveDate;
/// use std::collections::BTreeSet;
///
/// let day = NaiveDate::from_ymd_opt(2020, 9, 2).unwrap();
/// let mut builder = RosterBuilder::new();
/// let class = builder.insert_meeting(
///     "BIO 110", MeetingKind::Course, None,
///     [IndividualId(1), IndividualId(2)], [(day, 50)],
/// );
/// let roster = builder.build().unwrap();
///
/// let mut state = SimulationState::new(&roster, BTreeSet::new());
/// let timeline = InfectionTimeline {
///     exposure_date: day,
///     contagious_date: day.succ_opt().unwrap(),
///     removal_date: NaiveDate::from_ymd_opt(2020, 9, 9).unwrap(),
///     symptomatic: false,
/// };
/// assert!(state.expose(&roster, IndividualId(1), timeline));
/// assert_eq!(state.compartment_of(IndividualId(1)), Some(Compartment::Exposed));
/// assert_eq!(state.susceptible_in(class).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationState {
    susceptible: BTreeSet<IndividualId>,
    exposed: BTreeMap<IndividualId, InfectionTimeline>,

    /// Infectious maps hold the natural removal date
    infectious_asymptomatic: BTreeMap<IndividualId, NaiveDate>,
    infectious_symptomatic: BTreeMap<IndividualId, NaiveDate>,

    /// Quarantine maps hold the release (or removal) date
    quarantined_susceptible: BTreeMap<IndividualId, NaiveDate>,
    quarantined_exposed: BTreeMap<IndividualId, InfectionTimeline>,
    quarantined_asymptomatic: BTreeMap<IndividualId, NaiveDate>,
    quarantined_symptomatic: BTreeMap<IndividualId, NaiveDate>,

    removed: BTreeMap<IndividualId, NaiveDate>,

    vaccinated: BTreeSet<IndividualId>,

    susceptible_by_meeting: BTreeMap<MeetingId, BTreeSet<IndividualId>>,
    meeting_health: BTreeMap<MeetingId, MeetingHealth>,

    infected_vaccinated: usize,
    infected_unvaccinated: usize,
}

impl SimulationState {
    /// Everyone on the roster starts Susceptible
    pub fn new(roster: &Roster, vaccinated: BTreeSet<IndividualId>) -> Self {
        let mut susceptible_by_meeting = BTreeMap::new();
        let mut meeting_health = BTreeMap::new();
        for meeting in roster.meetings() {
            let members = roster.members(meeting.id()).clone();
            meeting_health.insert(
                meeting.id(),
                MeetingHealth {
                    susceptible: members.clone(),
                    ..MeetingHealth::default()
                },
            );
            susceptible_by_meeting.insert(meeting.id(), members);
        }

        Self {
            susceptible: roster.individuals().clone(),
            exposed: BTreeMap::new(),
            infectious_asymptomatic: BTreeMap::new(),
            infectious_symptomatic: BTreeMap::new(),
            quarantined_susceptible: BTreeMap::new(),
            quarantined_exposed: BTreeMap::new(),
            quarantined_asymptomatic: BTreeMap::new(),
            quarantined_symptomatic: BTreeMap::new(),
            removed: BTreeMap::new(),
            vaccinated,
            susceptible_by_meeting,
            meeting_health,
            infected_vaccinated: 0,
            infected_unvaccinated: 0,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current compartment, or `None` for individuals not on the roster
    pub fn compartment_of(&self, individual: IndividualId) -> Option<Compartment> {
        Compartment::ALL
            .into_iter()
            .find(|compartment| self.contains(*compartment, individual))
    }

    fn contains(&self, compartment: Compartment, individual: IndividualId) -> bool {
        let id = &individual;
        match compartment {
            Compartment::Susceptible => self.susceptible.contains(id),
            Compartment::Exposed => self.exposed.contains_key(id),
            Compartment::InfectiousAsymptomatic => self.infectious_asymptomatic.contains_key(id),
            Compartment::InfectiousSymptomatic => self.infectious_symptomatic.contains_key(id),
            Compartment::QuarantinedSusceptible => self.quarantined_susceptible.contains_key(id),
            Compartment::QuarantinedExposed => self.quarantined_exposed.contains_key(id),
            Compartment::QuarantinedAsymptomatic => {
                self.quarantined_asymptomatic.contains_key(id)
            }
            Compartment::QuarantinedSymptomatic => self.quarantined_symptomatic.contains_key(id),
            Compartment::Removed => self.removed.contains_key(id),
        }
    }

    fn memberships(&self, individual: IndividualId) -> usize {
        Compartment::ALL
            .into_iter()
            .filter(|compartment| self.contains(*compartment, individual))
            .count()
    }

    /// Number of individuals in a compartment
    pub fn count(&self, compartment: Compartment) -> usize {
        match compartment {
            Compartment::Susceptible => self.susceptible.len(),
            Compartment::Exposed => self.exposed.len(),
            Compartment::InfectiousAsymptomatic => self.infectious_asymptomatic.len(),
            Compartment::InfectiousSymptomatic => self.infectious_symptomatic.len(),
            Compartment::QuarantinedSusceptible => self.quarantined_susceptible.len(),
            Compartment::QuarantinedExposed => self.quarantined_exposed.len(),
            Compartment::QuarantinedAsymptomatic => self.quarantined_asymptomatic.len(),
            Compartment::QuarantinedSymptomatic => self.quarantined_symptomatic.len(),
            Compartment::Removed => self.removed.len(),
        }
    }

    /// Individuals in a compartment, in id order
    pub fn members_of(&self, compartment: Compartment) -> Vec<IndividualId> {
        match compartment {
            Compartment::Susceptible => self.susceptible.iter().copied().collect(),
            Compartment::Exposed => self.exposed.keys().copied().collect(),
            Compartment::QuarantinedExposed => self.quarantined_exposed.keys().copied().collect(),
            other => self
                .dated(other)
                .map(|map| map.keys().copied().collect())
                .unwrap_or_default(),
        }
    }

    fn dated(&self, compartment: Compartment) -> Option<&BTreeMap<IndividualId, NaiveDate>> {
        match compartment {
            Compartment::InfectiousAsymptomatic => Some(&self.infectious_asymptomatic),
            Compartment::InfectiousSymptomatic => Some(&self.infectious_symptomatic),
            Compartment::QuarantinedSusceptible => Some(&self.quarantined_susceptible),
            Compartment::QuarantinedAsymptomatic => Some(&self.quarantined_asymptomatic),
            Compartment::QuarantinedSymptomatic => Some(&self.quarantined_symptomatic),
            Compartment::Removed => Some(&self.removed),
            _ => None,
        }
    }

    fn dated_mut(
        &mut self,
        compartment: Compartment,
    ) -> Option<&mut BTreeMap<IndividualId, NaiveDate>> {
        match compartment {
            Compartment::InfectiousAsymptomatic => Some(&mut self.infectious_asymptomatic),
            Compartment::InfectiousSymptomatic => Some(&mut self.infectious_symptomatic),
            Compartment::QuarantinedSusceptible => Some(&mut self.quarantined_susceptible),
            Compartment::QuarantinedAsymptomatic => Some(&mut self.quarantined_asymptomatic),
            Compartment::QuarantinedSymptomatic => Some(&mut self.quarantined_symptomatic),
            Compartment::Removed => Some(&mut self.removed),
            _ => None,
        }
    }

    /// Individuals whose scheduled exit from `compartment` is on or before `date`
    ///
    /// Exposed individuals are due at their contagious date, quarantined
    /// exposed ones at their removal date. Susceptible and Removed are
    /// never due.
    pub fn due(&self, compartment: Compartment, date: NaiveDate) -> Vec<IndividualId> {
        match compartment {
            Compartment::Exposed => self
                .exposed
                .iter()
                .filter(|(_, timeline)| timeline.contagious_date <= date)
                .map(|(id, _)| *id)
                .collect(),
            Compartment::QuarantinedExposed => self
                .quarantined_exposed
                .iter()
                .filter(|(_, timeline)| timeline.removal_date <= date)
                .map(|(id, _)| *id)
                .collect(),
            Compartment::Susceptible | Compartment::Removed => Vec::new(),
            other => self
                .dated(other)
                .map(|map| {
                    map.iter()
                        .filter(|(_, exit)| **exit <= date)
                        .map(|(id, _)| *id)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Timeline of an exposed (possibly quarantined) individual
    pub fn timeline(&self, individual: IndividualId) -> Option<&InfectionTimeline> {
        self.exposed
            .get(&individual)
            .or_else(|| self.quarantined_exposed.get(&individual))
    }

    /// Scheduled exit date for dated compartments (infectious, quarantined, removed)
    pub fn scheduled_exit(&self, individual: IndividualId) -> Option<NaiveDate> {
        let compartment = self.compartment_of(individual)?;
        match compartment {
            Compartment::Exposed | Compartment::QuarantinedExposed => {
                self.timeline(individual).map(|t| t.removal_date)
            }
            Compartment::Susceptible => None,
            other => self.dated(other)?.get(&individual).copied(),
        }
    }

    pub fn susceptible(&self) -> &BTreeSet<IndividualId> {
        &self.susceptible
    }

    /// Susceptible members of a meeting
    pub fn susceptible_in(&self, meeting: MeetingId) -> &BTreeSet<IndividualId> {
        self.susceptible_by_meeting.get(&meeting).unwrap_or(&EMPTY)
    }

    pub fn meeting_health(&self, meeting: MeetingId) -> Option<&MeetingHealth> {
        self.meeting_health.get(&meeting)
    }

    pub fn all_meeting_health(&self) -> &BTreeMap<MeetingId, MeetingHealth> {
        &self.meeting_health
    }

    /// Free infectious members of a meeting as `(unvaccinated, vaccinated)`
    pub fn infectious_attendees(&self, roster: &Roster, meeting: MeetingId) -> (usize, usize) {
        roster
            .members(meeting)
            .iter()
            .filter(|id| {
                self.infectious_asymptomatic.contains_key(id)
                    || self.infectious_symptomatic.contains_key(id)
            })
            .fold((0, 0), |(unvaccinated, vaccinated), id| {
                if self.vaccinated.contains(id) {
                    (unvaccinated, vaccinated + 1)
                } else {
                    (unvaccinated + 1, vaccinated)
                }
            })
    }

    pub fn is_vaccinated(&self, individual: IndividualId) -> bool {
        self.vaccinated.contains(&individual)
    }

    pub fn vaccinated(&self) -> &BTreeSet<IndividualId> {
        &self.vaccinated
    }

    /// Vaccinated individuals infected so far
    pub fn infected_vaccinated(&self) -> usize {
        self.infected_vaccinated
    }

    /// Unvaccinated individuals infected so far
    pub fn infected_unvaccinated(&self) -> usize {
        self.infected_unvaccinated
    }

    // ========================================================================
    // Moves
    // ========================================================================

    /// Susceptible → Exposed
    pub fn expose(
        &mut self,
        roster: &Roster,
        individual: IndividualId,
        timeline: InfectionTimeline,
    ) -> bool {
        if !self.susceptible.remove(&individual) {
            return false;
        }
        self.exposed.insert(individual, timeline);
        if self.vaccinated.contains(&individual) {
            self.infected_vaccinated += 1;
        } else {
            self.infected_unvaccinated += 1;
        }
        self.relocate(roster, individual, Compartment::Susceptible, Compartment::Exposed);
        true
    }

    /// Exposed → InfectiousAsymptomatic | InfectiousSymptomatic
    ///
    /// The infectious exit date is the timeline's removal date.
    pub fn make_infectious(
        &mut self,
        roster: &Roster,
        individual: IndividualId,
    ) -> Option<Compartment> {
        let timeline = self.exposed.remove(&individual)?;
        let target = timeline.infectious_compartment();
        if let Some(map) = self.dated_mut(target) {
            map.insert(individual, timeline.removal_date);
        }
        self.relocate(roster, individual, Compartment::Exposed, target);
        Some(target)
    }

    /// Susceptible → QuarantinedSusceptible until `release`
    pub fn quarantine_susceptible(
        &mut self,
        roster: &Roster,
        individual: IndividualId,
        release: NaiveDate,
    ) -> bool {
        if !self.susceptible.remove(&individual) {
            return false;
        }
        self.quarantined_susceptible.insert(individual, release);
        self.relocate(
            roster,
            individual,
            Compartment::Susceptible,
            Compartment::QuarantinedSusceptible,
        );
        true
    }

    /// Exposed → QuarantinedExposed (timeline kept)
    pub fn quarantine_exposed(&mut self, roster: &Roster, individual: IndividualId) -> bool {
        let Some(timeline) = self.exposed.remove(&individual) else {
            return false;
        };
        self.quarantined_exposed.insert(individual, timeline);
        self.relocate(
            roster,
            individual,
            Compartment::Exposed,
            Compartment::QuarantinedExposed,
        );
        true
    }

    /// Infectious{a|s} → Quarantined{a|s} until `release`
    pub fn quarantine_infectious(
        &mut self,
        roster: &Roster,
        individual: IndividualId,
        release: NaiveDate,
    ) -> Option<Compartment> {
        let (from, to) = if self.infectious_asymptomatic.remove(&individual).is_some() {
            (
                Compartment::InfectiousAsymptomatic,
                Compartment::QuarantinedAsymptomatic,
            )
        } else if self.infectious_symptomatic.remove(&individual).is_some() {
            (
                Compartment::InfectiousSymptomatic,
                Compartment::QuarantinedSymptomatic,
            )
        } else {
            return None;
        };
        if let Some(map) = self.dated_mut(to) {
            map.insert(individual, release);
        }
        self.relocate(roster, individual, from, to);
        Some(to)
    }

    /// QuarantinedSusceptible → Susceptible
    pub fn release_susceptible(&mut self, roster: &Roster, individual: IndividualId) -> bool {
        if self.quarantined_susceptible.remove(&individual).is_none() {
            return false;
        }
        self.susceptible.insert(individual);
        self.relocate(
            roster,
            individual,
            Compartment::QuarantinedSusceptible,
            Compartment::Susceptible,
        );
        true
    }

    /// Any infected compartment → Removed on `date`
    ///
    /// Returns the compartment left, or `None` if the individual was
    /// Susceptible, QuarantinedSusceptible or already Removed.
    pub fn remove(
        &mut self,
        roster: &Roster,
        individual: IndividualId,
        date: NaiveDate,
    ) -> Option<Compartment> {
        let from = self.compartment_of(individual)?;
        let left = match from {
            Compartment::Exposed => self.exposed.remove(&individual).is_some(),
            Compartment::QuarantinedExposed => {
                self.quarantined_exposed.remove(&individual).is_some()
            }
            Compartment::InfectiousAsymptomatic
            | Compartment::InfectiousSymptomatic
            | Compartment::QuarantinedAsymptomatic
            | Compartment::QuarantinedSymptomatic => self
                .dated_mut(from)
                .map(|map| map.remove(&individual).is_some())
                .unwrap_or(false),
            Compartment::Susceptible
            | Compartment::QuarantinedSusceptible
            | Compartment::Removed => false,
        };
        if !left {
            return None;
        }
        self.removed.insert(individual, date);
        self.relocate(roster, individual, from, Compartment::Removed);
        Some(from)
    }

    /// Update the per-meeting views after a compartment move
    fn relocate(&mut self, roster: &Roster, individual: IndividualId, from: Compartment, to: Compartment) {
        let from_bucket = from.health_bucket();
        let to_bucket = to.health_bucket();
        for meeting in roster.enrollment(individual) {
            if from == Compartment::Susceptible {
                if let Some(set) = self.susceptible_by_meeting.get_mut(meeting) {
                    set.remove(&individual);
                }
            }
            if to == Compartment::Susceptible {
                self.susceptible_by_meeting
                    .entry(*meeting)
                    .or_default()
                    .insert(individual);
            }
            if from_bucket != to_bucket {
                let health = self.meeting_health.entry(*meeting).or_default();
                if let Some(bucket) = from_bucket {
                    health.bucket_mut(bucket).remove(&individual);
                }
                if let Some(bucket) = to_bucket {
                    health.bucket_mut(bucket).insert(individual);
                }
            }
        }
        debug_assert_eq!(
            self.memberships(individual),
            1,
            "individual {} must be in exactly one compartment after {:?} -> {:?}",
            individual,
            from,
            to
        );
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check the partition and per-meeting invariants against the roster
    pub fn check_invariants(&self, roster: &Roster) -> Result<(), InvariantViolation> {
        for individual in roster.individuals() {
            match self.memberships(*individual) {
                1 => {}
                0 => return Err(InvariantViolation::MissingCompartment(*individual)),
                count => {
                    return Err(InvariantViolation::MultipleCompartments {
                        individual: *individual,
                        count,
                    })
                }
            }
        }

        for compartment in Compartment::ALL {
            if let Some(stranger) = self
                .members_of(compartment)
                .into_iter()
                .find(|id| !roster.contains_individual(*id))
            {
                return Err(InvariantViolation::UnknownMember(stranger));
            }
        }

        for meeting in roster.meetings() {
            let id = meeting.id();
            let members = roster.members(id);

            let expected: BTreeSet<IndividualId> = members
                .intersection(&self.susceptible)
                .copied()
                .collect();
            if &expected != self.susceptible_in(id) {
                return Err(InvariantViolation::MeetingSusceptibleMismatch(id));
            }

            let mut health = MeetingHealth::default();
            for member in members {
                if let Some(bucket) = self
                    .compartment_of(*member)
                    .and_then(Compartment::health_bucket)
                {
                    health.bucket_mut(bucket).insert(*member);
                }
            }
            let actual = self.meeting_health.get(&id).cloned().unwrap_or_default();
            if health != actual {
                return Err(InvariantViolation::MeetingHealthMismatch(id));
            }
        }

        Ok(())
    }

    /// Count of every compartment, in [`Compartment::ALL`] order
    pub fn compartment_counts(&self) -> [usize; 9] {
        Compartment::ALL.map(|compartment| self.count(compartment))
    }

    /// Members of a meeting currently in `bucket`
    pub fn bucket_members(&self, meeting: MeetingId, bucket: HealthBucket) -> &BTreeSet<IndividualId> {
        self.meeting_health
            .get(&meeting)
            .map(|health| health.bucket(bucket))
            .unwrap_or(&EMPTY)
    }
}
