//! Simulation Engine
//!
//! One run of the campus model, advancing one calendar day per step:
//!
//! ```text
//! For each day d (start_date ..= end_date):
//! 1. Daily update
//!    a. apply positive test results due today
//!    b. remove due quarantined (Qe, Qa, Qs) and infectious (Ia, Is) individuals;
//!       symptomatic recoveries become contact-trace requests
//!    c. release due quarantined susceptibles
//!    d. promote due exposed individuals to infectious
//!    e. draw community exposures
//! 2. Contact tracing (policy actions applied)
//! 3. Testing (policy actions applied)
//! 4. Transmission in every meeting occurring today
//! 5. Record statistics
//! 6. Advance the date
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use campus_seir_core::models::roster::{IndividualId, MeetingKind, RosterBuilder};
//! use campus_seir_core::orchestrator::{
//!     InitialExposure, Interventions, Simulation, SimulationConfig, SimulationParameters,
//! };
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2020, 9, 2).unwrap();
//! let mut builder = RosterBuilder::new();
//! builder.insert_meeting(
//!     "MATH 221", MeetingKind::Course, None,
//!     (0..30).map(IndividualId), [(start, 75)],
//! );
//! let roster = Arc::new(builder.build().unwrap());
//!
//! let parameters = SimulationParameters {
//!     start_date: start,
//!     end_date: NaiveDate::from_ymd_opt(2020, 9, 30).unwrap(),
//!     ..SimulationParameters::default()
//! };
//! let config = SimulationConfig::new(parameters, InitialExposure::Random(2));
//!
//! let mut sim = Simulation::new(roster, &config, Interventions::default(), 42).unwrap();
//! sim.run().unwrap();
//!
//! let last = sim.statistics().latest().unwrap();
//! assert_eq!(last.counts.population(), 30);
//! // The two seeds never become susceptible again
//! assert!(last.counts.reported_susceptible() <= 28);
//! ```

use chrono::NaiveDate;
use log::{debug, info, trace};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

use crate::core::calendar::{add_days, next_day, SimulationClock};
use crate::duration::{DurationModel, VariedResponse};
use crate::models::compartment::{Compartment, InfectionSource};
use crate::models::event::{Event, EventLog, RemovalReason};
use crate::models::roster::{IndividualId, Roster, RosterError};
use crate::models::state::{InvariantViolation, SimulationState};
use crate::orchestrator::config::{ScenarioConfig, SimulationConfig, SimulationParameters};
use crate::policy::{
    ContactTracingPolicy, InterventionAction, NoTesting, NoTracing, PolicyContext, TestingPolicy,
};
use crate::rng::{derive_seed, RngManager};
use crate::stats::{RunOutcome, StatisticsRecorder};
use crate::transmission::{meeting_candidates, TransmissionRates};

/// Simulation error types
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Initial exposure selects nobody")]
    EmptyInitialExposure,

    #[error("Initial exposure asks for {requested} individuals but only {available} are eligible")]
    InitialExposureTooLarge { requested: usize, available: usize },

    #[error("Individual {0} is not on the roster")]
    UnknownIndividual(IndividualId),

    #[error("Simulation already passed its end date")]
    Finished,

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Pluggable models of a run
#[derive(Clone)]
pub struct Interventions {
    pub duration_model: Box<dyn DurationModel>,
    pub testing: Box<dyn TestingPolicy>,
    pub contact_tracing: Box<dyn ContactTracingPolicy>,
}

impl Default for Interventions {
    /// Varied response durations, no testing, no tracing
    fn default() -> Self {
        Self {
            duration_model: Box::new(VariedResponse::default()),
            testing: Box::new(NoTesting),
            contact_tracing: Box::new(NoTracing),
        }
    }
}

impl Interventions {
    /// Build the models named by a scenario
    ///
    /// Rotating test groups are drawn from `rng`.
    pub fn from_scenario(scenario: &ScenarioConfig, roster: &Roster, rng: &mut RngManager) -> Self {
        Self {
            duration_model: scenario.duration_model.build(),
            testing: scenario.testing.build(roster, rng),
            contact_tracing: scenario.contact_tracing.build(),
        }
    }
}

/// Summary of one simulated day
#[derive(Debug, Clone, PartialEq)]
pub struct DayResult {
    pub date: NaiveDate,
    /// Exposures from meetings and the community
    pub new_exposures: usize,
    pub new_infectious: usize,
    pub new_removals: usize,
    pub new_quarantines: usize,
    pub positive_results: usize,
}

#[derive(Default)]
struct DayTally {
    exposures: usize,
    infectious: usize,
    removals: usize,
    quarantines: usize,
    positives: usize,
}

/// One stochastic run over a shared roster
pub struct Simulation {
    roster: Arc<Roster>,
    parameters: SimulationParameters,
    rates: TransmissionRates,
    clock: SimulationClock,
    rng: RngManager,
    state: SimulationState,
    duration_model: Box<dyn DurationModel>,
    testing: Box<dyn TestingPolicy>,
    contact_tracing: Box<dyn ContactTracingPolicy>,
    statistics: StatisticsRecorder,
    event_log: EventLog,
    positive_tests: BTreeMap<NaiveDate, BTreeSet<IndividualId>>,
    test_requests: BTreeMap<NaiveDate, BTreeSet<IndividualId>>,
    trace_requests: BTreeMap<NaiveDate, BTreeSet<IndividualId>>,
    tally: DayTally,
}

impl Simulation {
    /// Create a run: validate, vaccinate, then infect the initial seeds on
    /// the start date with a Community source
    pub fn new(
        roster: Arc<Roster>,
        config: &SimulationConfig,
        interventions: Interventions,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        let parameters = config.parameters.clone();
        parameters.validate()?;
        interventions
            .duration_model
            .validate()
            .map_err(SimulationError::InvalidConfig)?;

        let mut rng = RngManager::new(seed);
        let vaccinated = config.vaccination.resolve(&roster, &mut rng)?;
        let seeds = config.initial_exposure.resolve(&roster, &mut rng)?;

        let state = SimulationState::new(&roster, vaccinated);
        let clock = SimulationClock::new(parameters.start_date, parameters.end_date);

        let mut sim = Self {
            rates: parameters.transmission_rates(),
            roster,
            parameters,
            clock,
            rng,
            state,
            duration_model: interventions.duration_model,
            testing: interventions.testing,
            contact_tracing: interventions.contact_tracing,
            statistics: StatisticsRecorder::new(),
            event_log: EventLog::new(),
            positive_tests: BTreeMap::new(),
            test_requests: BTreeMap::new(),
            trace_requests: BTreeMap::new(),
            tally: DayTally::default(),
        };

        let start = sim.clock.start_date();
        for individual in &seeds {
            sim.infect(*individual, start, InfectionSource::Community);
        }
        sim.tally = DayTally::default();

        info!(
            "Simulation seeded (seed {}): {} individuals, {} meetings, {} initial exposures, {} vaccinated, {} to {}",
            seed,
            sim.roster.num_individuals(),
            sim.roster.num_meetings(),
            seeds.len(),
            sim.state.vaccinated().len(),
            sim.clock.start_date(),
            sim.clock.end_date()
        );
        debug!(
            "Models: {}; {}; {}",
            sim.duration_model.describe(),
            sim.testing.describe(),
            sim.contact_tracing.describe()
        );
        Ok(sim)
    }

    /// Build a single run from a scenario
    ///
    /// Rotating test groups are drawn from `seed` and the run itself uses
    /// `derive_seed(seed, 0)`, the same streams as repetition 0 of an
    /// experiment with base seed `seed`.
    pub fn from_scenario(scenario: &ScenarioConfig, seed: u64) -> Result<Self, SimulationError> {
        scenario.validate()?;
        let roster = scenario.build_roster()?;
        let mut rng = RngManager::new(seed);
        let interventions = Interventions::from_scenario(scenario, &roster, &mut rng);
        Self::new(
            Arc::new(roster),
            &scenario.simulation_config(),
            interventions,
            derive_seed(seed, 0),
        )
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Date of the next step
    pub fn date(&self) -> NaiveDate {
        self.clock.current_date()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.parameters
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn statistics(&self) -> &StatisticsRecorder {
        &self.statistics
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn compartment_of(&self, individual: IndividualId) -> Option<Compartment> {
        self.state.compartment_of(individual)
    }

    /// Positive results queued for `date`
    pub fn pending_positive_tests(&self, date: NaiveDate) -> Option<&BTreeSet<IndividualId>> {
        self.positive_tests.get(&date)
    }

    /// Contact-trace requests filed for `date`
    pub fn trace_requests(&self, date: NaiveDate) -> Option<&BTreeSet<IndividualId>> {
        self.trace_requests.get(&date)
    }

    // ========================================================================
    // Main loop
    // ========================================================================

    /// Simulate the current day and advance the date
    pub fn step(&mut self) -> Result<DayResult, SimulationError> {
        if self.clock.is_finished() {
            return Err(SimulationError::Finished);
        }
        let today = self.clock.current_date();
        self.tally = DayTally::default();

        // STEP 1: DAILY UPDATE
        self.daily_update();
        self.verify()?;

        // STEP 2: CONTACT TRACING
        let trace_requests = self.trace_requests.get(&today).cloned().unwrap_or_default();
        let test_requests = self.test_requests.get(&today).cloned().unwrap_or_default();
        let actions = {
            let ctx = PolicyContext {
                date: today,
                roster: &self.roster,
                state: &self.state,
                test_requests: &test_requests,
                trace_requests: &trace_requests,
            };
            self.contact_tracing.trace(&ctx)
        };
        self.apply_actions(actions);
        self.verify()?;

        // STEP 3: TESTING (sees tests requested by tracing)
        let test_requests = self.test_requests.get(&today).cloned().unwrap_or_default();
        let actions = {
            let ctx = PolicyContext {
                date: today,
                roster: &self.roster,
                state: &self.state,
                test_requests: &test_requests,
                trace_requests: &trace_requests,
            };
            self.testing.testing(&ctx)
        };
        self.apply_actions(actions);
        self.verify()?;

        // STEP 4: TRANSMISSION
        self.transmit();
        self.verify()?;

        // STEP 5: STATISTICS
        self.statistics.record_day(today, &self.state);
        if let Some(snapshot) = self.statistics.latest() {
            let counts = snapshot.counts;
            debug!(
                "{}: S={} E={} I={} Q={} R={}",
                today,
                counts.reported_susceptible(),
                counts.reported_exposed(),
                counts.reported_infectious(),
                counts.reported_quarantined(),
                counts.removed
            );
        }

        // Per-day queues are consumed
        self.test_requests.remove(&today);
        self.trace_requests.remove(&today);

        // STEP 6: ADVANCE
        self.clock.advance_day();

        Ok(DayResult {
            date: today,
            new_exposures: self.tally.exposures,
            new_infectious: self.tally.infectious,
            new_removals: self.tally.removals,
            new_quarantines: self.tally.quarantines,
            positive_results: self.tally.positives,
        })
    }

    /// Step until past the end date
    pub fn run(&mut self) -> Result<(), SimulationError> {
        while !self.clock.is_finished() {
            self.step()?;
        }
        info!(
            "Run finished on {}: {} removed, {} events",
            self.clock.end_date(),
            self.state.count(Compartment::Removed),
            self.event_log.len()
        );
        Ok(())
    }

    /// Collect the run's results
    pub fn outcome(&self, repetition: usize) -> RunOutcome {
        RunOutcome {
            repetition,
            seed: self.rng.seed(),
            snapshots: self.statistics.snapshots().to_vec(),
            meeting_series: self.statistics.all_meeting_series().clone(),
            source_totals: self.statistics.source_totals(),
            infected_vaccinated: self.state.infected_vaccinated(),
            infected_unvaccinated: self.state.infected_unvaccinated(),
            event_counts: self.event_log.counts_by_type(),
        }
    }

    fn verify(&self) -> Result<(), SimulationError> {
        if self.parameters.check_invariants {
            self.state.check_invariants(&self.roster)?;
        }
        Ok(())
    }

    // ========================================================================
    // Daily update
    // ========================================================================

    /// Apply every transition due today
    pub fn daily_update(&mut self) {
        let today = self.clock.current_date();

        // Test results
        if let Some(positives) = self.positive_tests.remove(&today) {
            for individual in positives {
                self.initiate_quarantine(individual, today, None, true);
            }
        }

        // Removals
        for compartment in [
            Compartment::QuarantinedExposed,
            Compartment::QuarantinedAsymptomatic,
            Compartment::QuarantinedSymptomatic,
            Compartment::InfectiousAsymptomatic,
            Compartment::InfectiousSymptomatic,
        ] {
            let reason = if compartment.is_quarantined() {
                RemovalReason::QuarantineEnded
            } else {
                RemovalReason::Recovered
            };
            for individual in self.state.due(compartment, today) {
                if self.state.remove(&self.roster, individual, today).is_some() {
                    self.tally.removals += 1;
                    self.log(Event::Removed {
                        date: today,
                        individual,
                        reason,
                    });
                    if compartment == Compartment::InfectiousSymptomatic {
                        self.trace_requests
                            .entry(today)
                            .or_default()
                            .insert(individual);
                    }
                }
            }
        }

        // Quarantined susceptibles go back
        for individual in self.state.due(Compartment::QuarantinedSusceptible, today) {
            if self.state.release_susceptible(&self.roster, individual) {
                self.log(Event::QuarantineReleased {
                    date: today,
                    individual,
                });
            }
        }

        // Incubation ends
        for individual in self.state.due(Compartment::Exposed, today) {
            if let Some(compartment) = self.state.make_infectious(&self.roster, individual) {
                self.tally.infectious += 1;
                self.log(Event::BecameInfectious {
                    date: today,
                    individual,
                    symptomatic: compartment == Compartment::InfectiousSymptomatic,
                });
            }
        }

        self.community_exposures(today);
    }

    fn community_exposures(&mut self, today: NaiveDate) {
        let rate = self.parameters.community_exposure_rate;
        if rate <= 0.0 {
            return;
        }
        let pool: Vec<IndividualId> = self.state.susceptible().iter().copied().collect();
        let count = self.rng.poisson(rate * pool.len() as f64);
        if count == 0 {
            return;
        }
        for individual in self.rng.choose_distinct(&pool, count) {
            if self.passes_vaccine_gate(individual) {
                self.infect(individual, today, InfectionSource::Community);
            }
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Infect a susceptible individual
    ///
    /// Returns `false` (and changes nothing) unless the individual is
    /// Susceptible.
    pub fn infect(&mut self, individual: IndividualId, date: NaiveDate, source: InfectionSource) -> bool {
        if self.state.compartment_of(individual) != Some(Compartment::Susceptible) {
            return false;
        }
        let vaccinated = self.state.is_vaccinated(individual);
        let timeline = self
            .duration_model
            .duration(individual, date, vaccinated, &mut self.rng);
        if !self.state.expose(&self.roster, individual, timeline) {
            return false;
        }
        trace!(
            "{}: {} exposed via {}, contagious {}, removed {}",
            date,
            individual,
            source.label(),
            timeline.contagious_date,
            timeline.removal_date
        );
        self.tally.exposures += 1;
        self.statistics.record_source(individual, source.clone());
        self.log(Event::Exposed {
            date,
            individual,
            source,
        });
        true
    }

    /// Quarantine an individual, or remove them on a positive test
    ///
    /// `length` defaults to the configured quarantine length. Returns whether
    /// the individual changed compartment.
    ///
    /// - Susceptible: quarantined until `date + length` (also on a positive
    ///   test, as a precaution)
    /// - Exposed: quarantined until their original removal date
    /// - Infectious: quarantined until `min(date + length, removal date)`
    /// - Any infected compartment with a positive test: removed on `date`
    /// - Removed or already quarantined without a positive test: unchanged
    pub fn initiate_quarantine(
        &mut self,
        individual: IndividualId,
        date: NaiveDate,
        length: Option<u32>,
        positive_test: bool,
    ) -> bool {
        let Some(from) = self.state.compartment_of(individual) else {
            return false;
        };
        let length = length.unwrap_or(self.parameters.quarantine_length);
        let release = add_days(date, u64::from(length));

        if positive_test && from != Compartment::Susceptible {
            let removed = self.state.remove(&self.roster, individual, date).is_some();
            if removed {
                self.tally.removals += 1;
                self.tally.positives += 1;
                self.log(Event::Removed {
                    date,
                    individual,
                    reason: RemovalReason::PositiveTest,
                });
            }
            return removed;
        }

        let quarantined_until = match from {
            Compartment::Susceptible => self
                .state
                .quarantine_susceptible(&self.roster, individual, release)
                .then_some(release),
            Compartment::Exposed => {
                let removal = self.state.timeline(individual).map(|t| t.removal_date);
                if self.state.quarantine_exposed(&self.roster, individual) {
                    removal
                } else {
                    None
                }
            }
            Compartment::InfectiousAsymptomatic | Compartment::InfectiousSymptomatic => {
                let until = self
                    .state
                    .scheduled_exit(individual)
                    .map_or(release, |removal| release.min(removal));
                self.state
                    .quarantine_infectious(&self.roster, individual, until)
                    .map(|_| until)
            }
            _ => None,
        };

        match quarantined_until {
            Some(release) => {
                self.tally.quarantines += 1;
                self.log(Event::Quarantined {
                    date,
                    individual,
                    from,
                    release,
                });
                true
            }
            None => false,
        }
    }

    /// Queue a positive result for tomorrow
    pub fn schedule_positive_test_result(&mut self, individual: IndividualId) {
        let today = self.clock.current_date();
        let result_date = next_day(today);
        self.positive_tests
            .entry(result_date)
            .or_default()
            .insert(individual);
        self.log(Event::TestScheduled {
            date: today,
            individual,
            result_date,
        });
    }

    /// Ask for a test today; honoured by the testing policy
    pub fn request_testing(&mut self, individual: IndividualId) {
        let today = self.clock.current_date();
        self.test_requests.entry(today).or_default().insert(individual);
    }

    fn apply_actions(&mut self, actions: Vec<InterventionAction>) {
        let today = self.clock.current_date();
        for action in actions {
            match action {
                InterventionAction::Quarantine { individual, length } => {
                    self.initiate_quarantine(individual, today, length, false);
                }
                InterventionAction::PositiveTestResult(individual) => {
                    self.schedule_positive_test_result(individual);
                }
                InterventionAction::RequestTest(individual) => {
                    self.request_testing(individual);
                }
                InterventionAction::RecordTrace {
                    index_case,
                    contacts,
                } => {
                    self.log(Event::ContactTraced {
                        date: today,
                        index_case,
                        contacts,
                    });
                }
            }
        }
    }

    // ========================================================================
    // Transmission
    // ========================================================================

    fn passes_vaccine_gate(&mut self, individual: IndividualId) -> bool {
        !self.state.is_vaccinated(individual)
            || self.rng.bernoulli(1.0 - self.parameters.vaccine_benefit_self)
    }

    fn transmit(&mut self) {
        let today = self.clock.current_date();
        let schedule: Vec<(_, u32)> = match self.roster.occurrences_on(today) {
            Some(day) => day.iter().map(|(m, minutes)| (*m, *minutes)).collect(),
            None => return,
        };

        for (meeting, minutes) in schedule {
            let candidates = meeting_candidates(
                &self.roster,
                &self.state,
                meeting,
                minutes,
                &self.rates,
                &mut self.rng,
            );
            if candidates.is_empty() {
                continue;
            }
            let label = self
                .roster
                .meeting(meeting)
                .map(|m| m.source_label().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            for candidate in candidates {
                if self.state.compartment_of(candidate) != Some(Compartment::Susceptible) {
                    continue;
                }
                if !self.passes_vaccine_gate(candidate) {
                    continue;
                }
                self.infect(
                    candidate,
                    today,
                    InfectionSource::Meeting {
                        meeting,
                        label: label.clone(),
                    },
                );
            }
        }
    }

    fn log(&mut self, event: Event) {
        self.event_log.log(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::FixedDuration;
    use crate::models::roster::{MeetingKind, RosterBuilder};
    use crate::orchestrator::config::InitialExposure;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 9, d).unwrap()
    }

    fn fixed(incubation: u32, illness: u32, symptomatic: bool) -> Interventions {
        Interventions {
            duration_model: Box::new(FixedDuration {
                incubation_days: incubation,
                illness_days: illness,
                symptomatic,
            }),
            ..Interventions::default()
        }
    }

    fn simulation(seeds: Vec<u32>, interventions: Interventions) -> Simulation {
        try_simulation(seeds, interventions).unwrap()
    }

    fn try_simulation(
        seeds: Vec<u32>,
        interventions: Interventions,
    ) -> Result<Simulation, SimulationError> {
        let mut builder = RosterBuilder::new();
        builder.insert_meeting(
            "Lecture",
            MeetingKind::Course,
            Some("Classroom".to_string()),
            (0..4).map(IndividualId),
            [],
        );
        let roster = Arc::new(builder.build().unwrap());
        let parameters = SimulationParameters {
            base_transmission_rate: 0.0,
            start_date: date(1),
            end_date: date(30),
            check_invariants: true,
            ..SimulationParameters::default()
        };
        let config = SimulationConfig::new(
            parameters,
            InitialExposure::Explicit(seeds.into_iter().map(IndividualId).collect()),
        );
        Simulation::new(roster, &config, interventions, 7)
    }

    #[test]
    fn test_infect_is_idempotent() {
        let mut sim = simulation(vec![0], fixed(2, 5, false));
        assert!(!sim.infect(IndividualId(0), date(1), InfectionSource::Community));
        assert!(sim.infect(IndividualId(1), date(1), InfectionSource::Community));
        assert!(!sim.infect(IndividualId(1), date(1), InfectionSource::Community));
        assert_eq!(sim.state().count(Compartment::Exposed), 2);
    }

    #[test]
    fn test_quarantine_caps_at_removal_date() {
        let mut sim = simulation(vec![0], fixed(1, 3, false));
        // Day 1 -> infectious on day 2, removal on day 5
        sim.step().unwrap();
        sim.step().unwrap();
        assert_eq!(
            sim.compartment_of(IndividualId(0)),
            Some(Compartment::InfectiousAsymptomatic)
        );
        assert!(sim.initiate_quarantine(IndividualId(0), date(3), None, false));
        assert_eq!(sim.state().scheduled_exit(IndividualId(0)), Some(date(5)));
    }

    #[test]
    fn test_symptomatic_quarantine_removed_at_illness_end() {
        let interventions = Interventions {
            contact_tracing: Box::new(crate::policy::BasicContactTracing::default()),
            ..fixed(1, 2, true)
        };
        let mut sim = simulation(vec![0], interventions);
        sim.step().unwrap(); // day 1
        sim.step().unwrap(); // day 2: infectious, removal due day 4
        assert_eq!(
            sim.compartment_of(IndividualId(0)),
            Some(Compartment::InfectiousSymptomatic)
        );
        assert!(sim.initiate_quarantine(IndividualId(0), date(2), None, false));
        assert_eq!(sim.state().scheduled_exit(IndividualId(0)), Some(date(4)));

        sim.step().unwrap(); // day 3
        assert_eq!(
            sim.compartment_of(IndividualId(0)),
            Some(Compartment::QuarantinedSymptomatic)
        );
        sim.step().unwrap(); // day 4
        assert_eq!(sim.compartment_of(IndividualId(0)), Some(Compartment::Removed));
        let removed = sim.event_log().events_of_type("Removed");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].date(), date(4));
        // Recovery inside quarantine is not a traced case
        assert!(sim.event_log().events_of_type("ContactTraced").is_empty());
        assert_eq!(sim.state().count(Compartment::QuarantinedSusceptible), 0);
    }

    #[test]
    fn test_invalid_duration_model_rejected_at_setup() {
        let interventions = Interventions {
            duration_model: Box::new(crate::duration::VariedResponse {
                rate_contagious: 0.0,
                ..crate::duration::VariedResponse::default()
            }),
            ..Interventions::default()
        };
        let result = try_simulation(vec![0], interventions);
        assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));
    }

    #[test]
    fn test_positive_test_on_susceptible_is_precautionary() {
        let mut sim = simulation(vec![0], fixed(2, 5, false));
        assert!(sim.initiate_quarantine(IndividualId(3), date(1), Some(3), true));
        assert_eq!(
            sim.compartment_of(IndividualId(3)),
            Some(Compartment::QuarantinedSusceptible)
        );
        assert_eq!(sim.state().scheduled_exit(IndividualId(3)), Some(date(4)));
    }

    #[test]
    fn test_positive_test_result_arrives_next_day() {
        let mut sim = simulation(vec![0], fixed(1, 20, false));
        sim.step().unwrap(); // day 1
        sim.step().unwrap(); // day 2: infectious
        sim.schedule_positive_test_result(IndividualId(0));
        assert!(sim.pending_positive_tests(date(4)).unwrap().contains(&IndividualId(0)));
        sim.step().unwrap(); // day 3
        assert_eq!(
            sim.compartment_of(IndividualId(0)),
            Some(Compartment::InfectiousAsymptomatic)
        );
        sim.step().unwrap(); // day 4
        assert_eq!(sim.compartment_of(IndividualId(0)), Some(Compartment::Removed));
    }

    #[test]
    fn test_symptomatic_recovery_is_traced_same_day() {
        let interventions = Interventions {
            contact_tracing: Box::new(crate::policy::BasicContactTracing::default()),
            ..fixed(1, 2, true)
        };
        let mut sim = simulation(vec![0], interventions);
        sim.step().unwrap(); // day 1
        sim.step().unwrap(); // day 2: infectious
        sim.step().unwrap(); // day 3
        sim.step().unwrap(); // day 4: removed and traced
        assert_eq!(sim.compartment_of(IndividualId(0)), Some(Compartment::Removed));
        assert_eq!(sim.event_log().events_of_type("Removed").len(), 1);
        let traced = sim.event_log().events_of_type("ContactTraced");
        assert_eq!(traced.len(), 1);
        assert_eq!(traced[0].date(), date(4));
    }

    #[test]
    fn test_step_after_end_fails() {
        let mut sim = simulation(vec![0], fixed(2, 5, false));
        sim.run().unwrap();
        assert_eq!(sim.step(), Err(SimulationError::Finished));
    }
}
