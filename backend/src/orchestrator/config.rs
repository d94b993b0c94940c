//! Simulation and scenario configuration
//!
//! All configuration types are serde-deserializable with the customary
//! defaults, so a scenario file only needs to name what it changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::duration::DurationModelConfig;
use crate::models::clusters::{self, ClusterSettings};
use crate::models::roster::{IndividualId, Roster, RosterError, RosterSpec};
use crate::models::schedule;
use crate::orchestrator::engine::SimulationError;
use crate::policy::{ContactTracingConfig, TestingPolicyConfig};
use crate::rng::RngManager;
use crate::transmission::TransmissionRates;

fn default_rate() -> f64 {
    1.0 / (65.6 * 60.0 * 7.0)
}

fn default_quarantine_length() -> u32 {
    14
}

fn default_vaccine_benefit_self() -> f64 {
    0.9
}

fn default_vaccine_benefit_others() -> f64 {
    0.5
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 9, 2).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 11, 13).unwrap_or_default()
}

fn default_repetitions() -> usize {
    10
}

/// Numeric parameters of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Per-minute transmission rate per infectious contact
    #[serde(default = "default_rate")]
    pub base_transmission_rate: f64,

    /// Default quarantine length in days
    #[serde(default = "default_quarantine_length")]
    pub quarantine_length: u32,

    /// Minutes of mingling added to each course occurrence
    #[serde(default)]
    pub preclass_interaction_time: u32,

    /// Susceptibility reduction for vaccinated individuals
    #[serde(default = "default_vaccine_benefit_self")]
    pub vaccine_benefit_self: f64,

    /// Infectiousness reduction for vaccinated individuals
    #[serde(default = "default_vaccine_benefit_others")]
    pub vaccine_benefit_others: f64,

    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Last simulated day (inclusive)
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,

    #[serde(default = "default_repetitions")]
    pub repetitions: usize,

    /// Expected daily fraction of susceptibles infected outside any meeting
    #[serde(default)]
    pub community_exposure_rate: f64,

    /// Run the full invariant check after every daily phase
    #[serde(default)]
    pub check_invariants: bool,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            base_transmission_rate: default_rate(),
            quarantine_length: default_quarantine_length(),
            preclass_interaction_time: 0,
            vaccine_benefit_self: default_vaccine_benefit_self(),
            vaccine_benefit_others: default_vaccine_benefit_others(),
            start_date: default_start_date(),
            end_date: default_end_date(),
            repetitions: default_repetitions(),
            community_exposure_rate: 0.0,
            check_invariants: false,
        }
    }
}

impl SimulationParameters {
    pub fn transmission_rates(&self) -> TransmissionRates {
        TransmissionRates {
            base_rate: self.base_transmission_rate,
            preclass_interaction_time: self.preclass_interaction_time,
            vaccine_benefit_others: self.vaccine_benefit_others,
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<(), SimulationError> {
        let invalid = |msg: String| Err(SimulationError::InvalidConfig(msg));

        if !self.base_transmission_rate.is_finite() || self.base_transmission_rate < 0.0 {
            return invalid(format!(
                "base_transmission_rate must be a non-negative number, got {}",
                self.base_transmission_rate
            ));
        }
        if self.quarantine_length == 0 {
            return invalid("quarantine_length must be at least one day".to_string());
        }
        for (name, value) in [
            ("vaccine_benefit_self", self.vaccine_benefit_self),
            ("vaccine_benefit_others", self.vaccine_benefit_others),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{} must be in [0, 1], got {}", name, value));
            }
        }
        if self.start_date > self.end_date {
            return invalid(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            ));
        }
        if !self.community_exposure_rate.is_finite() || self.community_exposure_rate < 0.0 {
            return invalid(format!(
                "community_exposure_rate must be a non-negative number, got {}",
                self.community_exposure_rate
            ));
        }
        Ok(())
    }
}

/// Who is infected on the first day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitialExposure {
    /// These individuals
    Explicit(Vec<IndividualId>),
    /// Distinct individuals drawn from the whole roster
    Random(usize),
    /// Distinct individuals drawn from the members of the largest meeting
    LargestMeeting(usize),
}

impl InitialExposure {
    /// Resolve to concrete individuals
    pub fn resolve(
        &self,
        roster: &Roster,
        rng: &mut RngManager,
    ) -> Result<BTreeSet<IndividualId>, SimulationError> {
        let draw = |pool: Vec<IndividualId>,
                    count: usize,
                    rng: &mut RngManager|
         -> Result<BTreeSet<IndividualId>, SimulationError> {
            if count == 0 {
                return Err(SimulationError::EmptyInitialExposure);
            }
            if count > pool.len() {
                return Err(SimulationError::InitialExposureTooLarge {
                    requested: count,
                    available: pool.len(),
                });
            }
            Ok(rng.choose_distinct(&pool, count).into_iter().collect())
        };

        match self {
            InitialExposure::Explicit(ids) => {
                if ids.is_empty() {
                    return Err(SimulationError::EmptyInitialExposure);
                }
                if let Some(unknown) = ids.iter().find(|id| !roster.contains_individual(**id)) {
                    return Err(SimulationError::UnknownIndividual(*unknown));
                }
                Ok(ids.iter().copied().collect())
            }
            InitialExposure::Random(count) => {
                draw(roster.individuals().iter().copied().collect(), *count, rng)
            }
            InitialExposure::LargestMeeting(count) => {
                let pool = roster
                    .largest_meeting()
                    .map(|meeting| roster.members(meeting).iter().copied().collect())
                    .unwrap_or_default();
                draw(pool, *count, rng)
            }
        }
    }
}

/// Who is vaccinated before the run starts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Vaccination {
    #[default]
    None,
    Explicit(Vec<IndividualId>),
    /// Fraction of the roster, drawn at random
    Coverage(f64),
}

impl Vaccination {
    pub fn resolve(
        &self,
        roster: &Roster,
        rng: &mut RngManager,
    ) -> Result<BTreeSet<IndividualId>, SimulationError> {
        match self {
            Vaccination::None => Ok(BTreeSet::new()),
            Vaccination::Explicit(ids) => {
                if let Some(unknown) = ids.iter().find(|id| !roster.contains_individual(**id)) {
                    return Err(SimulationError::UnknownIndividual(*unknown));
                }
                Ok(ids.iter().copied().collect())
            }
            Vaccination::Coverage(fraction) => {
                if !(0.0..=1.0).contains(fraction) {
                    return Err(SimulationError::InvalidConfig(format!(
                        "vaccination coverage must be in [0, 1], got {}",
                        fraction
                    )));
                }
                let pool: Vec<IndividualId> = roster.individuals().iter().copied().collect();
                let count = (fraction * pool.len() as f64).round() as usize;
                Ok(rng.choose_distinct(&pool, count).into_iter().collect())
            }
        }
    }
}

fn default_max_size() -> usize {
    50
}

fn default_pair_minutes() -> u32 {
    1200
}

fn default_weighted() -> bool {
    true
}

/// Schedule variant applied to the roster before running
///
/// Cluster variants draw their groups from their own `seed`, so every
/// repetition of an experiment sees the same roster.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ScheduleTransform {
    #[default]
    None,
    AlternateHybrid,
    SplitClasses,
    SmallClassesOnly {
        #[serde(default = "default_max_size")]
        max_size: usize,
    },
    /// Fresh social groups drawn from everyone, every day
    RandomClusters {
        settings: ClusterSettings,
        #[serde(default)]
        seed: u64,
    },
    /// Social groups drawn once, meeting daily
    StaticClusters {
        settings: ClusterSettings,
        #[serde(default)]
        seed: u64,
    },
    /// Pairs of friends meeting daily
    SocialPairs {
        fraction_paired: f64,
        #[serde(default = "default_pair_minutes")]
        minutes: u32,
        #[serde(default = "default_weighted")]
        weighted: bool,
        #[serde(default)]
        excluded: Vec<IndividualId>,
        #[serde(default)]
        seed: u64,
    },
    /// Small groups within each named team
    TeamClusters {
        teams: BTreeMap<String, Vec<IndividualId>>,
        settings: ClusterSettings,
        /// Keep the same groups all term instead of redrawing daily
        #[serde(default)]
        fixed: bool,
        #[serde(default)]
        seed: u64,
    },
    /// Apply each transform in order
    Sequence(Vec<ScheduleTransform>),
}

impl ScheduleTransform {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ScheduleTransform::RandomClusters { settings, .. }
            | ScheduleTransform::StaticClusters { settings, .. }
            | ScheduleTransform::TeamClusters { settings, .. } => settings.validate(),
            ScheduleTransform::SocialPairs { fraction_paired, .. } => {
                if (0.0..=1.0).contains(fraction_paired) {
                    Ok(())
                } else {
                    Err(format!(
                        "fraction_paired must be in [0, 1], got {}",
                        fraction_paired
                    ))
                }
            }
            ScheduleTransform::Sequence(steps) => steps.iter().try_for_each(|step| step.validate()),
            ScheduleTransform::None
            | ScheduleTransform::AlternateHybrid
            | ScheduleTransform::SplitClasses
            | ScheduleTransform::SmallClassesOnly { .. } => Ok(()),
        }
    }

    pub fn apply(&self, roster: &Roster) -> Result<Roster, RosterError> {
        match self {
            ScheduleTransform::None => Ok(roster.clone()),
            ScheduleTransform::AlternateHybrid => schedule::alternate_hybrid(roster),
            ScheduleTransform::SplitClasses => schedule::split_classes(roster),
            ScheduleTransform::SmallClassesOnly { max_size } => {
                schedule::small_classes_only(roster, *max_size)
            }
            ScheduleTransform::RandomClusters { settings, seed } => {
                let Some(range) = settings.date_range(roster) else {
                    return Ok(roster.clone());
                };
                let pool: Vec<IndividualId> = roster.individuals().iter().copied().collect();
                let groups =
                    clusters::daily_clusters(&pool, settings, range, &mut RngManager::new(*seed));
                clusters::add_clusters(roster, &groups, "daily ")
            }
            ScheduleTransform::StaticClusters { settings, seed } => {
                let Some(range) = settings.date_range(roster) else {
                    return Ok(roster.clone());
                };
                let pool: Vec<IndividualId> = roster.individuals().iter().copied().collect();
                let groups =
                    clusters::static_clusters(&pool, settings, range, &mut RngManager::new(*seed));
                clusters::add_clusters(roster, &groups, "static ")
            }
            ScheduleTransform::SocialPairs {
                fraction_paired,
                minutes,
                weighted,
                excluded,
                seed,
            } => {
                let excluded: BTreeSet<IndividualId> = excluded.iter().copied().collect();
                let pairs = clusters::pair_clusters(
                    roster,
                    *fraction_paired,
                    *minutes,
                    &excluded,
                    *weighted,
                    &mut RngManager::new(*seed),
                );
                clusters::add_clusters(roster, &pairs, "pair ")
            }
            ScheduleTransform::TeamClusters {
                teams,
                settings,
                fixed,
                seed,
            } => {
                let Some(range) = settings.date_range(roster) else {
                    return Ok(roster.clone());
                };
                // Only individuals on the roster take part
                let teams: BTreeMap<String, Vec<IndividualId>> = teams
                    .iter()
                    .map(|(name, members)| {
                        let known: Vec<IndividualId> = members
                            .iter()
                            .copied()
                            .filter(|member| roster.contains_individual(*member))
                            .collect();
                        (name.clone(), known)
                    })
                    .collect();
                let groups = clusters::team_clusters(
                    &teams,
                    settings,
                    range,
                    *fixed,
                    &mut RngManager::new(*seed),
                );
                clusters::add_clusters(roster, &groups, "team ")
            }
            ScheduleTransform::Sequence(steps) => {
                let mut current = roster.clone();
                for step in steps {
                    current = step.apply(&current)?;
                }
                Ok(current)
            }
        }
    }
}

/// Per-run setup that is not a pluggable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub parameters: SimulationParameters,
    pub initial_exposure: InitialExposure,
    #[serde(default)]
    pub vaccination: Vaccination,
}

impl SimulationConfig {
    pub fn new(parameters: SimulationParameters, initial_exposure: InitialExposure) -> Self {
        Self {
            parameters,
            initial_exposure,
            vaccination: Vaccination::None,
        }
    }
}

/// Complete scenario as loaded from a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub roster: RosterSpec,

    #[serde(default)]
    pub parameters: SimulationParameters,

    #[serde(default)]
    pub duration_model: DurationModelConfig,

    #[serde(default)]
    pub testing: TestingPolicyConfig,

    #[serde(default)]
    pub contact_tracing: ContactTracingConfig,

    pub initial_exposure: InitialExposure,

    #[serde(default)]
    pub vaccination: Vaccination,

    #[serde(default)]
    pub transform: ScheduleTransform,
}

impl ScenarioConfig {
    /// Parse a scenario from JSON
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("scenario JSON: {}", e)))
    }

    /// Validate every section that does not need the roster
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.parameters.validate()?;
        self.duration_model
            .validate()
            .map_err(SimulationError::InvalidConfig)?;
        self.testing.validate().map_err(SimulationError::InvalidConfig)?;
        self.contact_tracing
            .validate()
            .map_err(SimulationError::InvalidConfig)?;
        self.transform
            .validate()
            .map_err(SimulationError::InvalidConfig)?;
        Ok(())
    }

    /// Build the roster and apply the schedule transform
    pub fn build_roster(&self) -> Result<Roster, SimulationError> {
        let base = self.roster.build()?;
        Ok(self.transform.apply(&base)?)
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            parameters: self.parameters.clone(),
            initial_exposure: self.initial_exposure.clone(),
            vaccination: self.vaccination.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roster::{MeetingKind, RosterBuilder};

    fn roster() -> Roster {
        let mut builder = RosterBuilder::new();
        builder.insert_meeting("Big", MeetingKind::Course, None, (0..6).map(IndividualId), []);
        builder.insert_meeting("Small", MeetingKind::Course, None, (6..8).map(IndividualId), []);
        builder.add_individual(IndividualId(8));
        builder.build().unwrap()
    }

    #[test]
    fn test_default_parameters_valid() {
        let params = SimulationParameters::default();
        assert!(params.validate().is_ok());
        assert!((params.base_transmission_rate - 1.0 / 27552.0).abs() < 1e-15);
        assert_eq!(params.start_date, NaiveDate::from_ymd_opt(2020, 9, 2).unwrap());
        assert_eq!(params.end_date, NaiveDate::from_ymd_opt(2020, 11, 13).unwrap());
    }

    #[test]
    fn test_invalid_parameters() {
        let mut params = SimulationParameters::default();
        params.vaccine_benefit_self = 1.5;
        assert!(matches!(params.validate(), Err(SimulationError::InvalidConfig(_))));

        let mut params = SimulationParameters::default();
        params.start_date = params.end_date.succ_opt().unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_parameters_from_partial_json() {
        let params: SimulationParameters =
            serde_json::from_str(r#"{"quarantine_length": 10, "start_date": "2020-09-07"}"#)
                .unwrap();
        assert_eq!(params.quarantine_length, 10);
        assert_eq!(params.repetitions, 10);
        assert_eq!(params.vaccine_benefit_others, 0.5);
    }

    #[test]
    fn test_initial_exposure_errors() {
        let roster = roster();
        let mut rng = RngManager::new(1);
        assert_eq!(
            InitialExposure::Explicit(vec![]).resolve(&roster, &mut rng),
            Err(SimulationError::EmptyInitialExposure)
        );
        assert_eq!(
            InitialExposure::Random(10).resolve(&roster, &mut rng),
            Err(SimulationError::InitialExposureTooLarge {
                requested: 10,
                available: 9
            })
        );
        assert_eq!(
            InitialExposure::Explicit(vec![IndividualId(99)]).resolve(&roster, &mut rng),
            Err(SimulationError::UnknownIndividual(IndividualId(99)))
        );
    }

    #[test]
    fn test_largest_meeting_seeds_come_from_it() {
        let roster = roster();
        let mut rng = RngManager::new(4);
        let seeds = InitialExposure::LargestMeeting(3)
            .resolve(&roster, &mut rng)
            .unwrap();
        assert_eq!(seeds.len(), 3);
        assert!(seeds.iter().all(|id| id.0 < 6));
    }

    #[test]
    fn test_vaccination_coverage() {
        let roster = roster();
        let mut rng = RngManager::new(2);
        let vaccinated = Vaccination::Coverage(1.0 / 3.0)
            .resolve(&roster, &mut rng)
            .unwrap();
        assert_eq!(vaccinated.len(), 3);
        assert!(Vaccination::Coverage(1.2).resolve(&roster, &mut rng).is_err());
    }
}
