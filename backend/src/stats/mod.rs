//! Statistics Recorder
//!
//! Per-run daily snapshots, per-meeting health series and infection sources,
//! plus aggregation of many runs into an [`ExperimentSummary`].
//!
//! Reported series combine compartments the way results are usually read:
//!
//! | Series | Compartments |
//! |---|---|
//! | susceptible | S + Q |
//! | exposed | E + Qe |
//! | infectious | Ia + Is |
//! | quarantined | Q + Qe + Qa + Qs |
//! | removed | R |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::compartment::{Compartment, InfectionSource, MeetingHealthCounts};
use crate::models::roster::{IndividualId, MeetingId};
use crate::models::state::SimulationState;

/// Size of every compartment on one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentCounts {
    pub susceptible: usize,
    pub exposed: usize,
    pub infectious_asymptomatic: usize,
    pub infectious_symptomatic: usize,
    pub quarantined_susceptible: usize,
    pub quarantined_exposed: usize,
    pub quarantined_asymptomatic: usize,
    pub quarantined_symptomatic: usize,
    pub removed: usize,
    pub vaccinated: usize,
}

impl CompartmentCounts {
    pub fn from_state(state: &SimulationState) -> Self {
        Self {
            susceptible: state.count(Compartment::Susceptible),
            exposed: state.count(Compartment::Exposed),
            infectious_asymptomatic: state.count(Compartment::InfectiousAsymptomatic),
            infectious_symptomatic: state.count(Compartment::InfectiousSymptomatic),
            quarantined_susceptible: state.count(Compartment::QuarantinedSusceptible),
            quarantined_exposed: state.count(Compartment::QuarantinedExposed),
            quarantined_asymptomatic: state.count(Compartment::QuarantinedAsymptomatic),
            quarantined_symptomatic: state.count(Compartment::QuarantinedSymptomatic),
            removed: state.count(Compartment::Removed),
            vaccinated: state.vaccinated().len(),
        }
    }

    /// Individuals across all nine compartments
    pub fn population(&self) -> usize {
        self.susceptible
            + self.exposed
            + self.infectious_asymptomatic
            + self.infectious_symptomatic
            + self.quarantined_susceptible
            + self.quarantined_exposed
            + self.quarantined_asymptomatic
            + self.quarantined_symptomatic
            + self.removed
    }

    pub fn reported_susceptible(&self) -> usize {
        self.susceptible + self.quarantined_susceptible
    }

    pub fn reported_exposed(&self) -> usize {
        self.exposed + self.quarantined_exposed
    }

    pub fn reported_infectious(&self) -> usize {
        self.infectious_asymptomatic + self.infectious_symptomatic
    }

    pub fn reported_quarantined(&self) -> usize {
        self.quarantined_susceptible
            + self.quarantined_exposed
            + self.quarantined_asymptomatic
            + self.quarantined_symptomatic
    }
}

/// Counts recorded at the end of one simulated day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub counts: CompartmentCounts,
}

/// Collects one run's statistics
#[derive(Debug, Clone, Default)]
pub struct StatisticsRecorder {
    snapshots: Vec<DailySnapshot>,
    meeting_series: BTreeMap<MeetingId, Vec<MeetingHealthCounts>>,
    sources: BTreeMap<IndividualId, InfectionSource>,
}

impl StatisticsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot compartment counts and per-meeting health for `date`
    pub fn record_day(&mut self, date: NaiveDate, state: &SimulationState) {
        self.snapshots.push(DailySnapshot {
            date,
            counts: CompartmentCounts::from_state(state),
        });
        for (meeting, health) in state.all_meeting_health() {
            self.meeting_series
                .entry(*meeting)
                .or_default()
                .push(health.counts());
        }
    }

    pub fn record_source(&mut self, individual: IndividualId, source: InfectionSource) {
        self.sources.insert(individual, source);
    }

    pub fn snapshots(&self) -> &[DailySnapshot] {
        &self.snapshots
    }

    pub fn latest(&self) -> Option<&DailySnapshot> {
        self.snapshots.last()
    }

    /// Daily S/E/I/R counts of one meeting, aligned with `snapshots()`
    pub fn meeting_series(&self, meeting: MeetingId) -> &[MeetingHealthCounts] {
        self.meeting_series
            .get(&meeting)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_meeting_series(&self) -> &BTreeMap<MeetingId, Vec<MeetingHealthCounts>> {
        &self.meeting_series
    }

    pub fn sources(&self) -> &BTreeMap<IndividualId, InfectionSource> {
        &self.sources
    }

    /// Number of infections per source label
    pub fn source_totals(&self) -> BTreeMap<String, usize> {
        let mut totals = BTreeMap::new();
        for source in self.sources.values() {
            *totals.entry(source.label().to_string()).or_insert(0) += 1;
        }
        totals
    }
}

/// Result of one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub repetition: usize,
    pub seed: u64,
    pub snapshots: Vec<DailySnapshot>,
    pub meeting_series: BTreeMap<MeetingId, Vec<MeetingHealthCounts>>,
    pub source_totals: BTreeMap<String, usize>,
    pub infected_vaccinated: usize,
    pub infected_unvaccinated: usize,
    pub event_counts: BTreeMap<String, usize>,
}

impl RunOutcome {
    /// Removed count on the last recorded day
    pub fn final_removed(&self) -> usize {
        self.snapshots
            .last()
            .map(|snapshot| snapshot.counts.removed)
            .unwrap_or(0)
    }
}

// ============================================================================
// Aggregation
// ============================================================================

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Standard deviation with `ddof` degrees of freedom removed
fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return 0.0;
    }
    let m = mean(values);
    let squares: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (squares / (values.len() - ddof) as f64).sqrt()
}

/// Half-width of the normal 95% confidence interval of the mean
fn ci95(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    1.96 * std_dev(values, 0) / (values.len() as f64).sqrt()
}

/// Aggregate over all repetitions of an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub repetitions: usize,
    pub dates: Vec<NaiveDate>,

    pub mean_susceptible: Vec<f64>,
    pub mean_exposed: Vec<f64>,
    pub mean_infectious: Vec<f64>,
    pub mean_quarantined: Vec<f64>,
    pub mean_removed: Vec<f64>,
    pub mean_vaccinated: Vec<f64>,

    /// 95% CI half-widths, per day
    pub ci95_exposed: Vec<f64>,
    pub ci95_infectious: Vec<f64>,

    /// Removed count at the end of each run, in repetition order
    pub final_removed: Vec<usize>,
    pub final_removed_mean: f64,
    /// Sample standard deviation (n - 1)
    pub final_removed_std: f64,

    /// Mean infections per run, by source label
    pub source_means: BTreeMap<String, f64>,
    /// Infections per run by source label, in repetition order
    pub source_distributions: BTreeMap<String, Vec<usize>>,

    pub infected_vaccinated_mean: f64,
    pub infected_unvaccinated_mean: f64,

    /// Highest mean daily quarantine load
    pub quarantine_peak: f64,
    /// Mean of the mean daily quarantine loads
    pub quarantine_mean: f64,
}

impl ExperimentSummary {
    /// Aggregate finished runs (in any order; sorted by repetition first)
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
        let mut runs: Vec<&RunOutcome> = outcomes.iter().collect();
        runs.sort_by_key(|run| run.repetition);

        let days = runs.iter().map(|run| run.snapshots.len()).min().unwrap_or(0);
        let dates: Vec<NaiveDate> = runs
            .first()
            .map(|run| run.snapshots[..days].iter().map(|s| s.date).collect())
            .unwrap_or_default();

        let column = |day: usize, series: fn(&CompartmentCounts) -> usize| -> Vec<f64> {
            runs.iter()
                .map(|run| series(&run.snapshots[day].counts) as f64)
                .collect()
        };
        let daily_mean = |series: fn(&CompartmentCounts) -> usize| -> Vec<f64> {
            (0..days).map(|day| mean(&column(day, series))).collect()
        };
        let daily_ci = |series: fn(&CompartmentCounts) -> usize| -> Vec<f64> {
            (0..days).map(|day| ci95(&column(day, series))).collect()
        };

        let mean_quarantined = daily_mean(CompartmentCounts::reported_quarantined);
        let quarantine_peak = mean_quarantined.iter().copied().fold(0.0, f64::max);
        let quarantine_mean = mean(&mean_quarantined);

        let final_removed: Vec<usize> = runs.iter().map(|run| run.final_removed()).collect();
        let final_values: Vec<f64> = final_removed.iter().map(|v| *v as f64).collect();

        let mut source_distributions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for label in runs.iter().flat_map(|run| run.source_totals.keys()) {
            source_distributions.entry(label.clone()).or_default();
        }
        for (label, distribution) in source_distributions.iter_mut() {
            *distribution = runs
                .iter()
                .map(|run| run.source_totals.get(label).copied().unwrap_or(0))
                .collect();
        }
        let source_means = source_distributions
            .iter()
            .map(|(label, counts)| {
                let values: Vec<f64> = counts.iter().map(|c| *c as f64).collect();
                (label.clone(), mean(&values))
            })
            .collect();

        let per_run = |f: fn(&RunOutcome) -> usize| -> f64 {
            let values: Vec<f64> = runs.iter().map(|run| f(*run) as f64).collect();
            mean(&values)
        };

        Self {
            repetitions: runs.len(),
            dates,
            mean_susceptible: daily_mean(CompartmentCounts::reported_susceptible),
            mean_exposed: daily_mean(CompartmentCounts::reported_exposed),
            mean_infectious: daily_mean(CompartmentCounts::reported_infectious),
            mean_quarantined,
            mean_removed: daily_mean(|c| c.removed),
            mean_vaccinated: daily_mean(|c| c.vaccinated),
            ci95_exposed: daily_ci(CompartmentCounts::reported_exposed),
            ci95_infectious: daily_ci(CompartmentCounts::reported_infectious),
            final_removed_mean: mean(&final_values),
            final_removed_std: std_dev(&final_values, 1),
            final_removed,
            source_means,
            source_distributions,
            infected_vaccinated_mean: per_run(|run| run.infected_vaccinated),
            infected_unvaccinated_mean: per_run(|run| run.infected_unvaccinated),
            quarantine_peak,
            quarantine_mean,
        }
    }
}
