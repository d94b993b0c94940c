//! Repeated runs of one scenario
//!
//! Repetition `r` runs with seed `derive_seed(base_seed, r)`, so results do
//! not depend on how many worker threads share the work.

use log::info;
use std::sync::Arc;
use std::thread;

use crate::models::roster::Roster;
use crate::orchestrator::config::{ScenarioConfig, SimulationConfig};
use crate::orchestrator::engine::{Interventions, Simulation, SimulationError};
use crate::rng::{derive_seed, RngManager};
use crate::stats::{ExperimentSummary, RunOutcome};

/// A scenario run `repetitions` times
pub struct Experiment {
    roster: Arc<Roster>,
    config: SimulationConfig,
    interventions: Interventions,
    base_seed: u64,
    threads: usize,
}

impl Experiment {
    pub fn new(
        roster: Roster,
        config: SimulationConfig,
        interventions: Interventions,
        base_seed: u64,
    ) -> Self {
        Self {
            roster: Arc::new(roster),
            config,
            interventions,
            base_seed,
            threads: 1,
        }
    }

    /// Build roster and models from a scenario
    ///
    /// Randomised test groups are drawn once from `base_seed` and shared
    /// by every repetition.
    pub fn from_scenario(scenario: &ScenarioConfig, base_seed: u64) -> Result<Self, SimulationError> {
        scenario.validate()?;
        let roster = scenario.build_roster()?;
        let mut rng = RngManager::new(base_seed);
        let interventions = Interventions::from_scenario(scenario, &roster, &mut rng);
        Ok(Self::new(roster, scenario.simulation_config(), interventions, base_seed))
    }

    /// Number of worker threads (at least one)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.config.parameters.repetitions = repetitions;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn repetitions(&self) -> usize {
        self.config.parameters.repetitions
    }

    /// Seed of one repetition
    pub fn seed_for(&self, repetition: usize) -> u64 {
        derive_seed(self.base_seed, repetition as u64)
    }

    /// Run a single repetition
    pub fn run_repetition(&self, repetition: usize) -> Result<RunOutcome, SimulationError> {
        run_one(
            Arc::clone(&self.roster),
            &self.config,
            self.interventions.clone(),
            repetition,
            self.seed_for(repetition),
        )
    }

    /// Run every repetition, ordered by repetition index
    pub fn run_outcomes(&self) -> Result<Vec<RunOutcome>, SimulationError> {
        let repetitions = self.repetitions();
        if repetitions == 0 {
            return Err(SimulationError::InvalidConfig(
                "repetitions must be at least 1".to_string(),
            ));
        }
        self.config.parameters.validate()?;

        let workers = self.threads.min(repetitions);
        info!(
            "Running {} repetitions on {} thread(s), base seed {}",
            repetitions, workers, self.base_seed
        );

        if workers == 1 {
            return (0..repetitions)
                .map(|repetition| self.run_repetition(repetition))
                .collect();
        }

        // Static round-robin assignment; models are cloned here because
        // they are Send but not Sync.
        let mut batches: Vec<Vec<(usize, Interventions)>> = (0..workers).map(|_| Vec::new()).collect();
        for repetition in 0..repetitions {
            batches[repetition % workers].push((repetition, self.interventions.clone()));
        }

        let results: Vec<Result<RunOutcome, SimulationError>> = thread::scope(|scope| {
            let handles: Vec<_> = batches
                .into_iter()
                .map(|batch| {
                    let roster = Arc::clone(&self.roster);
                    let config = &self.config;
                    let base_seed = self.base_seed;
                    scope.spawn(move || {
                        batch
                            .into_iter()
                            .map(|(repetition, interventions)| {
                                run_one(
                                    Arc::clone(&roster),
                                    config,
                                    interventions,
                                    repetition,
                                    derive_seed(base_seed, repetition as u64),
                                )
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut outcomes = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        outcomes.sort_by_key(|outcome| outcome.repetition);
        Ok(outcomes)
    }

    /// Run every repetition and aggregate
    pub fn run(&self) -> Result<ExperimentSummary, SimulationError> {
        let outcomes = self.run_outcomes()?;
        let summary = ExperimentSummary::from_outcomes(&outcomes);
        info!(
            "Experiment finished: final removed mean {:.2} (std {:.2})",
            summary.final_removed_mean, summary.final_removed_std
        );
        Ok(summary)
    }
}

fn run_one(
    roster: Arc<Roster>,
    config: &SimulationConfig,
    interventions: Interventions,
    repetition: usize,
    seed: u64,
) -> Result<RunOutcome, SimulationError> {
    let mut simulation = Simulation::new(roster, config, interventions, seed)?;
    simulation.run()?;
    Ok(simulation.outcome(repetition))
}
