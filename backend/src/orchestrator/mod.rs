//! Orchestrator - main simulation loop
//!
//! - `config`: parameters and scenario files
//! - `engine`: one run, one day per step
//! - `experiment`: repeated runs and aggregation

pub mod config;
pub mod engine;
pub mod experiment;

// Re-export main types for convenience
pub use config::{
    InitialExposure, ScenarioConfig, ScheduleTransform, SimulationConfig, SimulationParameters,
    Vaccination,
};
pub use engine::{DayResult, Interventions, Simulation, SimulationError};
pub use experiment::Experiment;
