//! Campus SEIR Simulator Core - Rust Engine
//!
//! Stochastic SEIR epidemic simulation over a campus meeting roster, with
//! quarantine, testing and contact tracing interventions.
//!
//! # Architecture
//!
//! - **core**: Simulation calendar
//! - **models**: Domain types (Roster, Compartment, State, Event)
//! - **duration**: Incubation and illness duration models
//! - **transmission**: Per-meeting exposure draws
//! - **policy**: Testing and contact tracing policies
//! - **stats**: Daily statistics and experiment aggregation
//! - **orchestrator**: Main simulation loop and repeated experiments
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Every individual is in exactly one compartment
//! 2. All randomness is deterministic (seeded RNG, ordered collections)
//! 3. Repetitions are independent of the number of worker threads

// Module declarations
pub mod core;
pub mod duration;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod stats;
pub mod transmission;

// Re-exports for convenience
pub use core::calendar::SimulationClock;
pub use duration::{DurationModel, DurationModelConfig};
pub use models::{
    compartment::{Compartment, InfectionSource},
    event::{Event, EventLog},
    roster::{IndividualId, MeetingId, MeetingKind, Roster, RosterBuilder, RosterError},
    state::SimulationState,
};
pub use orchestrator::{
    DayResult, Experiment, InitialExposure, Interventions, ScenarioConfig, Simulation,
    SimulationConfig, SimulationError, SimulationParameters,
};
pub use policy::{ContactTracingConfig, TestingPolicyConfig};
pub use rng::RngManager;
pub use stats::{ExperimentSummary, RunOutcome};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn campus_seir_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PySimulation>()?;
    m.add_function(wrap_pyfunction!(ffi::orchestrator::run_experiment, m)?)?;
    Ok(())
}
