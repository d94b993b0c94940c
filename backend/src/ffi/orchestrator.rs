//! PyO3 wrapper for the simulation engine
//!
//! Scenarios cross the boundary as JSON strings in the same format the CLI
//! reads, so Python and the CLI share one configuration schema.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{counts_to_py, day_result_to_py, to_py_err};
use crate::orchestrator::{Experiment, ScenarioConfig, Simulation as RustSimulation};
use crate::stats::CompartmentCounts;

/// Python wrapper for one simulation run
///
/// # Example (from Python)
///
/// ```python
/// from campus_seir._core import Simulation
///
/// sim = Simulation(open("scenario.json").read(), seed=42)
/// while not sim.is_finished():
///     day = sim.step()
/// print(sim.counts(), sim.sources())
/// ```
#[pyclass(name = "Simulation")]
pub struct PySimulation {
    inner: RustSimulation,
}

#[pymethods]
impl PySimulation {
    /// Create a run from a scenario JSON string
    ///
    /// Raises ValueError on an invalid scenario.
    #[new]
    fn new(scenario_json: &str, seed: u64) -> PyResult<Self> {
        let scenario = ScenarioConfig::from_json(scenario_json).map_err(to_py_err)?;
        let inner = RustSimulation::from_scenario(&scenario, seed).map_err(to_py_err)?;
        Ok(PySimulation { inner })
    }

    /// Simulate one day; returns the day's transition counts
    fn step(&mut self, py: Python) -> PyResult<Py<PyDict>> {
        let result = self.inner.step().map_err(to_py_err)?;
        day_result_to_py(py, &result)
    }

    /// Simulate until the end date
    fn run(&mut self) -> PyResult<()> {
        self.inner.run().map_err(to_py_err)
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// ISO date of the next step
    fn date(&self) -> String {
        self.inner.date().to_string()
    }

    /// Current size of every compartment
    fn counts(&self, py: Python) -> PyResult<Py<PyDict>> {
        counts_to_py(py, &CompartmentCounts::from_state(self.inner.state()))
    }

    /// Infections so far, by source label
    fn sources(&self, py: Python) -> PyResult<Py<PyDict>> {
        let dict = PyDict::new_bound(py);
        for (label, count) in self.inner.statistics().source_totals() {
            dict.set_item(label, count)?;
        }
        Ok(dict.unbind())
    }

    /// Daily snapshots as a JSON string
    fn history_json(&self) -> PyResult<String> {
        serde_json::to_string(self.inner.statistics().snapshots()).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Failed to serialize history: {}",
                e
            ))
        })
    }
}

/// Run every repetition of a scenario; returns the summary as JSON
#[pyfunction]
#[pyo3(signature = (scenario_json, repetitions=None, seed=0, threads=1))]
pub fn run_experiment(
    py: Python,
    scenario_json: &str,
    repetitions: Option<usize>,
    seed: u64,
    threads: usize,
) -> PyResult<String> {
    let scenario = ScenarioConfig::from_json(scenario_json).map_err(to_py_err)?;
    let mut experiment = Experiment::from_scenario(&scenario, seed)
        .map_err(to_py_err)?
        .with_threads(threads);
    if let Some(repetitions) = repetitions {
        experiment = experiment.with_repetitions(repetitions);
    }
    let summary = py.allow_threads(move || experiment.run()).map_err(to_py_err)?;
    serde_json::to_string(&summary).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
            "Failed to serialize summary: {}",
            e
        ))
    })
}
