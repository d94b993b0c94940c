//! Conversions between Rust results and Python objects

use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::orchestrator::{DayResult, SimulationError};
use crate::stats::CompartmentCounts;

/// Map a simulation error to a Python exception
///
/// Configuration problems raise ValueError, everything else RuntimeError.
pub fn to_py_err(error: SimulationError) -> PyErr {
    match error {
        SimulationError::InvalidConfig(_)
        | SimulationError::EmptyInitialExposure
        | SimulationError::InitialExposureTooLarge { .. }
        | SimulationError::UnknownIndividual(_)
        | SimulationError::Roster(_) => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(error.to_string())
        }
        SimulationError::Finished | SimulationError::Invariant(_) => {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(error.to_string())
        }
    }
}

/// Convert a day's result to a dict
pub fn day_result_to_py(py: Python, result: &DayResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("date", result.date.to_string())?;
    dict.set_item("new_exposures", result.new_exposures)?;
    dict.set_item("new_infectious", result.new_infectious)?;
    dict.set_item("new_removals", result.new_removals)?;
    dict.set_item("new_quarantines", result.new_quarantines)?;
    dict.set_item("positive_results", result.positive_results)?;
    Ok(dict.unbind())
}

/// Convert compartment counts to a dict keyed by compartment label
pub fn counts_to_py(py: Python, counts: &CompartmentCounts) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("S", counts.susceptible)?;
    dict.set_item("E", counts.exposed)?;
    dict.set_item("Ia", counts.infectious_asymptomatic)?;
    dict.set_item("Is", counts.infectious_symptomatic)?;
    dict.set_item("Q", counts.quarantined_susceptible)?;
    dict.set_item("Qe", counts.quarantined_exposed)?;
    dict.set_item("Qa", counts.quarantined_asymptomatic)?;
    dict.set_item("Qs", counts.quarantined_symptomatic)?;
    dict.set_item("R", counts.removed)?;
    dict.set_item("vaccinated", counts.vaccinated)?;
    Ok(dict.unbind())
}
