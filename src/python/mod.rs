use crate::{CropEnergyBalanceError, Params, Simulation};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pythonize::{depythonize, pythonize};

fn to_py_err(error: CropEnergyBalanceError) -> PyErr {
    match error {
        CropEnergyBalanceError::NotConverged { .. } => PyRuntimeError::new_err(error.to_string()),
        _ => PyValueError::new_err(error.to_string()),
    }
}

/// Solves the energy balance described by a dict with `inputs`, and optionally
/// `leaves_category`, `params` and `correct_stability`.
///
/// Returns the solver outputs as a dict.
#[pyfunction]
fn solve<'py>(py: Python<'py>, simulation: Bound<'py, PyAny>) -> PyResult<Bound<'py, PyAny>> {
    let simulation = depythonize::<Simulation>(&simulation)
        .map_err(|e| PyValueError::new_err(format!("{}", e)))?;
    let outputs = simulation.run().map_err(to_py_err)?;
    Ok(pythonize(py, &outputs)?)
}

/// Default parameters as a dict.
#[pyfunction]
fn default_params(py: Python<'_>) -> PyResult<Bound<'_, PyAny>> {
    Ok(pythonize(py, &Params::default())?)
}

#[pymodule]
#[pyo3(name = "_lib")]
fn crop_energy_balance(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(solve, m)?)?;
    m.add_function(wrap_pyfunction!(default_params, m)?)?;
    Ok(())
}
