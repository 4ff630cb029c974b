//! Python bindings for the normalization and compositing routines

use crate::core::normalize::{ClipPreset, ClipRange};
use numpy::{IntoPyArray, PyArray1, PyArray3, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

/// Normalize a 1-D band to bytes; bounds default to the 3rd/97th percentiles
#[pyfunction]
#[pyo3(signature = (band, vmin=None, vmax=None))]
fn normalize<'py>(
    py: Python<'py>,
    band: PyReadonlyArray1<'py, f64>,
    vmin: Option<f64>,
    vmax: Option<f64>,
) -> &'py PyArray1<u8> {
    crate::core::normalize::normalize(&band.as_array(), vmin, vmax).into_pyarray(py)
}

/// Build the `[rows, cols, 4]` browse composite; omitted ranges use the
/// standard preset
#[pyfunction]
#[pyo3(signature = (co_pol, cross_pol, co_pol_range=None, cross_pol_range=None))]
fn composite<'py>(
    py: Python<'py>,
    co_pol: PyReadonlyArray2<'py, f32>,
    cross_pol: PyReadonlyArray2<'py, f32>,
    co_pol_range: Option<(f64, f64)>,
    cross_pol_range: Option<(f64, f64)>,
) -> PyResult<&'py PyArray3<u8>> {
    let mut ranges = ClipPreset::Standard.ranges();
    if let Some((vmin, vmax)) = co_pol_range {
        ranges.co_pol = ClipRange::new(vmin, vmax);
    }
    if let Some((vmin, vmax)) = cross_pol_range {
        ranges.cross_pol = ClipRange::new(vmin, vmax);
    }
    let browse =
        crate::core::composite::composite(co_pol.as_array(), cross_pol.as_array(), &ranges)
                .map_err(|e| {
                PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
            })?;
    Ok(browse.into_pyarray(py))
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize, m)?)?;
    m.add_function(wrap_pyfunction!(composite, m)?)?;
    Ok(())
}
