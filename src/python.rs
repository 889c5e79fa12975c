//! Python bindings for driving a counting session

use crate::error::CountError;
use crate::output::to_dataframe;
use crate::session::Session;
use crate::types::SessionConfig;
use pyo3::exceptions::{PyFileNotFoundError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;
use std::collections::BTreeMap;
use std::path::PathBuf;

// --- Error Conversion for PyO3 ---
impl From<CountError> for PyErr {
    fn from(err: CountError) -> PyErr {
        match err {
            CountError::Open { .. } => PyFileNotFoundError::new_err(err.to_string()),
            CountError::InvalidSetting { .. } | CountError::Config(_) => {
                PyValueError::new_err(err.to_string())
            }
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

fn non_negative(name: &str, value: i64) -> PyResult<u64> {
    u64::try_from(value)
        .map_err(|_| PyValueError::new_err(format!("{} must be non-negative, got {}", name, value)))
}

/// Counts channel coincidence patterns in SPC files.
///
/// Usage:
///     counter = CoincidenceCounter(window=5)
///     counter.open_counted_file("run.counted")
///     counter.zero_rates()
///     counter.process_spc("run.spc")
///     rates = counter.stop_integrating(write_to_disk=True)
///     counter.close_counted_file()
#[pyclass(name = "CoincidenceCounter")]
pub struct PyCoincidenceCounter {
    session: Session,
}

#[pymethods]
impl PyCoincidenceCounter {
    #[new]
    #[pyo3(signature = (window = 0, time_cutoff_ms = None))]
    fn new(window: i64, time_cutoff_ms: Option<i64>) -> PyResult<Self> {
        let time_cutoff_ms = time_cutoff_ms
            .map(|ms| non_negative("time_cutoff_ms", ms))
            .transpose()?;
        let config = SessionConfig::builder()
            .window(non_negative("window", window)?)
            .maybe_time_cutoff_ms(time_cutoff_ms)
            .build();
        Ok(Self {
            session: Session::new(config)?,
        })
    }

    /// Build a counter from a JSON configuration file
    #[staticmethod]
    fn from_config(path: PathBuf) -> PyResult<Self> {
        let config = SessionConfig::from_json_file(&path)
            .map_err(|e| PyValueError::new_err(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            session: Session::new(config)?,
        })
    }

    #[getter]
    fn window(&self) -> u64 {
        self.session.window()
    }

    #[getter]
    fn time_cutoff(&self) -> Option<u64> {
        self.session.time_cutoff()
    }

    fn set_window(&mut self, window: i64) -> PyResult<()> {
        self.session.configure_window(non_negative("window", window)?);
        Ok(())
    }

    fn set_time_cutoff_ms(&mut self, milliseconds: i64) -> PyResult<()> {
        self.session
            .configure_time_cutoff(non_negative("milliseconds", milliseconds)?);
        Ok(())
    }

    /// Prepare for new data
    fn zero_rates(&mut self) {
        self.session.begin_session();
    }

    fn open_counted_file(&mut self, path: PathBuf) -> PyResult<()> {
        Ok(self.session.open_output(path)?)
    }

    /// Count one SPC file, returning the run statistics as a dict
    fn process_spc(&mut self, path: PathBuf) -> PyResult<BTreeMap<&'static str, u64>> {
        let stats = self.session.process(path)?;
        Ok(BTreeMap::from([
            ("chunks", stats.chunks),
            ("records", stats.records),
            ("pulses", stats.pulses),
            ("markers", stats.markers),
            ("fifo_gaps", stats.fifo_gaps),
            ("groups", stats.groups),
            ("dropped_after_cutoff", stats.dropped_after_cutoff),
            ("stopped_early", stats.stopped_early as u64),
        ]))
    }

    /// Finish the integration and return the nonzero patterns as a DataFrame
    #[pyo3(signature = (write_to_disk = false))]
    fn stop_integrating(&mut self, write_to_disk: bool) -> PyResult<PyDataFrame> {
        let index = self.session.end_session(write_to_disk)?;
        let df = to_dataframe(index).map_err(CountError::from)?;
        Ok(PyDataFrame(df))
    }

    /// Nonzero pattern counts of the last finished integration
    fn count_rates(&self) -> BTreeMap<u16, u64> {
        self.session
            .sparse_index()
            .map(|index| index.iter().map(|e| (e.pattern.bits(), e.count)).collect())
            .unwrap_or_default()
    }

    fn close_counted_file(&mut self) -> PyResult<()> {
        Ok(self.session.close_output()?)
    }
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn coincount(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    m.add_class::<PyCoincidenceCounter>()?;
    Ok(())
}
