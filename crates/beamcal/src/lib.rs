//! Batch calibration for eBeam-style absolute pointing devices.
//!
//! This crate wraps [`beamcal_core`] with a JSON config and report layer and
//! the `beamcal` command-line tool (behind the `cli` feature).
//!
//! ```no_run
//! use beamcal::{run_batch, BatchConfig};
//!
//! let cfg = BatchConfig::load_json("run.json")?;
//! let report = run_batch(&cfg)?;
//! if let Some(err) = &report.error {
//!     eprintln!("calibration failed: {err}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use beamcal_core as core;

pub mod batch;
pub mod io;

pub use batch::{run_batch, BatchError};
pub use io::{BatchConfig, BatchIoError, CalibrationReport, DriverField};

pub use beamcal_core::{
    CalibrationParams, CalibrationSnapshot, DeviceIdentity, HomographyMatrix, ScreenSize,
    Session, Zone,
};
