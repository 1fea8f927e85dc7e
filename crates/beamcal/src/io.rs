//! JSON configuration and report helpers for batch calibration.

use beamcal_core::{
    CalibrationParams, CalibrationSnapshot, Correspondence, DeviceIdentity, HomographyMatrix,
    ScreenSize, Session, Zone,
};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum BatchIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Recorded input for a non-interactive calibration run.
///
/// `clicks` are raw device samples, one per target, in the order upper-left,
/// lower-left, upper-right, lower-right. Extra samples stand in for the
/// re-prompts an interactive surface would issue after a duplicate click.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub device: DeviceIdentity,
    pub screen: ScreenSize,
    /// `[min_x, min_y, max_x, max_y]`; omitted or all zeros means full screen.
    #[serde(default)]
    pub zone: Option<[i32; 4]>,
    #[serde(default)]
    pub params: CalibrationParams,
    pub clicks: Vec<[i32; 2]>,
    #[serde(default)]
    pub state_path: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
}

impl BatchConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BatchIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), BatchIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the state file path, if the run should persist its result.
    pub fn state_path(&self) -> Option<PathBuf> {
        self.state_path.as_ref().map(PathBuf::from)
    }

    /// Resolve the report path, if the report should be written to disk.
    pub fn report_path(&self) -> Option<PathBuf> {
        self.report_path.as_ref().map(PathBuf::from)
    }
}

/// One named driver parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverField {
    pub name: String,
    pub value: i64,
}

fn matrix_rows<T: nalgebra::Scalar + Copy>(m: &Matrix3<T>) -> [[T; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

/// Everything a run produced, ready for transfer to driver and window system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    #[serde(default)]
    pub device: Option<DeviceIdentity>,
    pub screen: ScreenSize,
    pub zone: Zone,
    #[serde(default)]
    pub targets: Vec<[i32; 2]>,
    #[serde(default)]
    pub correspondences: Vec<Correspondence>,
    #[serde(default)]
    pub skipped_clicks: Vec<[i32; 2]>,
    #[serde(default)]
    pub homography: Option<HomographyMatrix>,
    #[serde(default)]
    pub homography_real: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub driver_fields: Vec<DriverField>,
    #[serde(default)]
    pub axis_calibration: Option<[i32; 4]>,
    pub transform_matrix: [[f32; 3]; 3],
    #[serde(default)]
    pub state_version: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CalibrationReport {
    /// Base report describing a session's geometry and collected points.
    pub fn for_session(session: &Session) -> Self {
        let mut report = Self {
            device: Some(session.device().clone()),
            screen: session.screen(),
            zone: *session.zone(),
            targets: session.targets().iter().map(|t| [t.x, t.y]).collect(),
            correspondences: session.correspondences().to_vec(),
            skipped_clicks: Vec::new(),
            homography: None,
            homography_real: None,
            driver_fields: Vec::new(),
            axis_calibration: None,
            transform_matrix: matrix_rows(&session.zone().transform_matrix(session.screen())),
            state_version: None,
            error: None,
        };
        if let Some(snapshot) = session.snapshot() {
            report.set_snapshot(&snapshot, session.screen());
        }
        report
    }

    /// Report for a snapshot read back from a state file.
    pub fn for_snapshot(snapshot: &CalibrationSnapshot, screen: ScreenSize, version: &str) -> Self {
        let mut report = Self {
            device: None,
            screen,
            zone: snapshot.zone,
            targets: Vec::new(),
            correspondences: Vec::new(),
            skipped_clicks: Vec::new(),
            homography: None,
            homography_real: None,
            driver_fields: Vec::new(),
            axis_calibration: None,
            transform_matrix: matrix_rows(&snapshot.transform_matrix(screen)),
            state_version: Some(version.to_owned()),
            error: None,
        };
        report.set_snapshot(snapshot, screen);
        report
    }

    /// Populate the calibration fields.
    pub fn set_snapshot(&mut self, snapshot: &CalibrationSnapshot, screen: ScreenSize) {
        self.zone = snapshot.zone;
        self.homography = Some(snapshot.homography);
        self.homography_real = snapshot.homography.to_real().map(|h| h.to_array());
        self.driver_fields = snapshot
            .driver_fields()
            .iter()
            .map(|(name, value)| DriverField {
                name: (*name).to_owned(),
                value: *value,
            })
            .collect();
        self.axis_calibration = Some(snapshot.axis_calibration());
        self.transform_matrix = matrix_rows(&snapshot.transform_matrix(screen));
        self.error = None;
    }

    /// Record a failure.
    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BatchIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), BatchIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
