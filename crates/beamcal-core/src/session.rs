//! Calibration run state machine.
//!
//! A [`Session`] collects four device/screen correspondences, then solves,
//! quantizes and replays the homography. Only a matrix that survives the
//! driver's integer replay becomes the session's calibration.

use crate::correspondence::{Correspondence, CorrespondenceSet, NUM_POINTS};
use crate::homography::{solve_fixed_point, HomographyMatrix, SolveError};
use crate::params::{CalibrationParams, ParamsError};
use crate::replay::{validate, ReplayError};
use crate::snapshot::CalibrationSnapshot;
use crate::state_file::{save_state, StateFileError};
use crate::zone::{ScreenSize, Zone, ZoneError};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Which input device a session calibrates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub id: u64,
    pub name: String,
}

impl DeviceIdentity {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Why a run could not produce a calibration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FinishError {
    #[error("not enough points: {0} of 4")]
    IncompletePoints(usize),
    #[error("unable to compute H matrix: {0}")]
    Solve(#[from] SolveError),
    #[error("unreliable H matrix: {0}")]
    Replay(#[from] ReplayError),
}

/// Errors returned by session operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(
        "click raw({dev_x}, {dev_y}) within {threshold} units of accepted click {previous}"
    )]
    DuplicateClick {
        dev_x: i32,
        dev_y: i32,
        threshold: u32,
        previous: usize,
    },
    #[error("session is not collecting clicks")]
    NotCollecting,
    #[error(transparent)]
    Finish(#[from] FinishError),
    #[error(transparent)]
    Zone(#[from] ZoneError),
    #[error(transparent)]
    Params(#[from] ParamsError),
}

impl SessionError {
    /// Recoverable errors only require the caller to prompt for another click.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::DuplicateClick { .. })
    }
}

/// Observable session state.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Collecting { count: usize },
    Validated,
    Rejected { reason: FinishError },
}

/// Result of an accepted click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Stored; more clicks are needed.
    Accepted { count: usize },
    /// Fourth click stored and the calibration validated.
    Calibrated(CalibrationSnapshot),
}

/// One calibration run for one device.
#[derive(Clone, Debug)]
pub struct Session {
    device: DeviceIdentity,
    params: CalibrationParams,
    screen: ScreenSize,
    zone: Zone,
    targets: [Point2<i32>; 4],
    points: CorrespondenceSet,
    state: SessionState,
    homography: Option<HomographyMatrix>,
}

impl Session {
    /// Create a session. `bounds` are `[min_x, min_y, max_x, max_y]`; `None`
    /// or all zeros select the full screen.
    pub fn new(
        device: DeviceIdentity,
        screen: ScreenSize,
        bounds: Option<[i32; 4]>,
        params: CalibrationParams,
    ) -> Result<Self, SessionError> {
        params.validate()?;
        let zone = Zone::resolve(bounds, screen)?;
        log::debug!(
            "session for '{}' id={}: screen {}x{}, zone {} {} {} {} (zoned={})",
            device.name,
            device.id,
            screen.width,
            screen.height,
            zone.min_x,
            zone.min_y,
            zone.max_x,
            zone.max_y,
            zone.zoned
        );
        Ok(Self {
            device,
            params,
            screen,
            targets: zone.targets(params.grid_blocks),
            zone,
            points: CorrespondenceSet::new(),
            state: SessionState::Collecting { count: 0 },
            homography: None,
        })
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Number of accepted clicks.
    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn correspondences(&self) -> &[Correspondence] {
        self.points.as_slice()
    }

    /// Screen targets in click order (upper-left, lower-left, upper-right,
    /// lower-right).
    pub fn targets(&self) -> &[Point2<i32>; 4] {
        &self.targets
    }

    /// Target the next click should hit, while collecting.
    pub fn next_target(&self) -> Option<Point2<i32>> {
        match self.state {
            SessionState::Collecting { count } => self.targets.get(count).copied(),
            _ => None,
        }
    }

    /// The validated matrix, if any.
    pub fn homography(&self) -> Option<&HomographyMatrix> {
        match self.state {
            SessionState::Validated => self.homography.as_ref(),
            _ => None,
        }
    }

    /// The finalized `{zone, H}` pair once the run validated.
    pub fn snapshot(&self) -> Option<CalibrationSnapshot> {
        self.homography()
            .map(|h| CalibrationSnapshot::new(self.zone, *h))
    }

    /// Record a click. The fourth accepted click runs [`Session::finish`].
    ///
    /// A click within the double-click threshold of any accepted click is
    /// refused with [`SessionError::DuplicateClick`] and leaves the session
    /// untouched.
    pub fn add_click(
        &mut self,
        dev_x: i32,
        dev_y: i32,
        scr_x: i32,
        scr_y: i32,
    ) -> Result<ClickOutcome, SessionError> {
        let SessionState::Collecting { count } = self.state else {
            return Err(SessionError::NotCollecting);
        };

        let threshold = self.params.double_click_threshold;
        if threshold > 0 {
            if let Some(previous) = self
                .points
                .as_slice()
                .iter()
                .position(|p| p.is_near(dev_x, dev_y, threshold))
            {
                log::warn!(
                    "not adding click {} raw({dev_x}, {dev_y}): within {threshold} units of previous click",
                    count + 1
                );
                return Err(SessionError::DuplicateClick {
                    dev_x,
                    dev_y,
                    threshold,
                    previous: previous + 1,
                });
            }
        }

        if !self
            .points
            .push(Correspondence::new(dev_x, dev_y, scr_x, scr_y))
        {
            return Err(SessionError::NotCollecting);
        }
        let count = self.points.len();
        self.state = SessionState::Collecting { count };
        log::debug!("adding click {count}: raw({dev_x}, {dev_y}) <=> screen({scr_x}, {scr_y})");

        if count < NUM_POINTS {
            return Ok(ClickOutcome::Accepted { count });
        }
        Ok(ClickOutcome::Calibrated(self.finish()?))
    }

    /// Record a click aimed at [`Session::next_target`].
    pub fn add_click_at_target(
        &mut self,
        dev_x: i32,
        dev_y: i32,
    ) -> Result<ClickOutcome, SessionError> {
        let target = self.next_target().ok_or(SessionError::NotCollecting)?;
        self.add_click(dev_x, dev_y, target.x, target.y)
    }

    /// Solve, quantize and replay the collected points.
    ///
    /// Any failure moves the session to `Rejected`, keeping the reason; it
    /// stays there until [`Session::reset`] or a geometry change.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self), fields(device = %self.device.name)))]
    pub fn finish(&mut self) -> Result<CalibrationSnapshot, FinishError> {
        match &self.state {
            SessionState::Validated => {
                if let Some(snapshot) = self.snapshot() {
                    return Ok(snapshot);
                }
            }
            SessionState::Rejected { reason } => return Err(reason.clone()),
            SessionState::Collecting { .. } => {}
        }

        let Some(points) = self.points.as_array() else {
            return Err(FinishError::IncompletePoints(self.points.len()));
        };

        let result = solve_fixed_point(points, self.params.precision)
            .map_err(FinishError::from)
            .and_then(|h| {
                validate(&h, points)?;
                Ok(h)
            });

        match result {
            Ok(h) => {
                self.homography = Some(h);
                self.state = SessionState::Validated;
                log::info!("calibration of '{}' validated", self.device.name);
                Ok(CalibrationSnapshot::new(self.zone, h))
            }
            Err(reason) => {
                log::error!("calibration of '{}' rejected: {reason}", self.device.name);
                self.homography = None;
                self.state = SessionState::Rejected {
                    reason: reason.clone(),
                };
                Err(reason)
            }
        }
    }

    /// Drop every click and any result, keeping the geometry.
    pub fn reset(&mut self) {
        self.points.clear();
        self.homography = None;
        self.state = SessionState::Collecting { count: 0 };
    }

    /// Apply new screen geometry and zone bounds.
    ///
    /// Targets are recomputed and collected clicks discarded, since they no
    /// longer match the target positions.
    pub fn set_geometry(
        &mut self,
        screen: ScreenSize,
        bounds: Option<[i32; 4]>,
    ) -> Result<(), ZoneError> {
        let zone = Zone::resolve(bounds, screen)?;
        self.screen = screen;
        self.set_zone(zone);
        Ok(())
    }

    /// Replace the zone, recomputing targets and discarding clicks.
    pub fn set_zone(&mut self, zone: Zone) {
        self.zone = zone;
        self.targets = zone.targets(self.params.grid_blocks);
        log::debug!(
            "zone {} {} {} {}: targets {:?}",
            zone.min_x,
            zone.min_y,
            zone.max_x,
            zone.max_y,
            self.targets.map(|p| (p.x, p.y))
        );
        self.reset();
    }

    /// Persist the validated calibration to `path`.
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), StateFileError> {
        save_state(path, self.snapshot().as_ref())
    }
}
