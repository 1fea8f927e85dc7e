//! Drive a calibration session from recorded clicks.

use crate::io::{BatchConfig, CalibrationReport};
use beamcal_core::{
    ClickOutcome, Session, SessionError, StateFileError, NUM_POINTS, STATE_VERSION,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("invalid session setup: {0}")]
    Setup(#[source] SessionError),
    #[error("only {accepted} of 4 clicks accepted; {supplied} supplied")]
    NotEnoughClicks { accepted: usize, supplied: usize },
    #[error("failed to save state: {0}")]
    SaveState(#[from] StateFileError),
}

/// Feed `cfg.clicks` into a fresh session, one per target.
///
/// Duplicate clicks are skipped and listed in the report. A solve or replay
/// failure is recorded in [`CalibrationReport::error`] rather than returned,
/// so callers still see the collected points. On success the state file is
/// written when `cfg.state_path` is set.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(cfg), fields(device = %cfg.device.name, clicks = cfg.clicks.len())))]
pub fn run_batch(cfg: &BatchConfig) -> Result<CalibrationReport, BatchError> {
    let mut session = Session::new(cfg.device.clone(), cfg.screen, cfg.zone, cfg.params)
        .map_err(BatchError::Setup)?;

    let mut skipped = Vec::new();
    let mut failure = None;
    let mut finished = false;

    for (i, &[x, y]) in cfg.clicks.iter().enumerate() {
        if finished {
            log::warn!(
                "ignoring {} click(s) after the last target",
                cfg.clicks.len() - i
            );
            break;
        }
        match session.add_click_at_target(x, y) {
            Ok(ClickOutcome::Accepted { count }) => {
                log::info!("click {count}/{NUM_POINTS} accepted: raw({x}, {y})");
            }
            Ok(ClickOutcome::Calibrated(_)) => {
                log::info!("click {NUM_POINTS}/{NUM_POINTS} accepted: raw({x}, {y})");
                finished = true;
            }
            Err(err) if err.is_recoverable() => {
                log::warn!("skipping click raw({x}, {y}): {err}");
                skipped.push([x, y]);
            }
            Err(err) => {
                failure = Some(err);
                finished = true;
            }
        }
    }

    if !finished {
        return Err(BatchError::NotEnoughClicks {
            accepted: session.count(),
            supplied: cfg.clicks.len(),
        });
    }

    let mut report = CalibrationReport::for_session(&session);
    report.skipped_clicks = skipped;

    if let Some(err) = failure {
        report.set_error(err);
        return Ok(report);
    }

    if let Some(path) = cfg.state_path() {
        session.save_state(&path)?;
        log::info!("saved calibration state to {}", path.display());
        report.state_version = Some(STATE_VERSION.to_owned());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamcal_core::{load_state, CalibrationParams, DeviceIdentity, ScreenSize};

    fn config(clicks: Vec<[i32; 2]>) -> BatchConfig {
        BatchConfig {
            device: DeviceIdentity::new(3, "eBeam Edge"),
            screen: ScreenSize::new(1024, 768),
            zone: None,
            params: CalibrationParams::default(),
            clicks,
            state_path: None,
            report_path: None,
        }
    }

    #[test]
    fn duplicates_are_skipped_and_run_completes() {
        let cfg = config(vec![
            [128, 96],
            [130, 98],
            [128, 671],
            [895, 96],
            [895, 671],
            [500, 500],
        ]);
        let report = run_batch(&cfg).expect("batch");
        assert!(report.error.is_none(), "{:?}", report.error);
        assert_eq!(report.skipped_clicks, vec![[130, 98]]);
        assert_eq!(report.correspondences.len(), 4);
        let h = report.homography.expect("homography");
        assert_eq!(h.h[0], h.h[8]);
        assert_eq!(h.h[4], h.h[8]);
    }

    #[test]
    fn too_few_clicks_is_an_error() {
        let err = run_batch(&config(vec![[10, 10], [10, 3000]])).expect_err("short");
        assert!(matches!(
            err,
            BatchError::NotEnoughClicks {
                accepted: 2,
                supplied: 2
            }
        ));
    }

    #[test]
    fn degenerate_clicks_land_in_report_error() {
        let report = run_batch(&config(vec![[100, 100], [200, 200], [300, 300], [400, 400]]))
            .expect("report");
        let msg = report.error.expect("error");
        assert!(msg.contains("unable to compute H matrix"), "{msg}");
        assert!(report.homography.is_none());
        assert!(report.driver_fields.is_empty());
    }

    #[test]
    fn state_is_written_on_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("calib.state");
        let mut cfg = config(vec![[128, 96], [128, 671], [895, 96], [895, 671]]);
        cfg.state_path = Some(path.to_string_lossy().into_owned());

        let report = run_batch(&cfg).expect("batch");
        assert_eq!(report.state_version.as_deref(), Some(STATE_VERSION));
        let stored = load_state(&path, cfg.screen).expect("load");
        assert_eq!(Some(stored.snapshot.homography), report.homography);
    }
}
