use assert_cmd::Command;
use beamcal::{BatchConfig, CalibrationParams, CalibrationReport, DeviceIdentity, ScreenSize};
use predicates::prelude::*;

fn beamcal() -> Command {
    Command::cargo_bin("beamcal").expect("binary")
}

fn write_config(dir: &std::path::Path, clicks: Vec<[i32; 2]>) -> std::path::PathBuf {
    let cfg = BatchConfig {
        device: DeviceIdentity::new(7, "eBeam Projection"),
        screen: ScreenSize::new(1024, 768),
        zone: None,
        params: CalibrationParams::default(),
        clicks,
        state_path: None,
        report_path: None,
    };
    let path = dir.join("run.json");
    cfg.write_json(&path).expect("write config");
    path
}

#[test]
fn targets_lists_corners_in_click_order() {
    beamcal()
        .args(["targets", "--screen", "1024x768"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "upper-left 128 96\nlower-left 128 671\nupper-right 895 96\nlower-right 895 671\n",
        ));
}

#[test]
fn targets_respects_zone_and_blocks() {
    beamcal()
        .args([
            "targets", "--screen", "1024x1024", "--zone", "100", "100", "904", "904", "--blocks",
            "8",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("upper-left 200 200"))
        .stdout(predicate::str::contains("lower-right 804 804"));
}

#[test]
fn targets_rejects_bad_screen() {
    beamcal()
        .args(["targets", "--screen", "wide"])
        .assert()
        .failure();
}

#[test]
fn calibrate_then_show_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), vec![[128, 96], [128, 671], [895, 96], [895, 671]]);
    let state = dir.path().join("ebeam.state");
    let report = dir.path().join("report.json");

    beamcal()
        .arg("calibrate")
        .arg("--config")
        .arg(&config)
        .arg("--save")
        .arg(&state)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"driver_fields\""));

    let written = CalibrationReport::load_json(&report).expect("report");
    assert!(written.error.is_none());
    let h = written.homography.expect("homography");
    assert_eq!(h.h, [1_000_000_000_000, 0, 0, 0, 1_000_000_000_000, 0, 0, 0, 1_000_000_000_000]);

    let text = std::fs::read_to_string(&state).expect("state");
    assert_eq!(text.lines().count(), 14);

    beamcal()
        .arg("show")
        .arg("--state")
        .arg(&state)
        .args(["--screen", "1024x768"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"zoned\": false"));
}

#[test]
fn degenerate_run_fails_with_reason() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(
        dir.path(),
        vec![[100, 100], [200, 200], [300, 300], [400, 400]],
    );
    let state = dir.path().join("ebeam.state");

    beamcal()
        .arg("calibrate")
        .arg("--config")
        .arg(&config)
        .arg("--save")
        .arg(&state)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unable to compute H matrix"));
    assert!(!state.exists());
}

#[test]
fn show_reports_missing_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    beamcal()
        .arg("show")
        .arg("--state")
        .arg(dir.path().join("absent"))
        .args(["--screen", "800x600"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
#[cfg(not(feature = "tracing"))]
fn verbose_flag_enables_debug_logging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), vec![[128, 96], [128, 671], [895, 96], [895, 671]]);

    beamcal()
        .arg("-v")
        .arg("calibrate")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG session] adding click 1"));
}
