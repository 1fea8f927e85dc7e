//! Plain-text calibration state files.
//!
//! One token per line: version tag, `min_x`, `max_x`, `min_y`, `max_y`, then
//! `h1..h9` as decimal integers.

use crate::homography::HomographyMatrix;
use crate::snapshot::CalibrationSnapshot;
use crate::zone::{ScreenSize, Zone};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::{fs, io};

/// Version tag written by this build.
pub const STATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of lines in a state file.
pub const STATE_TOKENS: usize = 14;

const FIELD_NAMES: [&str; STATE_TOKENS] = [
    "version", "min_x", "max_x", "min_y", "max_y", "h1", "h2", "h3", "h4", "h5", "h6", "h7", "h8",
    "h9",
];

#[derive(thiserror::Error, Debug)]
pub enum StateFileError {
    #[error("no calibration data to save")]
    NoData,
    #[error("bad state file: line {line} ({field}): {reason}")]
    MalformedState {
        line: usize,
        field: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A decoded state file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredState {
    /// Tag found on the first line.
    pub version: String,
    pub snapshot: CalibrationSnapshot,
}

impl StoredState {
    /// True when the file was written by a different version.
    pub fn version_mismatch(&self) -> bool {
        self.version != STATE_VERSION
    }
}

/// Encode a snapshot under the given version tag.
pub fn encode_state(version: &str, snapshot: &CalibrationSnapshot) -> String {
    let z = &snapshot.zone;
    let mut out = String::with_capacity(STATE_TOKENS * 16);
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{version}");
    let _ = writeln!(out, "{}\n{}\n{}\n{}", z.min_x, z.max_x, z.min_y, z.max_y);
    for h in snapshot.homography.h {
        let _ = writeln!(out, "{h}");
    }
    out
}

fn malformed(line: usize, reason: impl Into<String>) -> StateFileError {
    StateFileError::MalformedState {
        line,
        field: FIELD_NAMES[line - 1],
        reason: reason.into(),
    }
}

fn next_token<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<&'a str, StateFileError> {
    match lines.next() {
        Some(tok) if !tok.is_empty() => Ok(tok),
        Some(_) => Err(malformed(line, "empty line")),
        None => Err(malformed(line, "missing")),
    }
}

/// Decode state text. `zoned` is re-derived against `screen`.
pub fn decode_state(text: &str, screen: ScreenSize) -> Result<StoredState, StateFileError> {
    let mut lines = text.lines().map(str::trim);
    let mut next = |line: usize| next_token(&mut lines, line);

    let version = next(1)?;
    if version.split_whitespace().count() != 1 {
        return Err(malformed(1, format!("invalid version tag '{version}'")));
    }
    let version = version.to_owned();

    let mut bounds = [0_i32; 4];
    for (i, slot) in bounds.iter_mut().enumerate() {
        let line = i + 2;
        let tok = next(line)?;
        *slot = tok
            .parse()
            .map_err(|e| malformed(line, format!("'{tok}': {e}")))?;
    }

    let mut h = [0_i64; 9];
    for (i, slot) in h.iter_mut().enumerate() {
        let line = i + 6;
        let tok = next(line)?;
        *slot = tok
            .parse()
            .map_err(|e| malformed(line, format!("'{tok}': {e}")))?;
    }

    let [min_x, max_x, min_y, max_y] = bounds;
    let zone = Zone::from_bounds(min_x, min_y, max_x, max_y, screen)
        .map_err(|e| malformed(2, e.to_string()))?;

    Ok(StoredState {
        version,
        snapshot: CalibrationSnapshot::new(zone, HomographyMatrix::new(h)),
    })
}

/// Atomically write `snapshot` to `path`.
///
/// The text is encoded first, written to a temporary file next to `path` and
/// renamed over it, so a failed save never leaves a truncated file behind.
pub fn save_state(
    path: impl AsRef<Path>,
    snapshot: Option<&CalibrationSnapshot>,
) -> Result<(), StateFileError> {
    let snapshot = snapshot.ok_or(StateFileError::NoData)?;
    let path = path.as_ref();
    let text = encode_state(STATE_VERSION, snapshot);

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    log::debug!("calibration data saved to {}", path.display());
    Ok(())
}

/// Read a state file. A version tag different from [`STATE_VERSION`] is
/// logged as a warning; the numeric fields are used regardless.
pub fn load_state(path: impl AsRef<Path>, screen: ScreenSize) -> Result<StoredState, StateFileError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let state = decode_state(&text, screen)?;

    if state.version_mismatch() {
        log::warn!(
            "version mismatch: state file is {}, application is {STATE_VERSION}; proceeding anyway",
            state.version
        );
    }
    let z = &state.snapshot.zone;
    if z.zoned {
        log::debug!(
            "active zone: {} {} {} {}",
            z.min_x,
            z.min_y,
            z.max_x,
            z.max_y
        );
    } else {
        log::debug!("active zone: full screen");
    }
    log::debug!("calibration data restored from {}", path.display());
    Ok(state)
}
