//! Calibration math and session state for absolute pointing devices.
//!
//! The crate maps raw device samples onto a screen (or a screen zone) with a
//! projective transform expressed in the fixed-point form a kernel driver
//! evaluates with integer math only. It does not talk to hardware or to a
//! window system: callers feed clicks in and take a finalized
//! [`CalibrationSnapshot`] out.
//!
//! ```
//! use beamcal_core::{CalibrationParams, ClickOutcome, DeviceIdentity, ScreenSize, Session};
//!
//! let mut session = Session::new(
//!     DeviceIdentity::new(9, "eBeam Classic"),
//!     ScreenSize::new(1024, 768),
//!     None,
//!     CalibrationParams::default(),
//! )?;
//! let targets = *session.targets();
//! let mut outcome = None;
//! for t in targets {
//!     // A perfectly aligned device reports screen pixels.
//!     outcome = Some(session.add_click(t.x, t.y, t.x, t.y)?);
//! }
//! assert!(matches!(outcome, Some(ClickOutcome::Calibrated(_))));
//! # Ok::<(), beamcal_core::SessionError>(())
//! ```

mod correspondence;
mod fixed_point;
mod homography;
mod logger;
mod params;
mod replay;
mod session;
mod snapshot;
mod state_file;
mod zone;

pub use correspondence::{Correspondence, CorrespondenceSet, NUM_POINTS};
pub use fixed_point::{
    div_trunc, driver_round_div, quantize, scale_factor, to_real, QuantizeError,
    DEFAULT_PRECISION, RECOMMENDED_PRECISION,
};
pub use homography::{solve_fixed_point, solve_homography, Homography, HomographyMatrix, SolveError};
pub use params::{CalibrationParams, ParamsError, DEFAULT_DOUBLE_CLICK_THRESHOLD};
pub use replay::{replay_point, validate, ReplayError, Replayed};
pub use session::{
    ClickOutcome, DeviceIdentity, FinishError, Session, SessionError, SessionState,
};
pub use snapshot::{CalibrationSnapshot, DRIVER_FIELDS};
pub use state_file::{
    decode_state, encode_state, load_state, save_state, StateFileError, StoredState,
    STATE_TOKENS, STATE_VERSION,
};
pub use zone::{
    transform_matrix_identity, Corner, ScreenSize, Zone, ZoneError, DEFAULT_GRID_BLOCKS,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
