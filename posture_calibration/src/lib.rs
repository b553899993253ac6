//! # posture_calibration
//!
//! Guides a person into the stance a capture session expects: spine base
//! at a target distance from the sensor and at a target height relative to
//! it, held still long enough to count.
//!
//! ## Phases
//!
//! ```text
//!            in window                 > release ms in window
//!   Idle ───────────────▶ Holding ─────────────────────────▶ Calibrated
//!    ▲                       │                                    │
//!    └──── out of window ────┘◀───────── depth drift ─────────────┘
//! ```
//!
//! [`transition`] is the pure step function; [`CalibrationMonitor`] owns a
//! [`CalibrationState`] and a [`Clock`] and feeds it one frame at a time.

pub mod clock;
pub mod monitor;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{CalibrationMonitor, Evaluation};
pub use state::{
    drift_check, transition, AcceptanceWindow, CalibrationPhase, CalibrationState,
    CalibrationTargets, Correction, Guidance, HoldTimer, Measurement, Placement, Transition,
};
