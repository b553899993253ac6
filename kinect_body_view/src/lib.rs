//! # kinect_body_view
//!
//! Live skeletal overlay for a body-tracking sensor feed, with a posture
//! calibration assistant that guides the subject to an optimal distance and
//! height and then asks them to hold still.
//!
//! Each sensor frame flows through the [`orchestrator::FrameOrchestrator`]:
//! tracked bodies are projected into depth-image space, drawn with a
//! per-slot colour, and the reference body is checked against the
//! calibration targets.  The result is a [`skeleton_draw::Scene`] that the
//! [`viewer::Viewer`] rasterises into a `minifb` window.
//!
//! ## Calibration
//!
//! | Situation | Guidance | Overlay |
//! |---|---|---|
//! | Spine base too far | Move closer | pose scaled to optimal depth |
//! | Spine base too near | Move away | pose scaled to optimal depth |
//! | Spine base too high | Move the sensor down | pose scaled to optimal height |
//! | Spine base too low | Move the sensor up | pose scaled to optimal height |
//! | Inside both windows, under 3 s | Hold still | none |
//! | Held 3 s to 7 s | You may begin | none |
//! | Held past 7 s | none; calibrated | none |
//!
//! Once calibrated, any tracked body leaving the depth window resets the
//! assistant.  Nothing is evaluated while recording.
//!
//! ## Simulation keyboard shortcuts
//!
//! | Key | Effect |
//! |---|---|
//! | Arrows / hold | Move the subject left, right, up, down |
//! | `W` / `S` / hold | Move the subject closer / away |
//! | `H` | Cycle right-hand state |
//! | `B` | Add or remove a second subject |
//! | `I` | Toggle an inferred left arm |
//! | `N` | Toggle body data on and off |
//! | `R` | Toggle recording |
//! | `C` | Restart calibration |
//! | `Q` / `Escape` | Quit |

pub mod app;
pub mod config;
pub mod orchestrator;
pub mod sensor;
pub mod viewer;
