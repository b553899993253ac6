//! Application configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! reference_body = "nearest"
//!
//! [calibration]
//! optimal_depth  = 1.4
//! optimal_height = -0.44
//!
//! [viewer]
//! scale = 2
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use body_frame::Body;
use clap::ValueEnum;
use posture_calibration::{CalibrationTargets, Measurement};
use serde::Deserialize;

// ════════════════════════════════════════════════════════════════════════════
// ReferenceBody
// ════════════════════════════════════════════════════════════════════════════

/// Which tracked body the calibration assistant follows in a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceBody {
    /// First tracked body in slot order.
    #[default]
    FirstTracked,
    /// Tracked body whose spine base is closest to the sensor.
    Nearest,
}

impl ReferenceBody {
    pub fn select<'a>(&self, bodies: &'a [Body]) -> Option<&'a Body> {
        let mut tracked = bodies.iter().filter(|b| b.is_tracked);
        match self {
            ReferenceBody::FirstTracked => tracked.next(),
            ReferenceBody::Nearest => tracked
                .filter(|b| Measurement::of(b).depth() > 0.0)
                .min_by(|a, b| {
                    Measurement::of(a).depth().total_cmp(&Measurement::of(b).depth())
                }),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ViewConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub calibration:    CalibrationTargets,
    pub reference_body: ReferenceBody,
    pub viewer:         ViewerConfig,
    pub simulation:     SimulationConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window pixels per display-space pixel.
    pub scale:      usize,
    /// Upper bound on window refresh rate.
    pub max_fps:    u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig { scale: 2, max_fps: 60 }
    }
}

/// Where the simulated subject starts and how far one key press moves it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub start_depth:  f32,
    pub start_height: f32,
    /// Metres per key press.
    pub step:         f32,
    /// Sensor frame rate.
    pub frame_hz:     u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            start_depth:  2.2,
            start_height: -0.44,
            step:         0.05,
            frame_hz:     30,
        }
    }
}

impl ViewConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: ViewConfig = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use body_frame::{CameraSpacePoint, JointType};

    fn tracked_at(index: usize, depth: f32) -> Body {
        let mut b = Body::untracked(index);
        b.is_tracked = true;
        b.joints.set_position(JointType::SpineBase, CameraSpacePoint::new(0.0, -0.4, depth));
        b
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg: ViewConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ViewConfig::default());
        assert_eq!(cfg.calibration.optimal_depth, 1.4);
        assert_eq!(cfg.reference_body, ReferenceBody::FirstTracked);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg: ViewConfig = toml::from_str(
            "reference_body = \"nearest\"\n[calibration]\noptimal_depth = 1.8\n[viewer]\nscale = 1\n",
        ).unwrap();
        assert_eq!(cfg.reference_body, ReferenceBody::Nearest);
        assert_eq!(cfg.calibration.optimal_depth, 1.8);
        assert_eq!(cfg.calibration.optimal_height, -0.44);
        assert_eq!(cfg.viewer.scale, 1);
        assert_eq!(cfg.viewer.max_fps, 60);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ViewConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("here.toml"));
    }

    #[test]
    fn first_tracked_skips_empty_slots() {
        let bodies = [Body::untracked(0), tracked_at(1, 2.0), tracked_at(2, 1.5)];
        assert_eq!(ReferenceBody::FirstTracked.select(&bodies).unwrap().index, 1);
    }

    #[test]
    fn nearest_picks_smallest_depth() {
        let bodies = [Body::untracked(0), tracked_at(1, 2.0), tracked_at(2, 1.5), tracked_at(3, 0.0)];
        assert_eq!(ReferenceBody::Nearest.select(&bodies).unwrap().index, 2);
    }

    #[test]
    fn no_tracked_body_no_reference() {
        let bodies = [Body::untracked(0), Body::untracked(1)];
        assert!(ReferenceBody::FirstTracked.select(&bodies).is_none());
        assert!(ReferenceBody::Nearest.select(&bodies).is_none());
    }
}
