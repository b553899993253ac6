//! Calibration state and the pure per-frame transition.

use std::time::Duration;

use body_frame::{Body, CameraSpacePoint, JointMap};
use log::trace;
use serde::Deserialize;

// ════════════════════════════════════════════════════════════════════════════
// Targets and acceptance windows
// ════════════════════════════════════════════════════════════════════════════

/// Where the spine base should sit, and how long it must stay there.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalibrationTargets {
    /// Spine-base Z in metres.
    pub optimal_depth:  f32,
    /// Spine-base Y in metres.  Negative: the sensor sits above the hips.
    pub optimal_height: f32,
    /// Fractional half-width of both windows.
    pub tolerance:      f32,
    /// In-window time after which the user is told they may begin.
    pub hold_ms:        u64,
    /// In-window time after which calibration is latched.
    pub release_ms:     u64,
}

impl Default for CalibrationTargets {
    fn default() -> Self {
        CalibrationTargets {
            optimal_depth:  1.4,
            optimal_height: -0.44,
            tolerance:      0.10,
            hold_ms:        3000,
            release_ms:     7000,
        }
    }
}

impl CalibrationTargets {
    pub fn depth_window(&self) -> AcceptanceWindow {
        AcceptanceWindow::around(self.optimal_depth, self.tolerance)
    }

    pub fn height_window(&self) -> AcceptanceWindow {
        AcceptanceWindow::around(self.optimal_height, self.tolerance)
    }

    pub fn hold(&self)    -> Duration { Duration::from_millis(self.hold_ms) }
    pub fn release(&self) -> Duration { Duration::from_millis(self.release_ms) }
}

/// Where a reading falls relative to an [`AcceptanceWindow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement { Below, Inside, Above }

/// Closed interval `[lower, upper]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptanceWindow {
    pub lower: f32,
    pub upper: f32,
}

impl AcceptanceWindow {
    /// `optimal · (1 ± tolerance)`, ordered so `lower <= upper` whatever the
    /// sign of `optimal`.  For a negative optimum the lower bound is
    /// `(1 + tolerance) · optimal`.
    pub fn around(optimal: f32, tolerance: f32) -> Self {
        let a = (1.0 - tolerance) * optimal;
        let b = (1.0 + tolerance) * optimal;
        AcceptanceWindow { lower: a.min(b), upper: a.max(b) }
    }

    pub fn classify(&self, value: f32) -> Placement {
        if value < self.lower {
            Placement::Below
        } else if value > self.upper {
            Placement::Above
        } else {
            Placement::Inside
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        self.classify(value) == Placement::Inside
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HoldTimer
// ════════════════════════════════════════════════════════════════════════════

/// Accumulates continuous in-window time.
///
/// Stopping clears the accumulator: a later start measures a fresh hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HoldTimer {
    pub running: bool,
    pub elapsed: Duration,
}

impl HoldTimer {
    pub fn start(&mut self) {
        self.running = true;
        self.elapsed = Duration::ZERO;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.elapsed = Duration::ZERO;
    }

    pub fn advance(&mut self, dt: Duration) {
        if self.running {
            self.elapsed += dt;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CalibrationState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationPhase { Idle, Holding, Calibrated }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationState {
    pub is_calibrated: bool,
    pub timer:         HoldTimer,
}

impl CalibrationState {
    pub fn phase(&self) -> CalibrationPhase {
        if self.is_calibrated {
            CalibrationPhase::Calibrated
        } else if self.timer.running {
            CalibrationPhase::Holding
        } else {
            CalibrationPhase::Idle
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Measurement, guidance, correction
// ════════════════════════════════════════════════════════════════════════════

/// The part of a body the calibration looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub spine_base: CameraSpacePoint,
}

impl Measurement {
    pub fn of(body: &Body) -> Self {
        Measurement { spine_base: body.spine_base().position }
    }

    pub fn depth(&self)  -> f32 { self.spine_base.z }
    pub fn height(&self) -> f32 { self.spine_base.y }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guidance {
    MoveCloser,
    MoveAway,
    MoveSensorDown,
    MoveSensorUp,
    HoldStill,
    MayBegin,
}

impl Guidance {
    pub fn message(self) -> &'static str {
        match self {
            Guidance::MoveCloser     => "Not aligned. Move closer to the Kinect!",
            Guidance::MoveAway       => "Not aligned. Move away from the Kinect!",
            Guidance::MoveSensorDown => "Not aligned. Move the Kinect down!",
            Guidance::MoveSensorUp   => "Not aligned. Move the Kinect up!",
            Guidance::HoldStill      => "Hold still for 3 seconds.",
            Guidance::MayBegin       => "Calibrated! You may begin",
        }
    }
}

/// How to reshape the live pose into the pose the user should match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Correction {
    /// Scale X and Y by `ratio` and pin every joint to `depth`.
    Depth { ratio: f32, depth: f32 },
    /// Scale Y by `ratio`.
    Height { ratio: f32 },
}

impl Correction {
    pub fn apply(&self, joints: &JointMap) -> JointMap {
        match *self {
            Correction::Depth { ratio, depth } => joints.map_positions(|p| {
                CameraSpacePoint::new(p.x * ratio, p.y * ratio, depth)
            }),
            Correction::Height { ratio } => joints.map_positions(|p| {
                CameraSpacePoint::new(p.x, p.y * ratio, p.z)
            }),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// transition / drift_check
// ════════════════════════════════════════════════════════════════════════════

/// Result of one [`transition`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub state:      CalibrationState,
    pub guidance:   Option<Guidance>,
    pub correction: Option<Correction>,
}

impl Transition {
    fn unchanged(state: CalibrationState) -> Self {
        Transition { state, guidance: None, correction: None }
    }
}

fn measurable(v: f32) -> bool {
    v != 0.0 && v.is_finite()
}

/// One frame of full evaluation for a not-yet-calibrated state.
///
/// Depth is checked first, then height, then the hold timer; exactly one
/// of them decides the frame.  `dt` is the time since the previous
/// evaluation and only counts while the timer is running.
///
/// A zero (or non-finite) reading that decides the frame matches no rule:
/// the state is returned unchanged with no guidance.
pub fn transition(
    mut state: CalibrationState,
    m:         &Measurement,
    dt:        Duration,
    targets:   &CalibrationTargets,
) -> Transition {
    let (depth, height) = (m.depth(), m.height());
    let dw = targets.depth_window();
    let hw = targets.height_window();

    trace!(
        "spine base depth {:.3} in [{:.3}, {:.3}], height {:.3} in [{:.3}, {:.3}]",
        depth, dw.lower, dw.upper, height, hw.lower, hw.upper,
    );

    if !measurable(depth) {
        return Transition::unchanged(state);
    }
    let depth_guidance = match dw.classify(depth) {
        Placement::Above  => Some(Guidance::MoveCloser),
        Placement::Below  => Some(Guidance::MoveAway),
        Placement::Inside => None,
    };
    if let Some(guidance) = depth_guidance {
        state.timer.stop();
        let correction = Correction::Depth { ratio: targets.optimal_depth / depth, depth };
        return Transition { state, guidance: Some(guidance), correction: Some(correction) };
    }

    if !measurable(height) {
        return Transition::unchanged(state);
    }
    let height_guidance = match hw.classify(height) {
        Placement::Above  => Some(Guidance::MoveSensorDown),
        Placement::Below  => Some(Guidance::MoveSensorUp),
        Placement::Inside => None,
    };
    if let Some(guidance) = height_guidance {
        state.timer.stop();
        let correction = Correction::Height { ratio: targets.optimal_height / height };
        return Transition { state, guidance: Some(guidance), correction: Some(correction) };
    }

    if !state.timer.running {
        state.timer.start();
        return Transition { state, guidance: Some(Guidance::HoldStill), correction: None };
    }

    state.timer.advance(dt);
    let elapsed = state.timer.elapsed;
    let guidance = if elapsed > targets.release() {
        state.timer.stop();
        state.is_calibrated = true;
        None
    } else if elapsed >= targets.hold() {
        Some(Guidance::MayBegin)
    } else {
        Some(Guidance::HoldStill)
    };
    Transition { state, guidance, correction: None }
}

/// Lightweight check for a calibrated state: any measurable depth outside
/// the depth window clears the calibrated flag.  Height is not examined and
/// the timer is left alone.
pub fn drift_check(
    mut state: CalibrationState,
    depths:    impl IntoIterator<Item = f32>,
    targets:   &CalibrationTargets,
) -> CalibrationState {
    let dw = targets.depth_window();
    if depths.into_iter().any(|d| measurable(d) && !dw.contains(d)) {
        state.is_calibrated = false;
    }
    state
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use body_frame::JointType;

    const EPS: f32 = 1e-5;
    const FRAME: Duration = Duration::from_millis(500);

    fn at(depth: f32, height: f32) -> Measurement {
        Measurement { spine_base: CameraSpacePoint::new(0.0, height, depth) }
    }

    fn aligned() -> Measurement { at(1.4, -0.44) }

    fn holding(elapsed_ms: u64) -> CalibrationState {
        CalibrationState {
            is_calibrated: false,
            timer: HoldTimer { running: true, elapsed: Duration::from_millis(elapsed_ms) },
        }
    }

    #[test]
    fn default_windows() {
        let t = CalibrationTargets::default();
        let d = t.depth_window();
        assert!((d.lower - 1.26).abs() < EPS && (d.upper - 1.54).abs() < EPS);
        let h = t.height_window();
        assert!((h.lower - (-0.484)).abs() < EPS);
        assert!((h.upper - (-0.396)).abs() < EPS);
    }

    #[test]
    fn optimal_depth_is_inside() {
        let t = CalibrationTargets::default();
        assert!(t.depth_window().contains(1.4));
        let tr = transition(CalibrationState::default(), &aligned(), Duration::ZERO, &t);
        assert!(tr.correction.is_none());
    }

    #[test]
    fn too_far_moves_closer_and_scales_pose() {
        let t = CalibrationTargets::default();
        let tr = transition(holding(1000), &at(2.0, -0.44), FRAME, &t);
        assert_eq!(tr.guidance, Some(Guidance::MoveCloser));
        assert_eq!(tr.state.phase(), CalibrationPhase::Idle);
        assert_eq!(tr.state.timer.elapsed, Duration::ZERO);
        match tr.correction {
            Some(Correction::Depth { ratio, depth }) => {
                assert!((ratio - 0.7).abs() < EPS);
                assert_eq!(depth, 2.0);
            }
            other => panic!("unexpected correction {:?}", other),
        }
    }

    #[test]
    fn too_close_moves_away() {
        let t = CalibrationTargets::default();
        let tr = transition(CalibrationState::default(), &at(1.0, -0.44), FRAME, &t);
        assert_eq!(tr.guidance, Some(Guidance::MoveAway));
        assert!(matches!(tr.correction, Some(Correction::Depth { .. })));
    }

    #[test]
    fn depth_wins_over_height() {
        let t = CalibrationTargets::default();
        let tr = transition(CalibrationState::default(), &at(2.0, 0.5), FRAME, &t);
        assert_eq!(tr.guidance, Some(Guidance::MoveCloser));
    }

    #[test]
    fn height_guidance_follows_sign_convention() {
        let t = CalibrationTargets::default();
        // -0.30 is above the upper bound of -0.396
        let high = transition(holding(2000), &at(1.4, -0.30), FRAME, &t);
        assert_eq!(high.guidance, Some(Guidance::MoveSensorDown));
        assert!(!high.state.timer.running);
        match high.correction {
            Some(Correction::Height { ratio }) => assert!((ratio - 0.44 / 0.30).abs() < EPS),
            other => panic!("unexpected correction {:?}", other),
        }

        let low = transition(CalibrationState::default(), &at(1.4, -0.60), FRAME, &t);
        assert_eq!(low.guidance, Some(Guidance::MoveSensorUp));
    }

    #[test]
    fn zero_readings_leave_state_alone() {
        let t = CalibrationTargets::default();
        let s = holding(1200);
        for m in [at(0.0, -0.44), at(0.0, 0.7), at(1.4, 0.0)] {
            let tr = transition(s, &m, FRAME, &t);
            assert_eq!(tr, Transition::unchanged(s), "{:?}", m);
        }
    }

    #[test]
    fn hold_sequence() {
        let t = CalibrationTargets::default();
        let mut s = CalibrationState::default();

        let tr = transition(s, &aligned(), FRAME, &t);
        assert_eq!(tr.guidance, Some(Guidance::HoldStill));
        assert_eq!(tr.state.phase(), CalibrationPhase::Holding);
        s = tr.state;

        // 0.5 s .. 2.5 s
        for _ in 0..5 {
            let tr = transition(s, &aligned(), FRAME, &t);
            assert_eq!(tr.guidance, Some(Guidance::HoldStill));
            s = tr.state;
        }
        assert_eq!(s.timer.elapsed, Duration::from_millis(2500));

        // 3.0 s .. 7.0 s inclusive
        for _ in 0..9 {
            let tr = transition(s, &aligned(), FRAME, &t);
            assert_eq!(tr.guidance, Some(Guidance::MayBegin));
            assert!(!tr.state.is_calibrated);
            s = tr.state;
        }
        assert_eq!(s.timer.elapsed, Duration::from_millis(7000));

        let tr = transition(s, &aligned(), FRAME, &t);
        assert!(tr.state.is_calibrated);
        assert!(!tr.state.timer.running);
        assert_eq!(tr.guidance, None);
        assert_eq!(tr.state.phase(), CalibrationPhase::Calibrated);
    }

    #[test]
    fn interrupted_hold_starts_over() {
        let t = CalibrationTargets::default();
        let s = transition(holding(6500), &at(1.7, -0.44), FRAME, &t).state;
        let tr = transition(s, &aligned(), FRAME, &t);
        assert_eq!(tr.guidance, Some(Guidance::HoldStill));
        assert_eq!(tr.state.timer.elapsed, Duration::ZERO);
    }

    #[test]
    fn drift_clears_calibration() {
        let t = CalibrationTargets::default();
        let calibrated = CalibrationState { is_calibrated: true, timer: HoldTimer::default() };
        assert!(drift_check(calibrated, [1.45], &t).is_calibrated);
        assert!(drift_check(calibrated, [0.0], &t).is_calibrated);
        assert!(!drift_check(calibrated, [1.45, 1.7], &t).is_calibrated);
    }

    #[test]
    fn depth_correction_pins_z() {
        let mut j = JointMap::not_tracked();
        j.set_position(JointType::Head, CameraSpacePoint::new(0.2, 0.5, 1.9));
        let out = Correction::Depth { ratio: 0.5, depth: 2.0 }.apply(&j);
        assert_eq!(out[JointType::Head].position, CameraSpacePoint::new(0.1, 0.25, 2.0));
        // input untouched
        assert_eq!(j[JointType::Head].position.z, 1.9);
    }

    #[test]
    fn height_correction_scales_y_only() {
        let mut j = JointMap::not_tracked();
        j.set_position(JointType::Head, CameraSpacePoint::new(0.2, 0.5, 1.9));
        let out = Correction::Height { ratio: 2.0 }.apply(&j);
        assert_eq!(out[JointType::Head].position, CameraSpacePoint::new(0.2, 1.0, 1.9));
    }

    #[test]
    fn targets_from_partial_toml() {
        let t: CalibrationTargets = toml::from_str("optimal_depth = 2.0").unwrap();
        assert_eq!(t.optimal_depth, 2.0);
        assert_eq!(t.release_ms, 7000);
    }
}
