//! Stateful driver around [`transition`] and [`drift_check`].

use std::time::Duration;

use body_frame::{Body, JointMap};
use log::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::state::{
    drift_check, transition, CalibrationPhase, CalibrationState, CalibrationTargets, Guidance,
    Measurement,
};

/// What one evaluated frame asks the view to show.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub guidance: Option<Guidance>,
    /// Corrective pose to superimpose on the live skeleton.
    pub overlay:  Option<JointMap>,
}

/// Owns the calibration state for one view.
///
/// Every frame must reach the monitor through exactly one of
/// [`evaluate`](Self::evaluate), [`check_drift`](Self::check_drift) or
/// [`skip_frame`](Self::skip_frame) so the time between calls is measured
/// frame to frame.
#[derive(Debug)]
pub struct CalibrationMonitor<C: Clock = SystemClock> {
    targets:       CalibrationTargets,
    state:         CalibrationState,
    clock:         C,
    last_tick:     Option<Duration>,
    last_guidance: Option<Guidance>,
}

impl<C: Clock> CalibrationMonitor<C> {
    pub fn new(targets: CalibrationTargets, clock: C) -> Self {
        CalibrationMonitor {
            targets,
            state:         CalibrationState::default(),
            clock,
            last_tick:     None,
            last_guidance: None,
        }
    }

    pub fn state(&self)   -> &CalibrationState   { &self.state }
    pub fn targets(&self) -> &CalibrationTargets { &self.targets }
    pub fn is_calibrated(&self) -> bool { self.state.is_calibrated }

    /// Back to `Idle`, timer stopped.
    pub fn reset(&mut self) {
        self.state = CalibrationState::default();
        self.last_tick = None;
        self.last_guidance = None;
        info!("calibration reset");
    }

    /// Full evaluation of the reference body.  Only meaningful while not
    /// calibrated; a calibrated monitor returns an empty evaluation.
    pub fn evaluate(&mut self, body: &Body) -> Evaluation {
        let dt = self.tick();
        if self.state.is_calibrated {
            return Evaluation::default();
        }

        let before = self.state.phase();
        let t = transition(self.state, &Measurement::of(body), dt, &self.targets);
        self.state = t.state;

        debug!(
            "body {} evaluated: phase {:?}, held {} ms, guidance {:?}",
            body.index, self.state.phase(), self.state.timer.elapsed.as_millis(), t.guidance,
        );
        self.report(before, t.guidance);

        Evaluation {
            guidance: t.guidance,
            overlay:  t.correction.map(|c| c.apply(&body.joints)),
        }
    }

    /// Drift check over every tracked body.
    pub fn check_drift(&mut self, bodies: &[Body]) {
        self.tick();
        let before = self.state.phase();
        let depths = bodies.iter()
            .filter(|b| b.is_tracked)
            .map(|b| Measurement::of(b).depth());
        self.state = drift_check(self.state, depths, &self.targets);
        self.report(before, None);
    }

    /// A frame the monitor does not look at (recording).  Its time does not
    /// count towards a hold.
    pub fn skip_frame(&mut self) {
        self.tick();
    }

    fn tick(&mut self) -> Duration {
        let now = self.clock.now();
        let dt = self.last_tick.map_or(Duration::ZERO, |t| now.saturating_sub(t));
        self.last_tick = Some(now);
        dt
    }

    fn report(&mut self, before: CalibrationPhase, guidance: Option<Guidance>) {
        let after = self.state.phase();
        if after != before {
            info!("calibration {:?} -> {:?}", before, after);
        }
        if let Some(g) = guidance.filter(|g| Some(*g) != self.last_guidance) {
            info!("{}", g.message());
        }
        self.last_guidance = guidance;
    }
}

impl CalibrationMonitor<SystemClock> {
    pub fn with_system_clock(targets: CalibrationTargets) -> Self {
        CalibrationMonitor::new(targets, SystemClock::new())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use body_frame::{CameraSpacePoint, JointType, TrackingState};

    const FRAME: Duration = Duration::from_millis(33);

    fn body_at(index: usize, depth: f32, height: f32) -> Body {
        let mut b = Body::untracked(index);
        b.is_tracked = true;
        for jt in JointType::ALL {
            b.joints.set_tracking_state(jt, TrackingState::Tracked);
            b.joints.set_position(jt, CameraSpacePoint::new(0.1, height + 0.3, depth));
        }
        b.joints.set_position(JointType::SpineBase, CameraSpacePoint::new(0.0, height, depth));
        b
    }

    /// Feed `frames` identical frames, advancing the clock before each.
    fn run(m: &mut CalibrationMonitor<ManualClock>, clock: &ManualClock, body: &Body, frames: usize) -> Evaluation {
        let mut last = Evaluation::default();
        for _ in 0..frames {
            clock.advance(FRAME);
            last = m.evaluate(body);
        }
        last
    }

    fn monitor() -> (CalibrationMonitor<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (CalibrationMonitor::new(CalibrationTargets::default(), clock.clone()), clock)
    }

    #[test]
    fn first_frame_starts_hold() {
        let (mut m, _clock) = monitor();
        let e = m.evaluate(&body_at(0, 1.4, -0.44));
        assert_eq!(e.guidance, Some(Guidance::HoldStill));
        assert_eq!(m.state().phase(), CalibrationPhase::Holding);
        assert!(e.overlay.is_none());
    }

    #[test]
    fn hold_timing_through_clock() {
        let (mut m, clock) = monitor();
        let body = body_at(0, 1.4, -0.44);
        m.evaluate(&body);

        // 90 frames × 33 ms = 2970 ms
        let e = run(&mut m, &clock, &body, 90);
        assert_eq!(e.guidance, Some(Guidance::HoldStill));

        // 3003 ms
        let e = run(&mut m, &clock, &body, 1);
        assert_eq!(e.guidance, Some(Guidance::MayBegin));
        assert!(!m.is_calibrated());

        // 3003 + 121 × 33 = 6996 ms
        let e = run(&mut m, &clock, &body, 121);
        assert_eq!(e.guidance, Some(Guidance::MayBegin));
        assert!(!m.is_calibrated());

        // 7029 ms
        run(&mut m, &clock, &body, 1);
        assert!(m.is_calibrated());
        assert!(!m.state().timer.running);
    }

    #[test]
    fn overlay_is_scaled_live_pose() {
        let (mut m, _clock) = monitor();
        let e = m.evaluate(&body_at(0, 2.8, -0.44));
        assert_eq!(e.guidance, Some(Guidance::MoveCloser));
        let overlay = e.overlay.unwrap();
        let head = overlay[JointType::Head].position;
        assert!((head.x - 0.05).abs() < 1e-6);
        assert_eq!(head.z, 2.8);
        assert_eq!(overlay[JointType::Head].tracking_state, TrackingState::Tracked);
    }

    #[test]
    fn drift_uncalibrates_on_same_frame() {
        let (mut m, clock) = monitor();
        let body = body_at(0, 1.4, -0.44);
        m.evaluate(&body);
        run(&mut m, &clock, &body, 250);
        assert!(m.is_calibrated());

        clock.advance(FRAME);
        m.check_drift(&[body_at(0, 1.45, -0.44)]);
        assert!(m.is_calibrated());

        clock.advance(FRAME);
        m.check_drift(&[body_at(0, 1.7, -0.44)]);
        assert!(!m.is_calibrated());
        assert_eq!(m.state().phase(), CalibrationPhase::Idle);

        // next full evaluation starts a fresh hold
        let e = run(&mut m, &clock, &body, 1);
        assert_eq!(e.guidance, Some(Guidance::HoldStill));
        assert_eq!(m.state().timer.elapsed, Duration::ZERO);
    }

    #[test]
    fn drift_ignores_untracked_slots() {
        let (mut m, clock) = monitor();
        let body = body_at(0, 1.4, -0.44);
        m.evaluate(&body);
        run(&mut m, &clock, &body, 250);

        let mut far = body_at(1, 3.0, -0.44);
        far.is_tracked = false;
        m.check_drift(&[body.clone(), far]);
        assert!(m.is_calibrated());
    }

    #[test]
    fn skipped_frames_do_not_count() {
        let (mut m, clock) = monitor();
        let body = body_at(0, 1.4, -0.44);
        m.evaluate(&body);
        clock.advance(Duration::from_secs(10));
        m.skip_frame();
        let e = run(&mut m, &clock, &body, 1);
        assert_eq!(e.guidance, Some(Guidance::HoldStill));
        assert!(!m.is_calibrated());
    }

    #[test]
    fn reset_returns_to_idle() {
        let (mut m, _clock) = monitor();
        m.evaluate(&body_at(0, 1.4, -0.44));
        m.reset();
        assert_eq!(*m.state(), CalibrationState::default());
    }
}
