//! Per-frame composition: project, draw, calibrate, commit.
//!
//! ```text
//! bodies ──▶ CoordinateProjector ──▶ SkeletonRenderer ──▶ CalibrationMonitor ──▶ Scene
//!            (per joint)             (per tracked body)   (reference body)
//! ```

use body_frame::{Body, CoordinateProjector, FrameError, JointType, SensorRuntime};
use posture_calibration::{CalibrationMonitor, CalibrationState, CalibrationTargets, Clock, SystemClock};
use skeleton_draw::{DrawingContext, DrawingGroup, Scene, SkeletonRenderer};

use crate::config::ReferenceBody;

pub struct FrameOrchestrator<C: Clock = SystemClock> {
    projector: CoordinateProjector,
    renderer:  SkeletonRenderer,
    monitor:   CalibrationMonitor<C>,
    group:     DrawingGroup,
    reference: ReferenceBody,
}

impl<C: Clock> FrameOrchestrator<C> {
    /// Fails when the sensor offers no coordinate mapper or an empty depth
    /// frame.
    pub fn new(
        sensor:    &dyn SensorRuntime,
        targets:   CalibrationTargets,
        reference: ReferenceBody,
        clock:     C,
    ) -> Result<Self, FrameError> {
        let projector = CoordinateProjector::new(sensor.coordinate_mapper())?;

        let desc = sensor.depth_frame_description();
        if desc.width == 0 || desc.height == 0 {
            return Err(FrameError::EmptyDisplay { width: desc.width, height: desc.height });
        }

        Ok(FrameOrchestrator {
            projector,
            renderer:  SkeletonRenderer::default(),
            monitor:   CalibrationMonitor::new(targets, clock),
            group:     DrawingGroup::new(desc.width as f32, desc.height as f32),
            reference,
        })
    }

    pub fn with_renderer(mut self, renderer: SkeletonRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn scene(&self)       -> &Scene            { self.group.scene() }
    pub fn calibration(&self) -> &CalibrationState { self.monitor.state() }

    pub fn reset_calibration(&mut self) {
        self.monitor.reset();
    }

    /// Draw one sensor frame and return the committed scene.
    ///
    /// `None` means the sensor had no body data this frame: only the
    /// background is drawn.  While `is_recording` the calibration assistant
    /// is not consulted at all.
    pub fn update_frame(&mut self, bodies: Option<&[Body]>, is_recording: bool) -> &Scene {
        let FrameOrchestrator { projector, renderer, monitor, group, reference } = self;

        let mut dc = group.open();
        renderer.draw_background(&mut dc);

        match bodies {
            None => monitor.skip_frame(),
            Some(bodies) => {
                for (slot, body) in bodies.iter().enumerate() {
                    // Slot order decides colour, tracked or not.
                    let pen = renderer.body_pen(slot);
                    if !body.is_tracked {
                        continue;
                    }

                    renderer.draw_clipped_edges(&mut dc, body.clipped_edges);

                    let points = projector.project_joints(&body.joints);
                    renderer.draw_body(&mut dc, &body.joints, &points, pen);
                    renderer.draw_hand(&mut dc, body.hand_left_state,  points[JointType::HandLeft]);
                    renderer.draw_hand(&mut dc, body.hand_right_state, points[JointType::HandRight]);
                }

                if is_recording {
                    monitor.skip_frame();
                } else if monitor.is_calibrated() {
                    monitor.check_drift(bodies);
                } else {
                    match reference.select(bodies) {
                        Some(body) => draw_calibration(&mut dc, projector, renderer, monitor, body),
                        None => monitor.skip_frame(),
                    }
                }
            }
        }

        dc.close();
        group.scene()
    }
}

fn draw_calibration<C: Clock>(
    dc:        &mut DrawingContext<'_>,
    projector: &CoordinateProjector,
    renderer:  &SkeletonRenderer,
    monitor:   &mut CalibrationMonitor<C>,
    body:      &Body,
) {
    let eval = monitor.evaluate(body);

    dc.push_opacity(renderer.style().overlay_opacity);
    if let Some(guidance) = eval.guidance {
        renderer.draw_guidance(dc, guidance.message());
    }
    if let Some(overlay) = &eval.overlay {
        let points = projector.project_joints(overlay);
        renderer.draw_corrective_body(dc, overlay, &points);
    }
    dc.pop();
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use body_frame::{FrameEdges, HandState, TrackingState};
    use posture_calibration::{CalibrationPhase, Guidance, ManualClock};
    use skeleton_draw::{color, Primitive, SkeletonStyle};

    use crate::sensor::{standing_pose, SimulatedSensor, BODY_COUNT};

    const FRAME: Duration = Duration::from_millis(33);

    fn orchestrator(reference: ReferenceBody) -> (FrameOrchestrator<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let o = FrameOrchestrator::new(
            &SimulatedSensor::kinect_v2(),
            CalibrationTargets::default(),
            reference,
            clock.clone(),
        ).unwrap();
        (o, clock)
    }

    fn subject(slot: usize, depth: f32, height: f32) -> Body {
        let mut b = Body::untracked(slot);
        b.is_tracked = true;
        b.tracking_id = 100 + slot as u64;
        b.joints = standing_pose(body_frame::CameraSpacePoint::new(0.0, height, depth));
        b
    }

    fn frame_with(bodies: Vec<Body>) -> Vec<Body> {
        let mut slots: Vec<Body> = (0..BODY_COUNT).map(Body::untracked).collect();
        for b in bodies {
            let i = b.index;
            slots[i] = b;
        }
        slots
    }

    fn guidance_texts(scene: &Scene) -> Vec<String> {
        scene.texts().map(str::to_string).collect()
    }

    fn corrective_lines(scene: &Scene) -> usize {
        let pen = SkeletonStyle::default().corrective_pen;
        scene.lines().filter(|l| l.2 == pen).count()
    }

    #[test]
    fn missing_mapper_fails_construction() {
        let err = FrameOrchestrator::new(
            &SimulatedSensor::unavailable(),
            CalibrationTargets::default(),
            ReferenceBody::FirstTracked,
            ManualClock::new(),
        ).err();
        assert_eq!(err, Some(FrameError::MissingCoordinateMapper));
    }

    #[test]
    fn absent_bodies_draw_background_only() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let scene = o.update_frame(None, false);
        assert_eq!(scene.commands.len(), 1);
        let (rect, fill, _) = scene.rectangles().next().unwrap();
        assert_eq!(fill, color::BLACK);
        assert_eq!(*rect, scene.clip);
        assert_eq!((scene.width, scene.height), (512.0, 424.0));
    }

    #[test]
    fn untracked_slots_draw_nothing() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let bodies = frame_with(vec![]);
        let scene = o.update_frame(Some(&bodies), false);
        assert_eq!(scene.commands.len(), 1);
        assert_eq!(o.calibration().phase(), CalibrationPhase::Idle);
    }

    #[test]
    fn colour_follows_slot_position() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let bodies = frame_with(vec![subject(2, 1.4, -0.44)]);
        let scene = o.update_frame(Some(&bodies), true);
        assert!(scene.lines().any(|l| l.2.color == color::GREEN));
        assert!(scene.lines().all(|l| l.2.color != color::RED));
    }

    #[test]
    fn tracked_body_gets_edges_hands_and_skeleton() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let mut b = subject(0, 1.4, -0.44);
        b.clipped_edges = FrameEdges::BOTTOM;
        b.hand_left_state = HandState::Closed;
        b.hand_right_state = HandState::Lasso;
        let scene = o.update_frame(Some(&frame_with(vec![b])), true).clone();

        // background + bottom edge
        assert_eq!(scene.rectangles().count(), 2);
        let style = SkeletonStyle::default();
        assert_eq!(scene.ellipses().filter(|e| e.2 == style.hand_closed_brush).count(), 1);
        assert_eq!(scene.ellipses().filter(|e| e.2 == style.hand_lasso_brush).count(), 1);
        assert_eq!(scene.lines().count(), body_frame::BONES.len());
    }

    #[test]
    fn recording_skips_calibration() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let bodies = frame_with(vec![subject(0, 2.5, -0.44)]);
        let scene = o.update_frame(Some(&bodies), true).clone();
        assert!(guidance_texts(&scene).is_empty());
        assert_eq!(corrective_lines(&scene), 0);
        assert_eq!(*o.calibration(), CalibrationState::default());
    }

    #[test]
    fn too_far_shows_guidance_and_overlay() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let bodies = frame_with(vec![subject(0, 2.5, -0.44)]);
        let scene = o.update_frame(Some(&bodies), false).clone();

        assert_eq!(guidance_texts(&scene), [Guidance::MoveCloser.message()]);
        assert_eq!(corrective_lines(&scene), body_frame::BONES.len());

        // background + live bones + live joints, then the half-opacity layer
        let live = 1 + body_frame::BONES.len() + JointType::COUNT;
        let (opaque, overlay) = scene.commands.split_at(live);
        assert!(opaque.iter().all(|c| c.opacity == 1.0));
        assert_eq!(overlay.len(), 1 + body_frame::BONES.len() + JointType::COUNT);
        assert!(overlay.iter().all(|c| c.opacity == 0.5));
        assert!(matches!(overlay[0].primitive, Primitive::Text { .. }));
    }

    #[test]
    fn optimal_stance_has_no_overlay() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let bodies = frame_with(vec![subject(0, 1.4, -0.44)]);
        let scene = o.update_frame(Some(&bodies), false).clone();
        assert_eq!(corrective_lines(&scene), 0);
        assert_eq!(guidance_texts(&scene), [Guidance::HoldStill.message()]);
    }

    #[test]
    fn full_session_calibrates_then_drifts() {
        let (mut o, clock) = orchestrator(ReferenceBody::FirstTracked);
        let aligned = frame_with(vec![subject(0, 1.4, -0.44)]);

        o.update_frame(Some(&aligned), false);
        for _ in 0..100 {
            clock.advance(FRAME);
            o.update_frame(Some(&aligned), false);
        }
        assert_eq!(guidance_texts(o.scene()), [Guidance::MayBegin.message()]);
        assert!(!o.calibration().is_calibrated);

        for _ in 0..150 {
            clock.advance(FRAME);
            o.update_frame(Some(&aligned), false);
        }
        assert!(o.calibration().is_calibrated);
        assert!(guidance_texts(o.scene()).is_empty());

        clock.advance(FRAME);
        let drifted = frame_with(vec![subject(0, 1.7, -0.44)]);
        o.update_frame(Some(&drifted), false);
        assert!(!o.calibration().is_calibrated);
        // the drift frame itself only checks
        assert!(guidance_texts(o.scene()).is_empty());

        clock.advance(FRAME);
        o.update_frame(Some(&drifted), false);
        assert_eq!(guidance_texts(o.scene()), [Guidance::MoveCloser.message()]);
    }

    #[test]
    fn second_body_does_not_overwrite_reference() {
        let (mut o, clock) = orchestrator(ReferenceBody::FirstTracked);
        let bodies = frame_with(vec![subject(0, 1.4, -0.44), subject(1, 2.6, -0.44)]);
        o.update_frame(Some(&bodies), false);
        clock.advance(FRAME);
        let scene = o.update_frame(Some(&bodies), false).clone();
        assert_eq!(guidance_texts(&scene), [Guidance::HoldStill.message()]);
        assert_eq!(o.calibration().phase(), CalibrationPhase::Holding);
    }

    #[test]
    fn nearest_policy_follows_closest_subject() {
        let (mut o, _) = orchestrator(ReferenceBody::Nearest);
        let bodies = frame_with(vec![subject(0, 2.6, -0.44), subject(1, 1.0, -0.44)]);
        let scene = o.update_frame(Some(&bodies), false).clone();
        assert_eq!(guidance_texts(&scene), [Guidance::MoveAway.message()]);
    }

    #[test]
    fn inferred_negative_depth_joint_still_projects() {
        let (mut o, _) = orchestrator(ReferenceBody::FirstTracked);
        let mut b = subject(0, 1.4, -0.44);
        b.joints.set_tracking_state(JointType::FootLeft, TrackingState::Inferred);
        b.joints.set_position(JointType::FootLeft, body_frame::CameraSpacePoint::new(-0.1, -1.3, -0.2));
        let scene = o.update_frame(Some(&frame_with(vec![b])), true);
        assert!(scene.lines().all(|l| l.0.is_finite() && l.1.is_finite()));
    }
}
