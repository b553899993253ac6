//! Body frame sources.
//!
//! The public interface is [`BodyFrame`] delivered over a `mpsc` channel.
//! The viewer doesn't need to know whether frames came from a real sensor
//! or the keyboard-driven simulator.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use body_frame::{
    Body, CameraSpacePoint, CoordinateMapper, CoordinateProjector, FrameDescription, FrameEdges,
    FrameError, HandState, Joint, JointMap, JointType, PinholeDepthMapper, SensorRuntime,
    TrackingState,
};
use log::{debug, info};

use crate::config::SimulationConfig;

/// Tracking slots delivered per frame.
pub const BODY_COUNT: usize = 6;

// ════════════════════════════════════════════════════════════════════════════
// BodyFrame
// ════════════════════════════════════════════════════════════════════════════

/// One sensor frame.  `bodies` is `None` when the sensor produced no body
/// data for this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyFrame {
    pub bodies: Option<Vec<Body>>,
}

// ════════════════════════════════════════════════════════════════════════════
// SimulatedSensor
// ════════════════════════════════════════════════════════════════════════════

/// Sensor runtime with a pinhole mapper in place of the device's own.
pub struct SimulatedSensor {
    mapper: Option<Arc<dyn CoordinateMapper>>,
    depth:  FrameDescription,
}

impl SimulatedSensor {
    pub fn kinect_v2() -> Self {
        SimulatedSensor {
            mapper: Some(Arc::new(PinholeDepthMapper::kinect_v2())),
            depth:  FrameDescription::KINECT_V2_DEPTH,
        }
    }

    /// A runtime that never came up: no mapper.
    pub fn unavailable() -> Self {
        SimulatedSensor { mapper: None, depth: FrameDescription::KINECT_V2_DEPTH }
    }
}

impl SensorRuntime for SimulatedSensor {
    fn coordinate_mapper(&self) -> Option<Arc<dyn CoordinateMapper>> {
        self.mapper.clone()
    }

    fn depth_frame_description(&self) -> FrameDescription {
        self.depth
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic pose
// ════════════════════════════════════════════════════════════════════════════

/// Offset of each joint from the spine base for an upright subject facing
/// the sensor, in metres.
fn standing_offset(jt: JointType) -> (f32, f32, f32) {
    use JointType::*;
    match jt {
        SpineBase     => ( 0.00,  0.00,  0.00),
        SpineMid      => ( 0.00,  0.30,  0.00),
        SpineShoulder => ( 0.00,  0.48,  0.00),
        Neck          => ( 0.00,  0.55,  0.00),
        Head          => ( 0.00,  0.68,  0.00),

        ShoulderLeft  => (-0.18,  0.50,  0.00),
        ElbowLeft     => (-0.24,  0.25,  0.02),
        WristLeft     => (-0.26,  0.02,  0.00),
        HandLeft      => (-0.27, -0.05,  0.00),
        HandTipLeft   => (-0.27, -0.13,  0.00),
        ThumbLeft     => (-0.24, -0.07, -0.02),

        ShoulderRight => ( 0.18,  0.50,  0.00),
        ElbowRight    => ( 0.24,  0.25,  0.02),
        WristRight    => ( 0.26,  0.02,  0.00),
        HandRight     => ( 0.27, -0.05,  0.00),
        HandTipRight  => ( 0.27, -0.13,  0.00),
        ThumbRight    => ( 0.24, -0.07, -0.02),

        HipLeft       => (-0.09, -0.02,  0.00),
        KneeLeft      => (-0.10, -0.42,  0.00),
        AnkleLeft     => (-0.10, -0.80,  0.02),
        FootLeft      => (-0.10, -0.84, -0.10),

        HipRight      => ( 0.09, -0.02,  0.00),
        KneeRight     => ( 0.10, -0.42,  0.00),
        AnkleRight    => ( 0.10, -0.80,  0.02),
        FootRight     => ( 0.10, -0.84, -0.10),
    }
}

/// A fully tracked upright pose whose spine base sits at `root`.
pub fn standing_pose(root: CameraSpacePoint) -> JointMap {
    JointMap::from_fn(|jt| {
        let (dx, dy, dz) = standing_offset(jt);
        let p = CameraSpacePoint::new(root.x + dx, root.y + dy, root.z + dz);
        Joint::new(jt, p, TrackingState::Tracked)
    })
}

// ════════════════════════════════════════════════════════════════════════════
// BodySource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`BodyFrame`]s over a channel.
pub trait BodySource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<BodyFrame>);
}

/// Spawn a body source on its own thread and return the receiving end.
pub fn spawn_body_source<B: BodySource>(source: B) -> Receiver<BodyFrame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimBodySource
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the viewer window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Move the primary subject by one step along each non-zero axis.
    Nudge { dx: f32, dy: f32, dz: f32 },
    /// Step the primary subject's right hand through its states.
    CycleHand,
    /// Add or remove a second subject behind and beside the first.
    ToggleSecondSubject,
    /// Degrade the primary subject's left arm to inferred/not tracked.
    ToggleInferredArm,
    /// Stop or resume body data; frames keep coming without bodies.
    ToggleSignal,
    Quit,
}

/// Synthetic subjects driven by [`SimInput`] from the viewer.
///
/// Emits one frame per period whether or not input arrived, like a sensor
/// running at a fixed rate.
pub struct SimBodySource {
    rx:           Receiver<SimInput>,
    projector:    CoordinateProjector,
    display:      FrameDescription,
    period:       Duration,
    step:         f32,

    subject:      CameraSpacePoint,
    right_hand:   HandState,
    second:       bool,
    inferred_arm: bool,
    signal:       bool,
}

impl SimBodySource {
    pub fn new(
        rx:     Receiver<SimInput>,
        sensor: &dyn SensorRuntime,
        sim:    &SimulationConfig,
    ) -> Result<Self, FrameError> {
        let projector = CoordinateProjector::new(sensor.coordinate_mapper())?;
        Ok(SimBodySource {
            rx,
            projector,
            display:      sensor.depth_frame_description(),
            period:       Duration::from_secs(1) / sim.frame_hz.max(1),
            step:         sim.step,
            subject:      CameraSpacePoint::new(0.0, sim.start_height, sim.start_depth),
            right_hand:   HandState::Unknown,
            second:       false,
            inferred_arm: false,
            signal:       true,
        })
    }

    /// Apply one input.  Returns `false` on [`SimInput::Quit`].
    pub fn apply(&mut self, input: SimInput) -> bool {
        match input {
            SimInput::Nudge { dx, dy, dz } => {
                self.subject.x += dx * self.step;
                self.subject.y += dy * self.step;
                self.subject.z += dz * self.step;
                debug!(
                    "subject at ({:.2}, {:.2}, {:.2})",
                    self.subject.x, self.subject.y, self.subject.z,
                );
            }
            SimInput::CycleHand => {
                self.right_hand = match self.right_hand {
                    HandState::Unknown    => HandState::Open,
                    HandState::Open       => HandState::Closed,
                    HandState::Closed     => HandState::Lasso,
                    HandState::Lasso      => HandState::NotTracked,
                    HandState::NotTracked => HandState::Unknown,
                };
            }
            SimInput::ToggleSecondSubject => self.second = !self.second,
            SimInput::ToggleInferredArm   => self.inferred_arm = !self.inferred_arm,
            SimInput::ToggleSignal => {
                self.signal = !self.signal;
                info!("body signal {}", if self.signal { "on" } else { "off" });
            }
            SimInput::Quit => return false,
        }
        true
    }

    /// The frame the source would emit right now.
    pub fn frame(&self) -> BodyFrame {
        if !self.signal {
            return BodyFrame { bodies: None };
        }

        let mut bodies: Vec<Body> = (0..BODY_COUNT).map(Body::untracked).collect();

        let mut primary = self.subject_body(0, 1, self.subject);
        primary.hand_right_state = self.right_hand;
        if self.inferred_arm {
            degrade_left_arm(&mut primary.joints);
            primary.clipped_edges = self.clipped_edges(&primary.joints);
        }
        bodies[0] = primary;

        if self.second {
            let at = CameraSpacePoint::new(self.subject.x + 0.7, self.subject.y, self.subject.z + 0.6);
            bodies[3] = self.subject_body(3, 2, at);
        }

        BodyFrame { bodies: Some(bodies) }
    }

    fn subject_body(&self, index: usize, tracking_id: u64, root: CameraSpacePoint) -> Body {
        let joints = standing_pose(root);
        Body {
            clipped_edges: self.clipped_edges(&joints),
            index,
            tracking_id,
            is_tracked: true,
            joints,
            hand_left_state:  HandState::Unknown,
            hand_right_state: HandState::Unknown,
        }
    }

    /// Edges of the depth frame that visible joints fall outside of.
    fn clipped_edges(&self, joints: &JointMap) -> FrameEdges {
        let (w, h) = (self.display.width as f32, self.display.height as f32);
        let mut edges = FrameEdges::empty();
        for joint in joints.iter().filter(|j| j.is_visible()) {
            let p = self.projector.project(joint.position);
            if !p.is_finite() {
                continue;
            }
            if p.x < 0.0 { edges |= FrameEdges::LEFT; }
            if p.x > w   { edges |= FrameEdges::RIGHT; }
            if p.y < 0.0 { edges |= FrameEdges::TOP; }
            if p.y > h   { edges |= FrameEdges::BOTTOM; }
        }
        edges
    }
}

fn degrade_left_arm(joints: &mut JointMap) {
    for jt in [JointType::ElbowLeft, JointType::WristLeft, JointType::HandLeft] {
        joints.set_tracking_state(jt, TrackingState::Inferred);
    }
    for jt in [JointType::HandTipLeft, JointType::ThumbLeft] {
        joints.set_tracking_state(jt, TrackingState::NotTracked);
    }
}

impl BodySource for SimBodySource {
    fn run(mut self: Box<Self>, tx: Sender<BodyFrame>) {
        let mut next = Instant::now();
        loop {
            let wait = next.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(wait) {
                Ok(input) => {
                    if !self.apply(input) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if tx.send(self.frame()).is_err() {
                        return;
                    }
                    next = (next + self.period).max(Instant::now());
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
