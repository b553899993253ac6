//! Joints: landmark identifiers, tracking confidence, and the fixed-size
//! joint container carried by every body.

use std::ops::{Index, IndexMut};

// ════════════════════════════════════════════════════════════════════════════
// JointType
// ════════════════════════════════════════════════════════════════════════════

/// Skeletal landmark reported by the sensor, in sensor order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum JointType {
    SpineBase     = 0,
    SpineMid      = 1,
    Neck          = 2,
    Head          = 3,
    ShoulderLeft  = 4,
    ElbowLeft     = 5,
    WristLeft     = 6,
    HandLeft      = 7,
    ShoulderRight = 8,
    ElbowRight    = 9,
    WristRight    = 10,
    HandRight     = 11,
    HipLeft       = 12,
    KneeLeft      = 13,
    AnkleLeft     = 14,
    FootLeft      = 15,
    HipRight      = 16,
    KneeRight     = 17,
    AnkleRight    = 18,
    FootRight     = 19,
    SpineShoulder = 20,
    HandTipLeft   = 21,
    ThumbLeft     = 22,
    HandTipRight  = 23,
    ThumbRight    = 24,
}

impl JointType {
    pub const COUNT: usize = 25;

    /// Every landmark, in sensor order (`ALL[i].index() == i`).
    pub const ALL: [JointType; JointType::COUNT] = [
        JointType::SpineBase,
        JointType::SpineMid,
        JointType::Neck,
        JointType::Head,
        JointType::ShoulderLeft,
        JointType::ElbowLeft,
        JointType::WristLeft,
        JointType::HandLeft,
        JointType::ShoulderRight,
        JointType::ElbowRight,
        JointType::WristRight,
        JointType::HandRight,
        JointType::HipLeft,
        JointType::KneeLeft,
        JointType::AnkleLeft,
        JointType::FootLeft,
        JointType::HipRight,
        JointType::KneeRight,
        JointType::AnkleRight,
        JointType::FootRight,
        JointType::SpineShoulder,
        JointType::HandTipLeft,
        JointType::ThumbLeft,
        JointType::HandTipRight,
        JointType::ThumbRight,
    ];

    pub fn index(self) -> usize { self as usize }

    pub fn name(self) -> &'static str {
        match self {
            JointType::SpineBase     => "spine-base",
            JointType::SpineMid      => "spine-mid",
            JointType::Neck          => "neck",
            JointType::Head          => "head",
            JointType::ShoulderLeft  => "shoulder-left",
            JointType::ElbowLeft     => "elbow-left",
            JointType::WristLeft     => "wrist-left",
            JointType::HandLeft      => "hand-left",
            JointType::ShoulderRight => "shoulder-right",
            JointType::ElbowRight    => "elbow-right",
            JointType::WristRight    => "wrist-right",
            JointType::HandRight     => "hand-right",
            JointType::HipLeft       => "hip-left",
            JointType::KneeLeft      => "knee-left",
            JointType::AnkleLeft     => "ankle-left",
            JointType::FootLeft      => "foot-left",
            JointType::HipRight      => "hip-right",
            JointType::KneeRight     => "knee-right",
            JointType::AnkleRight    => "ankle-right",
            JointType::FootRight     => "foot-right",
            JointType::SpineShoulder => "spine-shoulder",
            JointType::HandTipLeft   => "hand-tip-left",
            JointType::ThumbLeft     => "thumb-left",
            JointType::HandTipRight  => "hand-tip-right",
            JointType::ThumbRight    => "thumb-right",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TrackingState
// ════════════════════════════════════════════════════════════════════════════

/// Confidence of a joint's reported position.
///
/// Ordered, so "at least inferred" reads as `state >= TrackingState::Inferred`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

// ════════════════════════════════════════════════════════════════════════════
// CameraSpacePoint
// ════════════════════════════════════════════════════════════════════════════

/// Position in sensor space, in metres.  Y points up, Z away from the sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraSpacePoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        CameraSpacePoint { x, y, z }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Joint
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub joint_type:     JointType,
    pub position:       CameraSpacePoint,
    pub tracking_state: TrackingState,
}

impl Joint {
    pub fn new(joint_type: JointType, position: CameraSpacePoint, tracking_state: TrackingState) -> Self {
        Joint { joint_type, position, tracking_state }
    }

    pub fn is_visible(&self) -> bool {
        self.tracking_state >= TrackingState::Inferred
    }
}

// ════════════════════════════════════════════════════════════════════════════
// JointMap: one entry per JointType, always
// ════════════════════════════════════════════════════════════════════════════

/// Fixed-size joint container keyed by [`JointType`].
///
/// Backed by an array in sensor order, so every landmark always has exactly
/// one entry and lookups cannot miss.
#[derive(Clone, Debug, PartialEq)]
pub struct JointMap {
    joints: [Joint; JointType::COUNT],
}

impl JointMap {
    /// Build a map by asking `f` for each landmark in sensor order.
    pub fn from_fn(mut f: impl FnMut(JointType) -> Joint) -> Self {
        JointMap {
            joints: JointType::ALL.map(|jt| {
                let joint = f(jt);
                Joint { joint_type: jt, ..joint }
            }),
        }
    }

    /// Every joint at the sensor origin, not tracked.
    pub fn not_tracked() -> Self {
        JointMap::from_fn(|jt| Joint::new(jt, CameraSpacePoint::default(), TrackingState::NotTracked))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    /// Copy of this map with every position rewritten by `f`; tracking
    /// states are preserved.
    pub fn map_positions(&self, mut f: impl FnMut(CameraSpacePoint) -> CameraSpacePoint) -> Self {
        JointMap {
            joints: self.joints.map(|j| Joint { position: f(j.position), ..j }),
        }
    }

    pub fn set_position(&mut self, joint_type: JointType, position: CameraSpacePoint) {
        self.joints[joint_type.index()].position = position;
    }

    pub fn set_tracking_state(&mut self, joint_type: JointType, state: TrackingState) {
        self.joints[joint_type.index()].tracking_state = state;
    }
}

impl Default for JointMap {
    fn default() -> Self { JointMap::not_tracked() }
}

impl Index<JointType> for JointMap {
    type Output = Joint;
    fn index(&self, joint_type: JointType) -> &Joint {
        &self.joints[joint_type.index()]
    }
}

impl IndexMut<JointType> for JointMap {
    fn index_mut(&mut self, joint_type: JointType) -> &mut Joint {
        &mut self.joints[joint_type.index()]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_sensor_order() {
        for (i, jt) in JointType::ALL.iter().enumerate() {
            assert_eq!(jt.index(), i, "{} out of order", jt.name());
        }
    }

    #[test]
    fn tracking_state_ordering() {
        assert!(TrackingState::NotTracked < TrackingState::Inferred);
        assert!(TrackingState::Inferred   < TrackingState::Tracked);
    }

    #[test]
    fn from_fn_forces_matching_keys() {
        // A builder that lies about the joint type still lands in the right slot.
        let map = JointMap::from_fn(|_| {
            Joint::new(JointType::Head, CameraSpacePoint::default(), TrackingState::Tracked)
        });
        for jt in JointType::ALL {
            assert_eq!(map[jt].joint_type, jt);
        }
    }

    #[test]
    fn map_positions_keeps_tracking() {
        let mut map = JointMap::not_tracked();
        map.set_tracking_state(JointType::Head, TrackingState::Inferred);
        let moved = map.map_positions(|p| CameraSpacePoint::new(p.x + 1.0, p.y, p.z));
        assert_eq!(moved[JointType::Head].tracking_state, TrackingState::Inferred);
        assert_eq!(moved[JointType::Head].position.x, 1.0);
    }
}
