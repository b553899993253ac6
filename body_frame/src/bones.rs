//! Skeleton topology: which joint pairs are joined by a drawn line.

use crate::joint::JointType;

/// A drawable line between two landmarks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bone(pub JointType, pub JointType);

use JointType::*;

/// Every bone of the skeleton.
pub const BONES: [Bone; 24] = [
    // Torso
    Bone(Head,          Neck),
    Bone(Neck,          SpineShoulder),
    Bone(SpineShoulder, SpineMid),
    Bone(SpineMid,      SpineBase),
    Bone(SpineShoulder, ShoulderRight),
    Bone(SpineShoulder, ShoulderLeft),
    Bone(SpineBase,     HipRight),
    Bone(SpineBase,     HipLeft),
    // Right arm
    Bone(ShoulderRight, ElbowRight),
    Bone(ElbowRight,    WristRight),
    Bone(WristRight,    HandRight),
    Bone(HandRight,     HandTipRight),
    Bone(WristRight,    ThumbRight),
    // Left arm
    Bone(ShoulderLeft,  ElbowLeft),
    Bone(ElbowLeft,     WristLeft),
    Bone(WristLeft,     HandLeft),
    Bone(HandLeft,      HandTipLeft),
    Bone(WristLeft,     ThumbLeft),
    // Right leg
    Bone(HipRight,      KneeRight),
    Bone(KneeRight,     AnkleRight),
    Bone(AnkleRight,    FootRight),
    // Left leg
    Bone(HipLeft,       KneeLeft),
    Bone(KneeLeft,      AnkleLeft),
    Bone(AnkleLeft,     FootLeft),
];
