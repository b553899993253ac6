//! One tracking slot's snapshot for a single sensor frame.

use bitflags::bitflags;

use crate::joint::{Joint, JointMap, JointType};

// ════════════════════════════════════════════════════════════════════════════
// HandState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HandState {
    #[default]
    Unknown,
    NotTracked,
    Open,
    Closed,
    /// Index and middle finger extended, pointer-style.
    Lasso,
}

// ════════════════════════════════════════════════════════════════════════════
// FrameEdges
// ════════════════════════════════════════════════════════════════════════════

bitflags! {
    /// Display edges that are cutting off part of a tracked body.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FrameEdges: u8 {
        const RIGHT  = 0b0001;
        const LEFT   = 0b0010;
        const TOP    = 0b0100;
        const BOTTOM = 0b1000;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Body
// ════════════════════════════════════════════════════════════════════════════

/// Read-only snapshot of one tracking slot.
///
/// The sensor delivers a fixed number of slots every frame; slots with no
/// person in them arrive with `is_tracked == false`.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    /// Slot position in the frame's body array.
    pub index:            usize,
    pub tracking_id:      u64,
    pub is_tracked:       bool,
    pub joints:           JointMap,
    pub hand_left_state:  HandState,
    pub hand_right_state: HandState,
    pub clipped_edges:    FrameEdges,
}

impl Body {
    /// An empty slot.
    pub fn untracked(index: usize) -> Self {
        Body {
            index,
            tracking_id:      0,
            is_tracked:       false,
            joints:           JointMap::not_tracked(),
            hand_left_state:  HandState::Unknown,
            hand_right_state: HandState::Unknown,
            clipped_edges:    FrameEdges::empty(),
        }
    }

    /// The joint used as the body's positional reference.
    pub fn spine_base(&self) -> &Joint {
        &self.joints[JointType::SpineBase]
    }
}
