//! # body_frame
//!
//! The per-frame body model delivered by a skeletal tracking sensor, the
//! static bone topology drawn over it, and the projection of sensor-space
//! joint positions into display space.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use body_frame::{
//!     Body, CameraSpacePoint, CoordinateMapper, CoordinateProjector,
//!     JointType, PinholeDepthMapper,
//! };
//!
//! let mapper: Arc<dyn CoordinateMapper> = Arc::new(PinholeDepthMapper::kinect_v2());
//! let projector = CoordinateProjector::new(Some(mapper)).unwrap();
//!
//! let body = Body::untracked(0);
//! let points = projector.project_joints(&body.joints);
//! let _spine = points[JointType::SpineBase];
//!
//! // Negative depth is clamped before the mapper ever sees it.
//! let p = projector.project(CameraSpacePoint::new(0.0, 0.0, -1.0));
//! assert!(p.is_finite());
//! ```

pub mod body;
pub mod bones;
pub mod joint;
pub mod projection;

pub use body::{Body, FrameEdges, HandState};
pub use bones::{Bone, BONES};
pub use joint::{CameraSpacePoint, Joint, JointMap, JointType, TrackingState};
pub use projection::{
    clamp_depth, CoordinateMapper, CoordinateProjector, DepthSpacePoint, DisplayPoint,
    FrameDescription, PinholeDepthMapper, ProjectedJoints, SensorRuntime,
    INFERRED_Z_POSITION_CLAMP,
};

use thiserror::Error;

/// Failures raised while wiring a view to its sensor runtime.
///
/// Both are construction-time and fatal; per-frame processing never fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("sensor runtime provides no coordinate mapper")]
    MissingCoordinateMapper,
    #[error("display space must be non-empty, got {width}x{height}")]
    EmptyDisplay { width: u32, height: u32 },
}
