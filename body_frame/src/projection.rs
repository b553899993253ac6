//! Sensor space → display space.
//!
//! The actual camera-to-depth mapping belongs to the sensor runtime and is
//! reached through [`CoordinateMapper`].  [`CoordinateProjector`] only owns
//! the calling contract: it sanitises depth before the mapper sees it so a
//! projection never comes back non-finite because of a negative Z.

use std::ops::Index;
use std::sync::Arc;

use nalgebra::{Matrix3, Vector3};

use crate::joint::{CameraSpacePoint, JointMap, JointType};
use crate::FrameError;

/// Depth substituted for negative Z values (metres).
///
/// Inferred joints occasionally report a position behind the sensor; the
/// mapper turns those into (-inf, -inf).
pub const INFERRED_Z_POSITION_CLAMP: f32 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// Points
// ════════════════════════════════════════════════════════════════════════════

/// Pixel coordinate in the depth image, as produced by the mapper.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthSpacePoint {
    pub x: f32,
    pub y: f32,
}

/// Point on the display canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub const fn new(x: f32, y: f32) -> Self { DisplayPoint { x, y } }

    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() }
}

impl From<DepthSpacePoint> for DisplayPoint {
    fn from(p: DepthSpacePoint) -> Self { DisplayPoint { x: p.x, y: p.y } }
}

/// Display-space positions for every joint of one body.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedJoints([DisplayPoint; JointType::COUNT]);

impl ProjectedJoints {
    pub fn from_fn(f: impl FnMut(JointType) -> DisplayPoint) -> Self {
        ProjectedJoints(JointType::ALL.map(f))
    }
}

impl Index<JointType> for ProjectedJoints {
    type Output = DisplayPoint;
    fn index(&self, joint_type: JointType) -> &DisplayPoint {
        &self.0[joint_type.index()]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Sensor runtime capabilities
// ════════════════════════════════════════════════════════════════════════════

/// Camera-space → depth-space mapping supplied by the sensor runtime.
pub trait CoordinateMapper: Send + Sync {
    fn map_camera_point_to_depth_space(&self, point: CameraSpacePoint) -> DepthSpacePoint;
}

/// Size of the depth image, which doubles as the display canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDescription {
    pub width:  u32,
    pub height: u32,
}

impl FrameDescription {
    /// Depth stream of the second-generation Kinect.
    pub const KINECT_V2_DEPTH: FrameDescription = FrameDescription { width: 512, height: 424 };
}

/// The parts of an opened sensor a body view depends on.
pub trait SensorRuntime {
    /// `None` when the sensor is not available.
    fn coordinate_mapper(&self) -> Option<Arc<dyn CoordinateMapper>>;
    fn depth_frame_description(&self) -> FrameDescription;
}

// ════════════════════════════════════════════════════════════════════════════
// PinholeDepthMapper
// ════════════════════════════════════════════════════════════════════════════

/// Pinhole model of a depth camera.
///
/// Stands in for the sensor-provided mapper when no device is attached.
/// Image Y grows downward while sensor Y grows upward, so the intrinsic
/// matrix carries a negated `fy`.
#[derive(Clone, Debug, PartialEq)]
pub struct PinholeDepthMapper {
    k: Matrix3<f32>,
}

impl PinholeDepthMapper {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        PinholeDepthMapper {
            k: Matrix3::new(
                fx,  0.0, cx,
                0.0, -fy, cy,
                0.0, 0.0, 1.0,
            ),
        }
    }

    /// Nominal intrinsics of the Kinect v2 depth camera (512 × 424).
    pub fn kinect_v2() -> Self {
        PinholeDepthMapper::new(365.5, 365.5, 256.0, 212.0)
    }
}

impl CoordinateMapper for PinholeDepthMapper {
    fn map_camera_point_to_depth_space(&self, p: CameraSpacePoint) -> DepthSpacePoint {
        if p.z <= 0.0 {
            return DepthSpacePoint { x: f32::NEG_INFINITY, y: f32::NEG_INFINITY };
        }
        let h = self.k * Vector3::new(p.x, p.y, p.z);
        DepthSpacePoint { x: h.x / h.z, y: h.y / h.z }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CoordinateProjector
// ════════════════════════════════════════════════════════════════════════════

/// Replace a negative depth with [`INFERRED_Z_POSITION_CLAMP`].
///
/// Non-negative depths pass through untouched, so applying this twice is
/// the same as applying it once.
pub fn clamp_depth(mut point: CameraSpacePoint) -> CameraSpacePoint {
    if point.z < 0.0 {
        point.z = INFERRED_Z_POSITION_CLAMP;
    }
    point
}

#[derive(Clone)]
pub struct CoordinateProjector {
    mapper: Arc<dyn CoordinateMapper>,
}

impl CoordinateProjector {
    pub fn new(mapper: Option<Arc<dyn CoordinateMapper>>) -> Result<Self, FrameError> {
        let mapper = mapper.ok_or(FrameError::MissingCoordinateMapper)?;
        Ok(CoordinateProjector { mapper })
    }

    /// Project one sensor-space point.  The caller's point is not modified.
    pub fn project(&self, point: CameraSpacePoint) -> DisplayPoint {
        self.mapper.map_camera_point_to_depth_space(clamp_depth(point)).into()
    }

    pub fn project_joints(&self, joints: &JointMap) -> ProjectedJoints {
        ProjectedJoints::from_fn(|jt| self.project(joints[jt].position))
    }
}

impl std::fmt::Debug for CoordinateProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateProjector").finish_non_exhaustive()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
