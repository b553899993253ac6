//! # skeleton_draw
//!
//! Turns tracked bodies into a retained list of draw commands.
//!
//! Nothing here touches a window.  A frame is staged through a
//! [`DrawingContext`] opened on a [`DrawingGroup`] and becomes visible only
//! when the context is closed; any host surface can then rasterise the
//! committed [`Scene`].
//!
//! ```rust
//! use skeleton_draw::{DrawingGroup, SkeletonRenderer};
//! use body_frame::FrameEdges;
//!
//! let renderer = SkeletonRenderer::default();
//! let mut group = DrawingGroup::new(512.0, 424.0);
//!
//! let mut dc = group.open();
//! renderer.draw_background(&mut dc);
//! renderer.draw_clipped_edges(&mut dc, FrameEdges::TOP);
//! dc.close();
//!
//! assert_eq!(group.scene().rectangles().count(), 2);
//! ```

pub mod renderer;
pub mod scene;

pub use renderer::{SkeletonRenderer, SkeletonStyle};
pub use scene::{DrawCommand, DrawingContext, DrawingGroup, Pen, Primitive, Rect, Scene};

/// Packed 0xAARRGGBB colours.
pub mod color {
    pub const BLACK:       u32 = 0xFF000000;
    pub const RED:         u32 = 0xFFFF0000;
    pub const ORANGE:      u32 = 0xFFFFA500;
    pub const GREEN:       u32 = 0xFF008000;
    pub const BLUE:        u32 = 0xFF0000FF;
    pub const INDIGO:      u32 = 0xFF4B0082;
    pub const VIOLET:      u32 = 0xFFEE82EE;
    pub const GRAY:        u32 = 0xFF808080;
    pub const YELLOW:      u32 = 0xFFFFFF00;
    pub const BURLY_WOOD:  u32 = 0xFFDEB887;
    pub const AQUAMARINE:  u32 = 0xFF7FFFD4;
    pub const JOINT_GREEN: u32 = 0xFF44C044;

    /// Replace the alpha channel of `c`.
    pub const fn with_alpha(c: u32, alpha: u8) -> u32 {
        (c & 0x00FF_FFFF) | ((alpha as u32) << 24)
    }

    pub const fn alpha(c: u32) -> u8 {
        (c >> 24) as u8
    }
}
