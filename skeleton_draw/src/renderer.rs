//! Skeleton rendering rules.
//!
//! | Element | Drawn when | Look |
//! |---|---|---|
//! | Bone | both ends at least inferred | body pen if both tracked, else thin gray |
//! | Joint | tracked / inferred | green / yellow dot |
//! | Hand | closed / open / lasso | translucent red / green / blue disc |
//! | Clipped edge | flag set | red bar along that display edge |

use body_frame::{Bone, DisplayPoint, FrameEdges, HandState, JointMap, ProjectedJoints, TrackingState, BONES};

use crate::color::{self, with_alpha};
use crate::scene::{DrawingContext, Pen, Rect};

// ════════════════════════════════════════════════════════════════════════════
// SkeletonStyle
// ════════════════════════════════════════════════════════════════════════════

/// Every pen, brush and size the renderer uses.
#[derive(Clone, Debug, PartialEq)]
pub struct SkeletonStyle {
    /// Radius of joint dots.
    pub joint_thickness:       f32,
    /// Radius of hand-state discs.
    pub hand_size:             f32,
    pub clip_bounds_thickness: f32,

    pub tracked_joint_brush:   u32,
    pub inferred_joint_brush:  u32,
    pub inferred_bone_pen:     Pen,

    pub hand_closed_brush:     u32,
    pub hand_open_brush:       u32,
    pub hand_lasso_brush:      u32,

    pub clip_edge_brush:       u32,
    pub background:            u32,

    /// One pen per body slot; wraps when there are more slots than pens.
    pub body_pens:             Vec<Pen>,

    /// Calibration overlay.
    pub corrective_pen:        Pen,
    pub overlay_opacity:       f32,
    pub guidance_color:        u32,
    pub guidance_size:         f32,
    pub guidance_origin:       DisplayPoint,
}

impl Default for SkeletonStyle {
    fn default() -> Self {
        SkeletonStyle {
            joint_thickness:       3.0,
            hand_size:             30.0,
            clip_bounds_thickness: 10.0,

            tracked_joint_brush:   color::JOINT_GREEN,
            inferred_joint_brush:  color::YELLOW,
            inferred_bone_pen:     Pen::new(color::GRAY, 1.0),

            hand_closed_brush:     with_alpha(color::RED,   128),
            hand_open_brush:       with_alpha(0xFF00FF00,   128),
            hand_lasso_brush:      with_alpha(color::BLUE,  128),

            clip_edge_brush:       color::RED,
            background:            color::BLACK,

            body_pens: [
                color::RED, color::ORANGE, color::GREEN,
                color::BLUE, color::INDIGO, color::VIOLET,
            ]
            .iter()
            .map(|&c| Pen::new(c, 6.0))
            .collect(),

            corrective_pen:        Pen::new(color::BURLY_WOOD, 8.0),
            overlay_opacity:       0.5,
            guidance_color:        color::AQUAMARINE,
            guidance_size:         24.0,
            guidance_origin:       DisplayPoint::new(20.0, 20.0),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SkeletonRenderer
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct SkeletonRenderer {
    style: SkeletonStyle,
}

impl SkeletonRenderer {
    pub fn new(style: SkeletonStyle) -> Self {
        SkeletonRenderer { style }
    }

    pub fn style(&self) -> &SkeletonStyle { &self.style }

    /// Pen for the body in `slot`.
    ///
    /// Colour follows the body's position in the frame's body sequence,
    /// not a stable identity: if the sensor reorders its slots, colours
    /// move with them.
    pub fn body_pen(&self, slot: usize) -> Pen {
        match self.style.body_pens.len() {
            0 => self.style.inferred_bone_pen,
            n => self.style.body_pens[slot % n],
        }
    }

    /// Opaque fill covering the whole canvas.
    pub fn draw_background(&self, dc: &mut DrawingContext<'_>) {
        let rect = Rect::new(0.0, 0.0, dc.width(), dc.height());
        dc.draw_rectangle(self.style.background, rect);
    }

    /// Bones first, then joint dots on top.
    pub fn draw_body(
        &self,
        dc:     &mut DrawingContext<'_>,
        joints: &JointMap,
        points: &ProjectedJoints,
        pen:    Pen,
    ) {
        for bone in BONES.iter() {
            self.draw_bone(dc, joints, points, *bone, pen);
        }

        for joint in joints.iter() {
            let brush = match joint.tracking_state {
                TrackingState::Tracked    => self.style.tracked_joint_brush,
                TrackingState::Inferred   => self.style.inferred_joint_brush,
                TrackingState::NotTracked => continue,
            };
            let r = self.style.joint_thickness;
            dc.draw_ellipse(brush, points[joint.joint_type], r, r);
        }
    }

    pub fn draw_bone(
        &self,
        dc:     &mut DrawingContext<'_>,
        joints: &JointMap,
        points: &ProjectedJoints,
        bone:   Bone,
        pen:    Pen,
    ) {
        let Bone(a, b) = bone;
        let (s0, s1) = (joints[a].tracking_state, joints[b].tracking_state);

        if s0 == TrackingState::NotTracked || s1 == TrackingState::NotTracked {
            return;
        }

        // Only a fully tracked bone earns the body's own colour.
        let pen = if s0 == TrackingState::Tracked && s1 == TrackingState::Tracked {
            pen
        } else {
            self.style.inferred_bone_pen
        };

        dc.draw_line(pen, points[a], points[b]);
    }

    pub fn draw_hand(&self, dc: &mut DrawingContext<'_>, state: HandState, at: DisplayPoint) {
        let brush = match state {
            HandState::Closed => self.style.hand_closed_brush,
            HandState::Open   => self.style.hand_open_brush,
            HandState::Lasso  => self.style.hand_lasso_brush,
            HandState::Unknown | HandState::NotTracked => return,
        };
        let r = self.style.hand_size;
        dc.draw_ellipse(brush, at, r, r);
    }

    pub fn draw_clipped_edges(&self, dc: &mut DrawingContext<'_>, edges: FrameEdges) {
        let (w, h) = (dc.width(), dc.height());
        let t = self.style.clip_bounds_thickness;
        let brush = self.style.clip_edge_brush;

        if edges.contains(FrameEdges::BOTTOM) {
            dc.draw_rectangle(brush, Rect::new(0.0, h - t, w, t));
        }
        if edges.contains(FrameEdges::TOP) {
            dc.draw_rectangle(brush, Rect::new(0.0, 0.0, w, t));
        }
        if edges.contains(FrameEdges::LEFT) {
            dc.draw_rectangle(brush, Rect::new(0.0, 0.0, t, h));
        }
        if edges.contains(FrameEdges::RIGHT) {
            dc.draw_rectangle(brush, Rect::new(w - t, 0.0, t, h));
        }
    }

    /// Draw a body in the corrective pen.  Callers wrap this in the
    /// overlay opacity.
    pub fn draw_corrective_body(
        &self,
        dc:     &mut DrawingContext<'_>,
        joints: &JointMap,
        points: &ProjectedJoints,
    ) {
        self.draw_body(dc, joints, points, self.style.corrective_pen);
    }

    pub fn draw_guidance(&self, dc: &mut DrawingContext<'_>, text: &str) {
        dc.draw_text(text, self.style.guidance_origin, self.style.guidance_size, self.style.guidance_color);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
