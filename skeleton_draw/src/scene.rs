//! Retained drawing model.
//!
//! A [`DrawingGroup`] keeps the last committed [`Scene`].  Each frame opens
//! a [`DrawingContext`] on it, stages commands, and commits them with
//! [`DrawingContext::close`].  A context that is dropped without being
//! closed (early return, panic unwinding) throws its staged commands away,
//! so the previously committed scene stays on screen intact.

use body_frame::DisplayPoint;
use log::debug;

// ════════════════════════════════════════════════════════════════════════════
// Primitives
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pen {
    pub color:     u32,
    pub thickness: f32,
}

impl Pen {
    pub const fn new(color: u32, thickness: f32) -> Self { Pen { color, thickness } }
}

/// Axis-aligned rectangle; `x`/`y` is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x:      f32,
    pub y:      f32,
    pub width:  f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect { x, y, width, height }
    }

    pub fn right(&self)  -> f32 { self.x + self.width }
    pub fn bottom(&self) -> f32 { self.y + self.height }

    pub fn contains(&self, p: DisplayPoint) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y
            && other.right() <= self.right() && other.bottom() <= self.bottom()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Rectangle { rect: Rect, fill: u32 },
    Line      { from: DisplayPoint, to: DisplayPoint, pen: Pen },
    Ellipse   { center: DisplayPoint, radius_x: f32, radius_y: f32, fill: u32 },
    Text      { text: String, origin: DisplayPoint, size: f32, color: u32 },
}

/// A primitive plus the group opacity in effect when it was drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    pub primitive: Primitive,
    pub opacity:   f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Scene
// ════════════════════════════════════════════════════════════════════════════

/// One committed frame.
///
/// `clip` always spans the declared canvas; hosts must not paint outside it.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub width:    f32,
    pub height:   f32,
    pub clip:     Rect,
    pub commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn empty(width: f32, height: f32) -> Self {
        Scene {
            width,
            height,
            clip: Rect::new(0.0, 0.0, width, height),
            commands: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool { self.commands.is_empty() }

    pub fn rectangles(&self) -> impl Iterator<Item = (&Rect, u32, f32)> {
        self.commands.iter().filter_map(|c| match &c.primitive {
            Primitive::Rectangle { rect, fill } => Some((rect, *fill, c.opacity)),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = (DisplayPoint, DisplayPoint, Pen, f32)> + '_ {
        self.commands.iter().filter_map(|c| match &c.primitive {
            Primitive::Line { from, to, pen } => Some((*from, *to, *pen, c.opacity)),
            _ => None,
        })
    }

    pub fn ellipses(&self) -> impl Iterator<Item = (DisplayPoint, f32, u32, f32)> + '_ {
        self.commands.iter().filter_map(|c| match &c.primitive {
            Primitive::Ellipse { center, radius_x, fill, .. } => {
                Some((*center, *radius_x, *fill, c.opacity))
            }
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match &c.primitive {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DrawingGroup / DrawingContext
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct DrawingGroup {
    committed: Scene,
}

impl DrawingGroup {
    pub fn new(width: f32, height: f32) -> Self {
        DrawingGroup { committed: Scene::empty(width, height) }
    }

    /// The last committed frame.
    pub fn scene(&self) -> &Scene { &self.committed }

    pub fn width(&self)  -> f32 { self.committed.width }
    pub fn height(&self) -> f32 { self.committed.height }

    /// Start staging a new frame.
    pub fn open(&mut self) -> DrawingContext<'_> {
        DrawingContext {
            group:    self,
            staged:   Vec::new(),
            opacity:  Vec::new(),
            closed:   false,
        }
    }
}

/// Staging area for one frame.  See the module docs for commit semantics.
#[derive(Debug)]
pub struct DrawingContext<'g> {
    group:   &'g mut DrawingGroup,
    staged:  Vec<DrawCommand>,
    opacity: Vec<f32>,
    closed:  bool,
}

impl<'g> DrawingContext<'g> {
    pub fn width(&self)  -> f32 { self.group.width() }
    pub fn height(&self) -> f32 { self.group.height() }

    /// Opacity applied to commands drawn from now on.
    pub fn opacity(&self) -> f32 {
        self.opacity.iter().product()
    }

    /// Multiply the current opacity by `opacity` until the matching [`pop`].
    ///
    /// [`pop`]: DrawingContext::pop
    pub fn push_opacity(&mut self, opacity: f32) {
        self.opacity.push(opacity.clamp(0.0, 1.0));
    }

    pub fn pop(&mut self) {
        self.opacity.pop();
    }

    pub fn draw_rectangle(&mut self, fill: u32, rect: Rect) {
        self.push(Primitive::Rectangle { rect, fill });
    }

    pub fn draw_line(&mut self, pen: Pen, from: DisplayPoint, to: DisplayPoint) {
        self.push(Primitive::Line { from, to, pen });
    }

    pub fn draw_ellipse(&mut self, fill: u32, center: DisplayPoint, radius_x: f32, radius_y: f32) {
        self.push(Primitive::Ellipse { center, radius_x, radius_y, fill });
    }

    pub fn draw_text(&mut self, text: &str, origin: DisplayPoint, size: f32, color: u32) {
        self.push(Primitive::Text { text: text.to_string(), origin, size, color });
    }

    /// Commit the staged frame, replacing the group's previous scene.
    pub fn close(mut self) {
        let width  = self.group.width();
        let height = self.group.height();
        self.group.committed = Scene {
            width,
            height,
            clip: Rect::new(0.0, 0.0, width, height),
            commands: std::mem::take(&mut self.staged),
        };
        self.closed = true;
    }

    fn push(&mut self, primitive: Primitive) {
        let opacity = self.opacity();
        self.staged.push(DrawCommand { primitive, opacity });
    }
}

impl Drop for DrawingContext<'_> {
    fn drop(&mut self) {
        if !self.closed && !self.staged.is_empty() {
            debug!("discarding {} staged draw commands", self.staged.len());
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: u32 = 0xFFFFFFFF;

    #[test]
    fn close_commits_and_sets_clip() {
        let mut g = DrawingGroup::new(100.0, 50.0);
        let mut dc = g.open();
        dc.draw_rectangle(WHITE, Rect::new(0.0, 0.0, 10.0, 10.0));
        dc.close();
        assert_eq!(g.scene().commands.len(), 1);
        assert_eq!(g.scene().clip, Rect::new(0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn dropped_context_leaves_previous_scene() {
        let mut g = DrawingGroup::new(100.0, 50.0);
        {
            let mut dc = g.open();
            dc.draw_text("first", DisplayPoint::new(0.0, 0.0), 10.0, WHITE);
            dc.close();
        }
        {
            let mut dc = g.open();
            dc.draw_text("partial", DisplayPoint::new(0.0, 0.0), 10.0, WHITE);
            // dropped without close
        }
        let texts: Vec<_> = g.scene().texts().collect();
        assert_eq!(texts, ["first"]);
    }

    #[test]
    fn opacity_stack_multiplies_and_pops() {
        let mut g = DrawingGroup::new(10.0, 10.0);
        let mut dc = g.open();
        dc.push_opacity(0.5);
        dc.push_opacity(0.5);
        dc.draw_line(Pen::new(WHITE, 1.0), DisplayPoint::default(), DisplayPoint::new(1.0, 1.0));
        dc.pop();
        dc.draw_line(Pen::new(WHITE, 1.0), DisplayPoint::default(), DisplayPoint::new(1.0, 1.0));
        dc.pop();
        dc.pop(); // unbalanced pop is harmless
        dc.draw_line(Pen::new(WHITE, 1.0), DisplayPoint::default(), DisplayPoint::new(1.0, 1.0));
        dc.close();
        let ops: Vec<f32> = g.scene().lines().map(|l| l.3).collect();
        assert_eq!(ops, [0.25, 0.5, 1.0]);
    }

    #[test]
    fn rect_containment() {
        let canvas = Rect::new(0.0, 0.0, 512.0, 424.0);
        assert!(canvas.contains_rect(&Rect::new(502.0, 0.0, 10.0, 424.0)));
        assert!(!canvas.contains_rect(&Rect::new(503.0, 0.0, 10.0, 424.0)));
        assert!(canvas.contains(DisplayPoint::new(512.0, 424.0)));
    }
}
