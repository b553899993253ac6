//! Software-rendered viewer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  committed Scene, scaled                 │
//! │  (nothing painted outside Scene::clip)   │
//! │                                          │
//! ├──────────────────────────────────────────┤
//! │  status line                             │
//! │  key legend                              │
//! └──────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::{anyhow, Result};
use body_frame::{DisplayPoint, FrameDescription};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use skeleton_draw::{color, Primitive, Rect, Scene};

use crate::config::ViewerConfig;
use crate::sensor::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const STATUS_H:  usize = 34;
const STATUS_BG:     u32   = 0xFF0F1A2E;
const STATUS_FG:     u32   = 0xFFEEEEEE;
const LEGEND_FG:     u32   = 0xFF888888;
const LEGEND: &str =
    "arrows=move  w/s=closer/away  h=hand  b=2nd body  i=inferred arm  n=signal  r=rec  c=recal  q=quit";

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// Half-open pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl PixelRect {
    fn scaled(r: &Rect, scale: f32) -> Self {
        PixelRect {
            x0: (r.x * scale).floor() as i64,
            y0: (r.y * scale).floor() as i64,
            x1: (r.right()  * scale).ceil() as i64,
            y1: (r.bottom() * scale).ceil() as i64,
        }
    }

    fn intersect(self, o: PixelRect) -> PixelRect {
        PixelRect {
            x0: self.x0.max(o.x0),
            y0: self.y0.max(o.y0),
            x1: self.x1.min(o.x1),
            y1: self.y1.min(o.y1),
        }
    }
}

/// ARGB framebuffer that knows how to paint a [`Scene`].
pub struct Canvas {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, fill: u32) -> Self {
        Canvas { width, height, buf: vec![fill; width * height] }
    }

    pub fn width(&self)  -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    pub fn clear(&mut self, fill: u32) {
        self.buf.fill(fill);
    }

    fn bounds(&self) -> PixelRect {
        PixelRect { x0: 0, y0: 0, x1: self.width as i64, y1: self.height as i64 }
    }

    /// Paint every committed command, scaled by `scale`, inside the scene's
    /// clip.
    pub fn paint(&mut self, scene: &Scene, scale: f32) {
        let clip = PixelRect::scaled(&scene.clip, scale).intersect(self.bounds());
        let at = |p: &DisplayPoint| DisplayPoint::new(p.x * scale, p.y * scale);

        for cmd in &scene.commands {
            match &cmd.primitive {
                Primitive::Rectangle { rect, fill } => {
                    let r = PixelRect::scaled(rect, scale).intersect(clip);
                    self.fill_rect(r, *fill, cmd.opacity);
                }
                Primitive::Line { from, to, pen } => {
                    self.stroke_line(at(from), at(to), pen.thickness * scale, pen.color, cmd.opacity, clip);
                }
                Primitive::Ellipse { center, radius_x, radius_y, fill } => {
                    self.fill_ellipse(at(center), radius_x * scale, radius_y * scale, *fill, cmd.opacity, clip);
                }
                Primitive::Text { text, origin, size, color } => {
                    self.draw_text(text, at(origin), size * scale, *color, cmd.opacity, clip);
                }
            }
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn plot(&mut self, x: i64, y: i64, color: u32, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = y as usize * self.width + x as usize;
        self.buf[i] = if alpha >= 1.0 { color | 0xFF00_0000 } else { blend(self.buf[i], color, alpha) };
    }

    fn fill_rect(&mut self, r: PixelRect, color: u32, opacity: f32) {
        let alpha = effective_alpha(color, opacity);
        if alpha <= 0.0 {
            return;
        }
        for y in r.y0..r.y1 {
            for x in r.x0..r.x1 {
                self.plot(x, y, color, alpha);
            }
        }
    }

    /// Square-capped stroke: every pixel whose centre lies within half the
    /// thickness of the segment.
    fn stroke_line(
        &mut self,
        a:         DisplayPoint,
        b:         DisplayPoint,
        thickness: f32,
        color:     u32,
        opacity:   f32,
        clip:      PixelRect,
    ) {
        let alpha = effective_alpha(color, opacity);
        if !a.is_finite() || !b.is_finite() || alpha <= 0.0 {
            return;
        }
        let half = (thickness / 2.0).max(0.5);
        let bbox = PixelRect {
            x0: (a.x.min(b.x) - half).floor() as i64,
            y0: (a.y.min(b.y) - half).floor() as i64,
            x1: (a.x.max(b.x) + half).ceil() as i64 + 1,
            y1: (a.y.max(b.y) + half).ceil() as i64 + 1,
        }
        .intersect(clip);

        for y in bbox.y0..bbox.y1 {
            for x in bbox.x0..bbox.x1 {
                let p = DisplayPoint::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_segment(p, a, b) <= half {
                    self.plot(x, y, color, alpha);
                }
            }
        }
    }

    fn fill_ellipse(
        &mut self,
        c:       DisplayPoint,
        rx:      f32,
        ry:      f32,
        color:   u32,
        opacity: f32,
        clip:    PixelRect,
    ) {
        let alpha = effective_alpha(color, opacity);
        if !c.is_finite() || rx <= 0.0 || ry <= 0.0 || alpha <= 0.0 {
            return;
        }
        let bbox = PixelRect {
            x0: (c.x - rx).floor() as i64,
            y0: (c.y - ry).floor() as i64,
            x1: (c.x + rx).ceil() as i64 + 1,
            y1: (c.y + ry).ceil() as i64 + 1,
        }
        .intersect(clip);

        for y in bbox.y0..bbox.y1 {
            for x in bbox.x0..bbox.x1 {
                let dx = (x as f32 + 0.5 - c.x) / rx;
                let dy = (y as f32 + 0.5 - c.y) / ry;
                if dx * dx + dy * dy <= 1.0 {
                    self.plot(x, y, color, alpha);
                }
            }
        }
    }

    /// Bitmap text; `size` is the nominal em height in pixels.
    fn draw_text(
        &mut self,
        text:    &str,
        origin:  DisplayPoint,
        size:    f32,
        color:   u32,
        opacity: f32,
        clip:    PixelRect,
    ) {
        let alpha = effective_alpha(color, opacity);
        if !origin.is_finite() || alpha <= 0.0 {
            return;
        }
        let px = glyph_pixel(size);
        let mut cx = origin.x as i64;
        let cy = origin.y as i64;

        for ch in text.chars() {
            if cx >= clip.x1 { break; }
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3i64 {
                    if bits & (1 << (2 - col)) == 0 {
                        continue;
                    }
                    let cell = PixelRect {
                        x0: cx + col * px,
                        y0: cy + row as i64 * px,
                        x1: cx + (col + 1) * px,
                        y1: cy + (row as i64 + 1) * px,
                    }
                    .intersect(clip);
                    for y in cell.y0..cell.y1 {
                        for x in cell.x0..cell.x1 {
                            self.plot(x, y, color, alpha);
                        }
                    }
                }
            }
            cx += 4 * px; // 3 wide + 1 gap
        }
    }
}

/// Side of one font cell, so a 5-row glyph plus spacing fits `size`.
fn glyph_pixel(size: f32) -> i64 {
    (size / 8.0).floor().max(1.0) as i64
}

/// Colour alpha channel times group opacity, in `0.0..=1.0`.
fn effective_alpha(c: u32, opacity: f32) -> f32 {
    (color::alpha(c) as f32 / 255.0 * opacity).clamp(0.0, 1.0)
}

fn distance_to_segment(p: DisplayPoint, a: DisplayPoint, b: DisplayPoint) -> f32 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len2 = abx * abx + aby * aby;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * abx + (p.y - a.y) * aby) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (qx, qy) = (a.x + t * abx, a.y + t * aby);
    ((p.x - qx).powi(2) + (p.y - qy).powi(2)).sqrt()
}

// ════════════════════════════════════════════════════════════════════════════
// Viewer
// ════════════════════════════════════════════════════════════════════════════

/// Host-level requests read from the keyboard.  Everything else goes to the
/// body source as [`SimInput`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostInput {
    pub quit:              bool,
    pub toggle_recording:  bool,
    pub reset_calibration: bool,
}

pub struct Viewer {
    window: Window,
    canvas: Canvas,
    scale:  usize,
    sim_tx: Sender<SimInput>,
}

impl Viewer {
    pub fn new(display: FrameDescription, cfg: &ViewerConfig, sim_tx: Sender<SimInput>) -> Result<Self> {
        let scale = cfg.scale.max(1);
        let width  = display.width  as usize * scale;
        let height = display.height as usize * scale + STATUS_H;

        let mut window = Window::new(
            "Kinect Body View",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| anyhow!("opening viewer window: {}", e))?;

        let fps = cfg.max_fps.max(1);
        window.limit_update_rate(Some(Duration::from_secs(1) / fps));

        Ok(Viewer {
            window,
            canvas: Canvas::new(width, height, color::BLACK),
            scale,
            sim_tx,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll the keyboard.  Simulation keys are forwarded to the body source;
    /// host keys come back in the returned [`HostInput`].
    pub fn poll_input(&mut self) -> HostInput {
        let mut host = HostInput::default();
        if !self.window.is_open() {
            host.quit = true;
            return host;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            let _ = self.sim_tx.send(SimInput::Quit);
            host.quit = true;
            return host;
        }
        host.toggle_recording  = one_shot(Key::R);
        host.reset_calibration = one_shot(Key::C);

        let mut sim = Vec::new();
        if one_shot(Key::H) { sim.push(SimInput::CycleHand); }
        if one_shot(Key::B) { sim.push(SimInput::ToggleSecondSubject); }
        if one_shot(Key::I) { sim.push(SimInput::ToggleInferredArm); }
        if one_shot(Key::N) { sim.push(SimInput::ToggleSignal); }

        // movement repeats while held
        let axis = |neg: Key, pos: Key| match (held(neg), held(pos)) {
            (true, false) => -1.0,
            (false, true) =>  1.0,
            _             =>  0.0,
        };
        let (dx, dy, dz) = (axis(Key::Left, Key::Right), axis(Key::Down, Key::Up), axis(Key::W, Key::S));
        if dx != 0.0 || dy != 0.0 || dz != 0.0 {
            sim.push(SimInput::Nudge { dx, dy, dz });
        }

        for input in sim {
            let _ = self.sim_tx.send(input);
        }
        host
    }

    /// Rasterise `scene` and the status strip, then push to the window.
    pub fn present(&mut self, scene: &Scene, status: &str) -> Result<()> {
        self.canvas.clear(color::BLACK);
        self.canvas.paint(scene, self.scale as f32);
        self.draw_status(status);

        let (w, h) = (self.canvas.width(), self.canvas.height());
        self.window
            .update_with_buffer(self.canvas.pixels(), w, h)
            .map_err(|e| anyhow!("presenting frame: {}", e))
    }

    fn draw_status(&mut self, status: &str) {
        let (w, h) = (self.canvas.width() as i64, self.canvas.height() as i64);
        let strip = PixelRect { x0: 0, y0: h - STATUS_H as i64, x1: w, y1: h };
        self.canvas.fill_rect(strip, STATUS_BG, 1.0);

        let y = (h - STATUS_H as i64) as f32;
        self.canvas.draw_text(status, DisplayPoint::new(8.0, y + 6.0),  8.0, STATUS_FG, 1.0, strip);
        self.canvas.draw_text(LEGEND, DisplayPoint::new(8.0, y + 20.0), 8.0, LEGEND_FG, 1.0, strip);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '|' => [0b010, 0b010, 0b010, 0b010, 0b010],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
