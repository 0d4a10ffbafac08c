//! Render surface – a raster buffer plus an ordered log of what was drawn.
//!
//! Drawing calls mirror a small subset of a 2D canvas API (save/restore,
//! translate/rotate, global alpha, rect/circle/line/text). Every call appends
//! a [`DrawOp`] naming the certificate [`Element`] it belongs to, so tests and
//! callers can inspect a render pass without decoding pixels.

use std::path::Path;

use image::RgbaImage;
use tiny_skia::{
    FillRule, GradientStop, LinearGradient, Paint, PathBuilder, Pixmap, PixmapPaint, Point, Rect,
    Shader, SpreadMode, Stroke, Transform,
};

use crate::layout_config::{Color, TextAlign, TextField};

/// Which part of the certificate a draw call paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Background,
    Template,
    Border,
    Ornament,
    Watermark,
    NameUnderline,
    SignatureRule,
    SignatoryName,
    SignatoryDesignation,
    Text(TextField),
}

/// Geometry of a recorded draw call, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Fill { color: Color },
    Image { width: u32, height: u32 },
    StrokeRect { x: f32, y: f32, width: f32, height: f32, line_width: f32 },
    Circle { cx: f32, cy: f32, radius: f32 },
    Line { x1: f32, y1: f32, x2: f32, y2: f32, line_width: f32 },
    Text { text: String, x: f32, y: f32, align: TextAlign, size: f32, painted: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawOp {
    pub element: Element,
    pub shape: Shape,
}

#[derive(Debug, Clone, Copy)]
struct DrawingState {
    alpha: f32,
    transform: Transform,
}

impl Default for DrawingState {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            transform: Transform::identity(),
        }
    }
}

/// A decoded background template, stored premultiplied.
#[derive(Clone)]
pub struct Template {
    pixmap: Pixmap,
}

impl Template {
    /// Decode PNG or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| format!("decode error: {e}"))?
            .to_rgba8();
        Self::from_rgba(&img)
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        Self::decode(&bytes)
    }

    pub fn from_rgba(img: &RgbaImage) -> Result<Self, String> {
        let (w, h) = img.dimensions();
        let mut pixmap =
            Pixmap::new(w, h).ok_or_else(|| format!("unsupported template size {w}x{h}"))?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

/// Raster buffer owned by the renderer during a pass.
pub struct RenderSurface {
    pixmap: Pixmap,
    ops: Vec<DrawOp>,
    state: DrawingState,
    state_stack: Vec<DrawingState>,
}

impl RenderSurface {
    /// Create a transparent surface. `None` for a zero or oversized canvas.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
            ops: Vec::new(),
            state: DrawingState::default(),
            state_stack: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Draw calls of the current pass, in paint order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }

    /// Clear pixels, draw log and drawing state.
    pub fn reset(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        self.ops.clear();
        self.state = DrawingState::default();
        self.state_stack.clear();
    }

    pub fn save(&mut self) {
        self.state_stack.push(self.state);
    }

    pub fn restore(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.state = state;
        }
    }

    pub fn set_global_alpha(&mut self, alpha: f32) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.state.transform = self.state.transform.pre_translate(x, y);
    }

    /// Rotate clockwise by `degrees` (negative is counter-clockwise).
    pub fn rotate(&mut self, degrees: f32) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let rotation = Transform::from_row(cos, sin, -sin, cos, 0.0, 0.0);
        self.state.transform = self.state.transform.pre_concat(rotation);
    }

    /// Fill the whole canvas with `color`.
    pub fn fill(&mut self, element: Element, color: Color) {
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, self.width() as f32, self.height() as f32) {
            let paint = self.solid_paint(color);
            self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
        self.record(element, Shape::Fill { color });
    }

    /// Draw `template` stretched over the whole canvas.
    pub fn draw_template(&mut self, template: &Template) {
        let sx = self.width() as f32 / template.width() as f32;
        let sy = self.height() as f32 / template.height() as f32;
        let paint = PixmapPaint {
            quality: tiny_skia::FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            template.pixmap.as_ref(),
            &paint,
            Transform::from_scale(sx, sy),
            None,
        );
        self.record(
            Element::Template,
            Shape::Image {
                width: template.width(),
                height: template.height(),
            },
        );
    }

    pub fn stroke_rect(
        &mut self,
        element: Element,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
        color: Color,
    ) {
        if let Some(rect) = Rect::from_xywh(x, y, width, height) {
            let path = PathBuilder::from_rect(rect);
            let paint = self.solid_paint(color);
            let stroke = Stroke {
                width: line_width,
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &paint, &stroke, self.state.transform, None);
        }
        self.record(element, Shape::StrokeRect { x, y, width, height, line_width });
    }

    pub fn fill_circle(&mut self, element: Element, cx: f32, cy: f32, radius: f32, color: Color) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            let paint = self.solid_paint(color);
            self.pixmap
                .fill_path(&path, &paint, FillRule::Winding, self.state.transform, None);
        }
        self.record(element, Shape::Circle { cx, cy, radius });
    }

    /// Stroke a straight line. With `fade_stops`, the line is painted with a
    /// gradient that is transparent at both ends and solid between the stops.
    pub fn stroke_line(
        &mut self,
        element: Element,
        (x1, y1): (f32, f32),
        (x2, y2): (f32, f32),
        line_width: f32,
        color: Color,
        fade_stops: Option<(f32, f32)>,
    ) {
        let mut pb = PathBuilder::new();
        pb.move_to(x1, y1);
        pb.line_to(x2, y2);
        if let Some(path) = pb.finish() {
            let mut paint = self.solid_paint(color);
            if let Some((lo, hi)) = fade_stops {
                if let Some(shader) = self.fade_shader((x1, y1), (x2, y2), color, lo, hi) {
                    paint.shader = shader;
                }
            }
            let stroke = Stroke {
                width: line_width,
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &paint, &stroke, self.state.transform, None);
        }
        self.record(element, Shape::Line { x1, y1, x2, y2, line_width });
    }

    /// Fill a pre-built text outline and record the text call.
    ///
    /// `outline` is `None` when no real font is available; the call is still
    /// recorded so the layout can be inspected.
    pub fn fill_text(
        &mut self,
        element: Element,
        text: &str,
        (x, y): (f32, f32),
        align: TextAlign,
        size: f32,
        color: Color,
        outline: Option<tiny_skia::Path>,
    ) {
        let painted = outline.is_some();
        if let Some(path) = outline {
            let paint = self.solid_paint(color);
            self.pixmap
                .fill_path(&path, &paint, FillRule::Winding, self.state.transform, None);
        }
        self.record(
            element,
            Shape::Text {
                text: text.to_string(),
                x,
                y,
                align,
                size,
                painted,
            },
        );
    }

    /// Straight-alpha RGBA copy of the surface.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut img = RgbaImage::new(self.width(), self.height());
        for (dst, src) in img.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
        }
        img
    }

    /// Straight-alpha RGBA value of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    fn record(&mut self, element: Element, shape: Shape) {
        self.ops.push(DrawOp { element, shape });
    }

    fn skia_color(&self, color: Color) -> tiny_skia::Color {
        let c = color.with_alpha(self.state.alpha);
        tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a)
    }

    fn solid_paint(&self, color: Color) -> Paint<'static> {
        let mut paint = Paint {
            anti_alias: true,
            ..Paint::default()
        };
        paint.set_color(self.skia_color(color));
        paint
    }

    fn fade_shader(
        &self,
        start: (f32, f32),
        end: (f32, f32),
        color: Color,
        lo: f32,
        hi: f32,
    ) -> Option<Shader<'static>> {
        let solid = self.skia_color(color);
        let clear = tiny_skia::Color::TRANSPARENT;
        LinearGradient::new(
            Point::from_xy(start.0, start.1),
            Point::from_xy(end.0, end.1),
            vec![
                GradientStop::new(0.0, clear),
                GradientStop::new(lo, solid),
                GradientStop::new(0.5, solid),
                GradientStop::new(hi, solid),
                GradientStop::new(1.0, clear),
            ],
            SpreadMode::Pad,
            self.state.transform,
        )
    }
}
