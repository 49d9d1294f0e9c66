//! Software rasteriser for the task display. Callers speak in visual degrees
//! with y up and the screen centre at the origin; the canvas converts to
//! pixels once per draw call.

use crate::text::render_text_pixmap;
use ab_glyph::FontVec;
use anyhow::{Result, anyhow, bail};
use std::collections::HashMap;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};
use vmex_core::{Point, Rgba, TargetPose};

const TARGET_LINE_WIDTH_PX: f32 = 2.0;

/// Size of the drawable surface and its degree-to-pixel scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub width: u32,
    pub height: u32,
    pub pixels_per_degree: f32,
}

impl CanvasGeometry {
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn to_pixels(&self, position: Point) -> (f32, f32) {
        let (cx, cy) = self.center();
        (
            cx + position.x as f32 * self.pixels_per_degree,
            cy - position.y as f32 * self.pixels_per_degree,
        )
    }

    /// Top-left pixel of a text block `text_height` pixels tall whose left
    /// edge sits on `anchor`.
    pub fn text_origin(&self, anchor: Point, text_height: u32) -> (i32, i32) {
        let (x, y) = self.to_pixels(anchor);
        (x.round() as i32, (y - text_height as f32 * 0.5).round() as i32)
    }
}

fn color(rgba: Rgba) -> Color {
    let [r, g, b, a] = rgba.0;
    Color::from_rgba8(r, g, b, a)
}

fn paint(rgba: Rgba) -> Paint<'static> {
    let mut p = Paint::default();
    p.anti_alias = true;
    p.set_color(color(rgba));
    p
}

pub struct SkiaCanvas {
    geometry: CanvasGeometry,
    background: Rgba,
    /// Radius of cursor and target discs, in degrees.
    cue_radius: f32,
    font: Option<FontVec>,
    text_cache: HashMap<(String, u32), Pixmap>,
    canvas: Pixmap,
}

impl SkiaCanvas {
    pub fn new(geometry: CanvasGeometry, cue_radius: f64) -> Result<Self> {
        let canvas = Pixmap::new(geometry.width, geometry.height)
            .ok_or_else(|| anyhow!("invalid canvas size {}x{}", geometry.width, geometry.height))?;
        let mut renderer = Self {
            geometry,
            background: Rgba::BLACK,
            cue_radius: cue_radius as f32,
            font: None,
            text_cache: HashMap::new(),
            canvas,
        };
        renderer.clear();
        Ok(renderer)
    }

    /// Without a font, `draw_text` is a no-op.
    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self.text_cache.clear();
        self
    }

    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let geometry = CanvasGeometry {
            width,
            height,
            ..self.geometry
        };
        self.canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
        self.geometry = geometry;
        self.clear();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.canvas.fill(color(self.background));
    }

    fn disc_path(&self, position: Point) -> Option<tiny_skia::Path> {
        let (x, y) = self.geometry.to_pixels(position);
        let radius = self.cue_radius * self.geometry.pixels_per_degree;
        PathBuilder::from_circle(x, y, radius)
    }

    /// White filled disc.
    pub fn draw_cursor(&mut self, position: Point) {
        if let Some(path) = self.disc_path(position) {
            self.canvas.fill_path(
                &path,
                &paint(Rgba::WHITE),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    pub fn draw_target(&mut self, pose: &TargetPose) {
        let Some(path) = self.disc_path(pose.position) else {
            return;
        };
        if let Some(fill) = pose.style.fill {
            self.canvas.fill_path(
                &path,
                &paint(fill),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
        let stroke = Stroke {
            width: TARGET_LINE_WIDTH_PX,
            ..Stroke::default()
        };
        self.canvas.stroke_path(
            &path,
            &paint(pose.style.line),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    /// Gray text, `height` degrees tall, starting at `position` and centred
    /// on it vertically.
    pub fn draw_text(&mut self, text: &str, position: Point, height: f64) {
        let Some(font) = &self.font else {
            return;
        };
        let size_px = (height as f32 * self.geometry.pixels_per_degree).round().max(1.0) as u32;
        let key = (text.to_owned(), size_px);
        if !self.text_cache.contains_key(&key) {
            let Some(pm) = render_text_pixmap(text, size_px as f32, font, Rgba::GRAY) else {
                return;
            };
            self.text_cache.insert(key.clone(), pm);
        }
        let Some(pm) = self.text_cache.get(&key) else {
            return;
        };

        let (x0, y0) = self.geometry.text_origin(position, pm.height());
        self.canvas.draw_pixmap(
            x0,
            y0,
            pm.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    /// Copies the finished frame into a presentation buffer of equal size.
    pub fn copy_into(&self, frame_buffer: &mut [u8]) -> Result<()> {
        let src = self.canvas.data();
        if frame_buffer.len() != src.len() {
            bail!(
                "frame buffer holds {} bytes, canvas has {}",
                frame_buffer.len(),
                src.len()
            );
        }
        frame_buffer.copy_from_slice(src);
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.canvas.pixel(x, y).map(|p| {
            let c = p.demultiply();
            Rgba([c.red(), c.green(), c.blue(), c.alpha()])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmex_core::TargetStyle;

    fn canvas() -> SkiaCanvas {
        let geometry = CanvasGeometry {
            width: 200,
            height: 100,
            pixels_per_degree: 10.0,
        };
        SkiaCanvas::new(geometry, 0.6).unwrap()
    }

    #[test]
    fn degrees_map_to_pixels_with_y_up() {
        let g = canvas().geometry();
        assert_eq!(g.to_pixels(Point::ORIGIN), (100.0, 50.0));
        assert_eq!(g.to_pixels(Point::new(0.0, 3.0)), (100.0, 20.0));
        assert_eq!(g.to_pixels(Point::new(-2.0, -1.0)), (80.0, 60.0));
    }

    #[test]
    fn text_starts_at_its_anchor() {
        let g = canvas().geometry();
        // Anchored 7 degrees left of centre, 14 px tall.
        assert_eq!(g.text_origin(Point::new(-7.0, 0.0), 14), (30, 43));
        assert_eq!(g.text_origin(Point::new(-6.0, 1.0), 10), (40, 35));
    }

    #[test]
    fn clear_paints_background() {
        let mut c = canvas();
        c.draw_cursor(Point::ORIGIN);
        c.clear();
        assert_eq!(c.pixel(100, 50), Some(Rgba::BLACK));
        assert_eq!(c.pixel(0, 0), Some(Rgba::BLACK));
    }

    #[test]
    fn cursor_is_a_white_disc() {
        let mut c = canvas();
        c.draw_cursor(Point::ORIGIN);
        assert_eq!(c.pixel(100, 50), Some(Rgba::WHITE));
        assert_eq!(c.pixel(120, 50), Some(Rgba::BLACK));
    }

    #[test]
    fn go_target_is_filled_green() {
        let mut c = canvas();
        c.draw_target(&TargetPose {
            position: Point::new(5.0, 0.0),
            style: TargetStyle::GO,
        });
        assert_eq!(c.pixel(150, 50), Some(Rgba::GREEN));
    }

    #[test]
    fn hollow_target_leaves_its_centre_empty() {
        let mut c = canvas();
        c.draw_target(&TargetPose::resting(Point::ORIGIN));
        assert_eq!(c.pixel(100, 50), Some(Rgba::BLACK));
        let ring = c.pixel(106, 50).unwrap();
        assert!(ring.0[0] > 0);
    }

    #[test]
    fn text_without_font_draws_nothing() {
        let mut c = canvas();
        c.draw_text("Release the joystick", Point::ORIGIN, 1.5);
        let mut frame = vec![0u8; 200 * 100 * 4];
        c.copy_into(&mut frame).unwrap();
        assert!(frame.chunks(4).all(|px| px == Rgba::BLACK.0));
    }

    #[test]
    fn copy_into_checks_buffer_size() {
        let c = canvas();
        let mut small = vec![0u8; 16];
        assert!(c.copy_into(&mut small).is_err());
        let mut exact = vec![0u8; 200 * 100 * 4];
        c.copy_into(&mut exact).unwrap();
        assert_eq!(&exact[..4], &Rgba::BLACK.0);
    }

    #[test]
    fn resize_keeps_scale() {
        let mut c = canvas();
        c.resize(400, 300).unwrap();
        assert_eq!(c.geometry().center(), (200.0, 150.0));
        assert_eq!(c.geometry().pixels_per_degree, 10.0);
        let mut frame = vec![0u8; 400 * 300 * 4];
        c.copy_into(&mut frame).unwrap();
    }
}
