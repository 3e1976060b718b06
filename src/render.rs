//! Preview rendering — rasterizes a board's segment log into a small PNG.
//!
//! DESIGN
//! ======
//! Strokes arrive in a fixed reference resolution and are scaled linearly
//! into the preview resolution. Each stroke is rasterized as a solid capsule
//! (distance-to-segment test), which gives round caps for free and renders a
//! zero-length segment as a dot. `render` is pure and deterministic: the
//! same log always produces the same bytes.
//!
//! `Preview` is the per-board cache: it keeps the raster canvas between
//! appends and draws only the new stroke, so per-append cost is bounded by
//! the stroke's footprint rather than the log length.

use image::{ImageFormat, Rgba, RgbaImage};
use tracing::error;

use crate::state::Segment;

/// Reference resolution clients draw against. Replay scales correctly on any
/// viewport as long as clients submit coordinates in this space.
pub const REFERENCE_WIDTH: f64 = 1280.0;
pub const REFERENCE_HEIGHT: f64 = 720.0;

/// Preview output resolution.
pub const PREVIEW_WIDTH: u32 = 320;
pub const PREVIEW_HEIGHT: u32 = 180;

/// Strokes never rasterize thinner than this, whatever their size.
pub const MIN_STROKE_WIDTH: f64 = 1.0;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FALLBACK_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

// =============================================================================
// PREVIEW CACHE
// =============================================================================

/// Cached preview for one board: the working canvas plus its PNG encoding.
/// After `apply` or `reset` the PNG equals `render` of the full log.
pub struct Preview {
    canvas: RgbaImage,
    png: Vec<u8>,
}

impl Preview {
    #[must_use]
    pub fn new() -> Self {
        let canvas = blank_canvas();
        let png = encode_png(&canvas);
        Self { canvas, png }
    }

    /// Fold one appended segment into the canvas and refresh the PNG.
    pub fn apply(&mut self, segment: &Segment) {
        draw_segment(&mut self.canvas, segment);
        self.png = encode_png(&self.canvas);
    }

    /// Return to the blank state, as if no segment had ever been drawn.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn png(&self) -> &[u8] {
        &self.png
    }
}

impl Default for Preview {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RENDERING
// =============================================================================

/// Rasterize a full segment log into PNG bytes.
#[must_use]
pub fn render(segments: &[Segment]) -> Vec<u8> {
    let mut canvas = blank_canvas();
    for segment in segments {
        draw_segment(&mut canvas, segment);
    }
    encode_png(&canvas)
}

fn blank_canvas() -> RgbaImage {
    RgbaImage::from_pixel(PREVIEW_WIDTH, PREVIEW_HEIGHT, BACKGROUND)
}

fn encode_png(canvas: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    if let Err(e) = canvas.write_to(&mut cursor, ImageFormat::Png) {
        error!(error = %e, "preview png encoding failed");
        buf.clear();
    }
    buf
}

/// Stamp one stroke onto the canvas as a capsule with round caps.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_segment(canvas: &mut RgbaImage, segment: &Segment) {
    let sx = f64::from(PREVIEW_WIDTH) / REFERENCE_WIDTH;
    let sy = f64::from(PREVIEW_HEIGHT) / REFERENCE_HEIGHT;

    let (x0, y0) = (segment.from.x * sx, segment.from.y * sy);
    let (x1, y1) = (segment.to.x * sx, segment.to.y * sy);
    if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
        return;
    }

    let radius = (segment.size * sx).max(MIN_STROKE_WIDTH) / 2.0;
    let color = parse_color(&segment.color);

    // Bounding box of the capsule, clipped to the canvas.
    let min_x = (x0.min(x1) - radius).floor().max(0.0);
    let min_y = (y0.min(y1) - radius).floor().max(0.0);
    let max_x = (x0.max(x1) + radius).ceil().min(f64::from(PREVIEW_WIDTH - 1));
    let max_y = (y0.max(y1) + radius).ceil().min(f64::from(PREVIEW_HEIGHT - 1));
    if min_x > max_x || min_y > max_y {
        return;
    }

    for py in min_y as u32..=max_y as u32 {
        for px in min_x as u32..=max_x as u32 {
            let cx = f64::from(px) + 0.5;
            let cy = f64::from(py) + 0.5;
            if distance_to_segment(cx, cy, x0, y0, x1, y1) <= radius {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

/// Distance from a point to the closest point on a line segment.
fn distance_to_segment(px: f64, py: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (px - x0).hypot(py - y0);
    }
    let t = (((px - x0) * dx + (py - y0) * dy) / len_sq).clamp(0.0, 1.0);
    (px - (x0 + t * dx)).hypot(py - (y0 + t * dy))
}

/// Parse `#rgb` / `#rrggbb` hex colors; anything else falls back to black.
fn parse_color(color: &str) -> Rgba<u8> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if !hex.is_ascii() {
        return FALLBACK_COLOR;
    }
    let rgb = match hex.len() {
        3 => parse_hex_channels(hex, 1).map(|[r, g, b]| [r * 17, g * 17, b * 17]),
        6 => parse_hex_channels(hex, 2),
        _ => None,
    };
    rgb.map_or(FALLBACK_COLOR, |[r, g, b]| Rgba([r, g, b, 255]))
}

fn parse_hex_channels(hex: &str, width: usize) -> Option<[u8; 3]> {
    let r = u8::from_str_radix(hex.get(..width)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(width..2 * width)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(2 * width..)?, 16).ok()?;
    Some([r, g, b])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Point;

    fn segment(x0: f64, y0: f64, x1: f64, y1: f64, color: &str, size: f64) -> Segment {
        Segment {
            from: Point { x: x0, y: y0 },
            to: Point { x: x1, y: y1 },
            color: color.into(),
            size,
        }
    }

    #[test]
    fn blank_preview_matches_empty_render() {
        assert_eq!(Preview::new().png(), render(&[]));
    }

    #[test]
    fn incremental_apply_matches_batch_render() {
        let segments =
            vec![segment(0.0, 0.0, 640.0, 360.0, "#ff0000", 8.0), segment(640.0, 0.0, 0.0, 360.0, "#00ff00", 3.0)];

        let mut preview = Preview::new();
        for s in &segments {
            preview.apply(s);
        }

        assert_eq!(preview.png(), render(&segments));
    }

    #[test]
    fn reset_restores_blank_state() {
        let mut preview = Preview::new();
        preview.apply(&segment(100.0, 100.0, 500.0, 500.0, "#000", 10.0));
        preview.reset();
        assert_eq!(preview.png(), render(&[]));
    }

    #[test]
    fn render_is_deterministic() {
        let segments = vec![segment(10.0, 10.0, 1200.0, 700.0, "#123456", 5.0)];
        assert_eq!(render(&segments), render(&segments));
    }

    #[test]
    fn stroke_changes_pixels() {
        assert_ne!(render(&[segment(0.0, 0.0, 1280.0, 720.0, "#000", 4.0)]), render(&[]));
    }

    #[test]
    fn tiny_stroke_still_visible() {
        // Even a sub-pixel size must rasterize at the minimum width.
        assert_ne!(render(&[segment(100.0, 100.0, 600.0, 400.0, "#000", 0.01)]), render(&[]));
    }

    #[test]
    fn zero_length_segment_draws_a_dot() {
        let mut canvas = blank_canvas();
        draw_segment(&mut canvas, &segment(640.0, 360.0, 640.0, 360.0, "#ff0000", 40.0));
        assert_eq!(*canvas.get_pixel(160, 90), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn out_of_bounds_segment_clips_without_panic() {
        let segments = vec![
            segment(-5000.0, -5000.0, -4000.0, -4000.0, "#000", 4.0),
            segment(99_999.0, 99_999.0, 100_000.0, 100_000.0, "#000", 4.0),
            segment(f64::NAN, 0.0, 100.0, 100.0, "#000", 4.0),
        ];
        // Fully off-canvas and non-finite strokes leave the canvas blank.
        assert_eq!(render(&segments), render(&[]));
    }

    #[test]
    fn partially_off_canvas_segment_draws_visible_part() {
        assert_ne!(render(&[segment(-500.0, 360.0, 500.0, 360.0, "#000", 6.0)]), render(&[]));
    }

    #[test]
    fn parse_color_accepts_long_and_short_hex() {
        assert_eq!(parse_color("#ff0000"), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("#0f0"), Rgba([0, 255, 0, 255]));
        assert_eq!(parse_color("#abc"), Rgba([0xaa, 0xbb, 0xcc, 255]));
    }

    #[test]
    fn parse_color_falls_back_to_black() {
        assert_eq!(parse_color("teal"), FALLBACK_COLOR);
        assert_eq!(parse_color("#12345"), FALLBACK_COLOR);
        assert_eq!(parse_color(""), FALLBACK_COLOR);
        assert_eq!(parse_color("#ggg"), FALLBACK_COLOR);
    }

    #[test]
    fn stroke_color_lands_on_canvas() {
        let mut canvas = blank_canvas();
        draw_segment(&mut canvas, &segment(0.0, 360.0, 1280.0, 360.0, "#1d4ed8", 20.0));
        assert_eq!(*canvas.get_pixel(160, 90), Rgba([0x1d, 0x4e, 0xd8, 255]));
    }
}
