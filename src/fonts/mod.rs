// Glyph rendering into a pixel sink.
//
// Fonts only answer "is this glyph pixel ink?"; the renderer scales,
// clips and skips glyphs that miss the resident rows. Two glyph sources:
// column-major tables (bitmap) and embedded-graphics mono fonts (mono).

pub mod bitmap;
pub mod mono;

use core::ops::Range;

use embedded_graphics_core::geometry::Point;
use embedded_graphics_core::pixelcolor::BinaryColor;

use crate::drivers::segment::SegmentBuffer;

/// Something glyphs can be drawn into.
pub trait PixelSink {
    /// Full canvas `(width, height)`.
    fn canvas_size(&self) -> (u16, u16);
    /// Rows currently backed by storage; other rows are dropped.
    fn window_rows(&self) -> Range<u16>;
    /// (x, y) is on the canvas.
    fn put_pixel(&mut self, x: u16, y: u16, color: BinaryColor);
}

pub trait GlyphSource {
    /// Advance cell `(width, height)` in unscaled pixels, spacing included.
    fn cell_size(&self) -> (u16, u16);
    /// Ink at `(col, row)` of `ch`'s cell.
    fn glyph_pixel(&self, ch: char, col: u16, row: u16) -> bool;
}

impl PixelSink for SegmentBuffer {
    fn canvas_size(&self) -> (u16, u16) {
        (self.width(), self.height())
    }

    fn window_rows(&self) -> Range<u16> {
        self.rows()
    }

    fn put_pixel(&mut self, x: u16, y: u16, color: BinaryColor) {
        let _ = self.set_pixel(x as i32, y as i32, color);
    }
}

/// Draw `ch` with its cell's top-left at `origin`, each glyph pixel as a
/// `scale` x `scale` block. Ink is `fg`; the rest of the cell is `bg`,
/// unless `fg == bg`, in which case the background is left untouched.
/// Pixels off the canvas are clipped.
pub fn draw_char<S, G>(
    sink: &mut S,
    glyphs: &G,
    origin: Point,
    ch: char,
    fg: BinaryColor,
    bg: BinaryColor,
    scale: u8,
) where
    S: PixelSink + ?Sized,
    G: GlyphSource + ?Sized,
{
    let scale = scale.max(1) as i32;
    let (cell_w, cell_h) = glyphs.cell_size();
    let (width, height) = sink.canvas_size();

    if origin.x >= width as i32 || origin.x + cell_w as i32 * scale <= 0 {
        return;
    }

    // nothing lands in the resident rows
    let window = sink.window_rows();
    if origin.y >= window.end as i32 || origin.y + cell_h as i32 * scale <= window.start as i32 {
        return;
    }

    let transparent = fg == bg;
    for col in 0..cell_w {
        for row in 0..cell_h {
            let color = if glyphs.glyph_pixel(ch, col, row) {
                fg
            } else if transparent {
                continue;
            } else {
                bg
            };
            let x = origin.x + col as i32 * scale;
            let y = origin.y + row as i32 * scale;
            fill_block(sink, x, y, scale, color, (width, height));
        }
    }
}

fn fill_block<S: PixelSink + ?Sized>(
    sink: &mut S,
    x0: i32,
    y0: i32,
    scale: i32,
    color: BinaryColor,
    (width, height): (u16, u16),
) {
    for y in y0..y0 + scale {
        if y < 0 || y >= height as i32 {
            continue;
        }
        for x in x0..x0 + scale {
            if x < 0 || x >= width as i32 {
                continue;
            }
            sink.put_pixel(x as u16, y as u16, color);
        }
    }
}

/// Draws `text` left to right; `\n` returns to `origin.x` one cell lower.
/// Returns the pen position after the last glyph.
pub fn draw_str<S, G>(
    sink: &mut S,
    glyphs: &G,
    origin: Point,
    text: &str,
    fg: BinaryColor,
    bg: BinaryColor,
    scale: u8,
) -> Point
where
    S: PixelSink + ?Sized,
    G: GlyphSource + ?Sized,
{
    let (cell_w, cell_h) = glyphs.cell_size();
    let step_x = cell_w as i32 * scale.max(1) as i32;
    let step_y = cell_h as i32 * scale.max(1) as i32;

    let mut pen = origin;
    for ch in text.chars() {
        if ch == '\n' {
            pen = Point::new(origin.x, pen.y + step_y);
            continue;
        }
        draw_char(sink, glyphs, pen, ch, fg, bg, scale);
        pen.x += step_x;
    }
    pen
}
