// embedded-graphics MonoFont as a glyph source, so the stock ASCII and
// Latin-1 fonts render through draw_char with scaling and segment skip.

use embedded_graphics::geometry::{OriginDimensions, Point};
use embedded_graphics::image::GetPixel;
use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::pixelcolor::BinaryColor;

use super::GlyphSource;

pub struct MonoGlyphs<'a> {
    font: &'a MonoFont<'a>,
}

impl<'a> MonoGlyphs<'a> {
    pub const fn new(font: &'a MonoFont<'a>) -> Self {
        Self { font }
    }

    // top-left of `ch` inside the font's glyph sheet
    fn sheet_origin(&self, ch: char) -> Option<Point> {
        let glyph_w = self.font.character_size.width;
        let glyph_h = self.font.character_size.height;
        let per_row = self.font.image.size().width / glyph_w.max(1);
        if per_row == 0 {
            return None;
        }
        let index = self.font.glyph_mapping.index(ch) as u32;
        let row = index / per_row;
        let col = index % per_row;
        Some(Point::new((col * glyph_w) as i32, (row * glyph_h) as i32))
    }
}

impl GlyphSource for MonoGlyphs<'_> {
    fn cell_size(&self) -> (u16, u16) {
        let size = self.font.character_size;
        (
            (size.width + self.font.character_spacing) as u16,
            size.height as u16,
        )
    }

    fn glyph_pixel(&self, ch: char, col: u16, row: u16) -> bool {
        let size = self.font.character_size;
        if col as u32 >= size.width || row as u32 >= size.height {
            return false;
        }
        let Some(origin) = self.sheet_origin(ch) else {
            return false;
        };
        let p = origin + Point::new(col as i32, row as i32);
        self.font.image.pixel(p) == Some(BinaryColor::On)
    }
}
