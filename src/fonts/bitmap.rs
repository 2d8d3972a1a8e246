// Column-major bitmap fonts (the classic 5x7 LCD layout).
//
// Each glyph is `width` bytes, one per column, bit 0 the top row. Tables
// stay in flash; nothing is copied. Cells get one blank column of spacing.

use super::GlyphSource;

pub struct ColumnFont {
    data: &'static [u8],
    first: u8,
    last: u8,
    width: u8,
    height: u8,
}

impl ColumnFont {
    /// `data` holds glyphs `first..=last` back to back; `height` is at
    /// most 8.
    pub const fn new(data: &'static [u8], first: u8, last: u8, width: u8, height: u8) -> Self {
        Self {
            data,
            first,
            last,
            width,
            height: if height > 8 { 8 } else { height },
        }
    }

    // column bytes of `ch`, None for unmapped characters or short tables
    fn glyph(&self, ch: char) -> Option<&'static [u8]> {
        let code = u32::from(ch);
        if code < self.first as u32 || code > self.last as u32 {
            return None;
        }
        let start = (code - self.first as u32) as usize * self.width as usize;
        self.data.get(start..start + self.width as usize)
    }
}

impl GlyphSource for ColumnFont {
    fn cell_size(&self) -> (u16, u16) {
        (self.width as u16 + 1, self.height as u16)
    }

    // unmapped characters draw as a blank cell
    fn glyph_pixel(&self, ch: char, col: u16, row: u16) -> bool {
        if row >= self.height as u16 {
            return false;
        }
        match self.glyph(ch) {
            Some(cols) => cols
                .get(col as usize)
                .is_some_and(|&bits| bits & (1 << row) != 0),
            None => false,
        }
    }
}
