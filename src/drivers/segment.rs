// Resident pixel storage for one horizontal segment of the canvas.
// The canvas is full panel height; only `segment_rows` rows are held at a
// time. Bytes are in the COG image layout: byte x/8 + row*row_bytes,
// pixel x at bit x&7, 1 = black, so a cleared (all-zero) buffer is white.
// Writes outside the selected segment are dropped, which is what lets
// drawing code address the whole canvas while one segment is resident.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use embedded_graphics_core::{
    Pixel,
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    pixelcolor::BinaryColor,
    primitives::Rectangle,
};

use crate::error::{ConfigError, Error};

/// Divides the height of every supported panel.
pub const DEFAULT_SEGMENT_ROWS: u16 = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompensationMode {
    /// No old image is kept; segments are driven from white, with an
    /// optional fixed-fill clear first.
    #[default]
    AlwaysClear,
    /// Keep a copy of the last displayed image and run a real old -> new
    /// transition. Only for an unsegmented canvas.
    DualBuffer,
}

pub struct SegmentBuffer {
    buf: Vec<u8>,
    old: Option<Vec<u8>>,
    width: u16,
    height: u16,
    segment_rows: u16,
    row_bytes: usize,
    segment: u16,
}

impl SegmentBuffer {
    pub fn new(
        width: u16,
        height: u16,
        segment_rows: u16,
        mode: CompensationMode,
    ) -> Result<Self, Error> {
        if width == 0 || width % 8 != 0 {
            return Err(ConfigError::Width { columns: width }.into());
        }
        if segment_rows == 0 || height == 0 || height % segment_rows != 0 {
            log::warn!(
                "[EPD] segment height {} does not divide canvas height {}",
                segment_rows,
                height
            );
            return Err(ConfigError::SegmentHeight {
                rows: height,
                segment_rows,
            }
            .into());
        }
        let segments = height / segment_rows;
        if mode == CompensationMode::DualBuffer && segments != 1 {
            return Err(ConfigError::DualBufferSegmented { segments }.into());
        }

        let row_bytes = (width / 8) as usize;
        let len = row_bytes * segment_rows as usize;
        let old = match mode {
            CompensationMode::DualBuffer => Some(vec![0; len]),
            CompensationMode::AlwaysClear => None,
        };

        Ok(Self {
            buf: vec![0; len],
            old,
            width,
            height,
            segment_rows,
            row_bytes,
            segment: 0,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    pub fn segment_rows(&self) -> u16 {
        self.segment_rows
    }

    pub fn segment_count(&self) -> u16 {
        self.height / self.segment_rows
    }

    pub fn segment(&self) -> u16 {
        self.segment
    }

    pub fn mode(&self) -> CompensationMode {
        if self.old.is_some() {
            CompensationMode::DualBuffer
        } else {
            CompensationMode::AlwaysClear
        }
    }

    /// Canvas rows held by the current segment.
    pub fn rows(&self) -> Range<u16> {
        let start = self.segment * self.segment_rows;
        start..start + self.segment_rows
    }

    /// Make `index` the resident segment. The buffer is cleared to white
    /// even when `index` is already selected.
    pub fn select_segment(&mut self, index: u16) -> Result<(), Error> {
        let count = self.segment_count();
        if index >= count {
            return Err(ConfigError::SegmentIndex { index, count }.into());
        }
        self.segment = index;
        self.clear();
        Ok(())
    }

    /// Full-canvas coordinates. Rows outside the current segment are
    /// silently dropped; anything off the canvas is rejected.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: BinaryColor) -> Result<(), Error> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return Err(Error::OutOfBoundsPixel { x, y });
        }
        self.put(x as u16, y as u16, color == BinaryColor::On);
        Ok(())
    }

    /// `None` when (x, y) is not backed by the resident segment.
    pub fn pixel(&self, x: u16, y: u16) -> Option<BinaryColor> {
        let rows = self.rows();
        if x >= self.width || !rows.contains(&y) {
            return None;
        }
        let local = (y - rows.start) as usize;
        let byte = self.buf[x as usize / 8 + local * self.row_bytes];
        if byte & (1 << (x & 7)) != 0 {
            Some(BinaryColor::On)
        } else {
            Some(BinaryColor::Off)
        }
    }

    /// White out the resident segment.
    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    /// White out the segment and the remembered old image, back to
    /// segment 0. Used after a full-panel clear.
    pub fn reset(&mut self) {
        self.segment = 0;
        self.buf.fill(0);
        if let Some(old) = self.old.as_mut() {
            old.fill(0);
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Last displayed image, in dual-buffer mode.
    pub fn old_data(&self) -> Option<&[u8]> {
        self.old.as_deref()
    }

    /// Both halves of a dual-buffer transition at once.
    pub fn transition(&self) -> (Option<&[u8]>, &[u8]) {
        (self.old.as_deref(), &self.buf)
    }

    /// Remember the resident image as what the panel now shows.
    pub fn commit(&mut self) {
        if let Some(old) = self.old.as_mut() {
            old.copy_from_slice(&self.buf);
        }
    }

    #[inline]
    fn put(&mut self, x: u16, y: u16, black: bool) {
        let rows = self.rows();
        if !rows.contains(&y) {
            return;
        }
        let local = (y - rows.start) as usize;
        let idx = x as usize / 8 + local * self.row_bytes;
        let mask = 1u8 << (x & 7);
        if black {
            self.buf[idx] |= mask;
        } else {
            self.buf[idx] &= !mask;
        }
    }

    // byte-aligned rect fill in canvas coords, clipped to the segment
    fn fill_rect(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, black: bool) {
        let rows = self.rows();
        let cy0 = y0.max(rows.start);
        let cy1 = y1.min(rows.end);
        let cx1 = x1.min(self.width);
        if x0 >= cx1 || cy0 >= cy1 {
            return;
        }

        let first_byte = x0 as usize / 8;
        let last_byte = (cx1 as usize - 1) / 8;
        let first_mask: u8 = 0xff << (x0 & 7);
        let last_mask: u8 = 0xff >> (7 - ((cx1 - 1) & 7));

        let (fill, edge_op): (u8, fn(&mut u8, u8)) = if black {
            (0xff, |b, m| *b |= m)
        } else {
            (0x00, |b, m| *b &= !m)
        };

        let rb = self.row_bytes;
        for y in cy0..cy1 {
            let row = (y - rows.start) as usize * rb;
            if first_byte == last_byte {
                edge_op(&mut self.buf[row + first_byte], first_mask & last_mask);
            } else {
                edge_op(&mut self.buf[row + first_byte], first_mask);
                self.buf[row + first_byte + 1..row + last_byte].fill(fill);
                edge_op(&mut self.buf[row + last_byte], last_mask);
            }
        }
    }
}

impl OriginDimensions for SegmentBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

// embedded-graphics drawing clips silently at the canvas edge
impl DrawTarget for SegmentBuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let w = self.width as i32;
        let h = self.height as i32;

        for Pixel(coord, color) in pixels {
            if coord.x < 0 || coord.x >= w || coord.y < 0 || coord.y >= h {
                continue;
            }
            self.put(coord.x as u16, coord.y as u16, color == BinaryColor::On);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let sw = self.width as i32;
        let sh = self.height as i32;

        let x0 = area.top_left.x.clamp(0, sw) as u16;
        let y0 = area.top_left.y.clamp(0, sh) as u16;
        let x1 = area
            .top_left
            .x
            .saturating_add(area.size.width as i32)
            .clamp(0, sw) as u16;
        let y1 = area
            .top_left
            .y
            .saturating_add(area.size.height as i32)
            .clamp(0, sh) as u16;
        if x0 >= x1 || y0 >= y1 {
            return Ok(());
        }

        self.fill_rect(x0, y0, x1, y1, color == BinaryColor::On);
        Ok(())
    }
}
