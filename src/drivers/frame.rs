// Where a refresh gets its per-row pixel bytes from.
//
// Sources are borrowed for one refresh call only. A stage repeats whole
// frames until its time is used up, so every row may be requested many
// times; readers must return the same bytes each time.

/// Streams rows out of memory the CPU cannot index directly (serial
/// flash, EEPROM, a file). `address` is the byte offset of the row.
pub trait RowReader {
    fn read(&mut self, buf: &mut [u8], address: u32);
}

impl<F: FnMut(&mut [u8], u32)> RowReader for F {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        self(buf, address)
    }
}

pub enum FrameSource<'a> {
    /// Raw drive byte repeated across the line; bypasses stage encoding.
    Fixed(u8),
    /// 1bpp rows, first byte is the first row of the refresh range.
    Buffer(&'a [u8]),
    /// Rows fetched on demand starting at `address`; row addresses
    /// wrap past `u32::MAX`.
    Reader {
        address: u32,
        reader: &'a mut dyn RowReader,
    },
}

impl<'a> FrameSource<'a> {
    pub fn reader(address: u32, reader: &'a mut dyn RowReader) -> Self {
        FrameSource::Reader { address, reader }
    }
}

/// Constant image data that stays in flash; read row by row instead of
/// being copied into RAM.
#[derive(Clone, Copy)]
pub struct FlashImage {
    data: &'static [u8],
}

impl FlashImage {
    pub const fn new(data: &'static [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl RowReader for FlashImage {
    // bytes past the end read as white
    fn read(&mut self, buf: &mut [u8], address: u32) {
        let start = (address as usize).min(self.data.len());
        let avail = &self.data[start..];
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        buf[n..].fill(0x00);
    }
}

/// Half-resolution flash image shown at full size: every source pixel
/// covers a 2x2 block of panel pixels.
#[derive(Clone, Copy)]
pub struct Subsampled {
    data: &'static [u8],
    // bytes per full-size row, i.e. the address stride the driver uses
    row_bytes: usize,
}

impl Subsampled {
    pub const fn new(data: &'static [u8], row_bytes: usize) -> Self {
        Self { data, row_bytes }
    }

    /// Bytes per half-size source row.
    pub const fn source_row_bytes(row_bytes: usize) -> usize {
        // half the pixels of a full row, rounded up to whole bytes
        (row_bytes * 4).div_ceil(8)
    }

    /// Bytes a half-size image needs to cover `rows` panel rows.
    pub const fn source_len(row_bytes: usize, rows: usize) -> usize {
        Self::source_row_bytes(row_bytes) * rows.div_ceil(2)
    }
}

impl RowReader for Subsampled {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        buf.fill(0x00);
        if self.row_bytes == 0 {
            return;
        }
        let src_stride = Self::source_row_bytes(self.row_bytes);
        let row = address as usize / self.row_bytes;
        let base = (row / 2) * src_stride;

        for (i, out) in buf.iter_mut().enumerate() {
            // output byte i holds full-size pixels 8i..8i+8, i.e. source
            // pixels 4i..4i+4 each doubled
            let src_px = i * 4;
            let Some(&src) = self.data.get(base + src_px / 8) else {
                break;
            };
            let nibble = (src >> (src_px % 8)) & 0x0f;
            *out = (0..4).fold(0u8, |acc, k| {
                if nibble & (1 << k) != 0 {
                    acc | (0b11 << (2 * k))
                } else {
                    acc
                }
            });
        }
    }
}
