// Refresh stages and their pixel encodings.
//
// Image data is 1 bit per pixel (1 = black). On the wire every pixel
// becomes a 2-bit drive code, and each stage maps black/white source
// pixels to a fixed pair of codes. A full update always runs the four
// stages in declaration order.

/// Drive a pixel toward black.
pub const DRIVE_BLACK: u8 = 0b11;
/// Drive a pixel toward white.
pub const DRIVE_WHITE: u8 = 0b10;
/// Leave a pixel alone for this pass.
pub const DRIVE_NOTHING: u8 = 0b01;

/// Raw line bytes with the same code in all four pairs.
pub const FILL_BLACK: u8 = 0xff;
pub const FILL_WHITE: u8 = 0xaa;
pub const FILL_NOTHING: u8 = 0x55;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Previous image: B -> W, W -> B
    Compensate,
    /// Previous image: B -> N, W -> W
    White,
    /// New image: B -> N, W -> B
    Inverse,
    /// New image: B -> B, W -> W
    Normal,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Compensate, Stage::White, Stage::Inverse, Stage::Normal];

    /// `(code for a black source pixel, code for a white source pixel)`
    pub const fn codes(self) -> (u8, u8) {
        match self {
            Stage::Compensate => (DRIVE_WHITE, DRIVE_BLACK),
            Stage::White => (DRIVE_NOTHING, DRIVE_WHITE),
            Stage::Inverse => (DRIVE_NOTHING, DRIVE_BLACK),
            Stage::Normal => (DRIVE_BLACK, DRIVE_WHITE),
        }
    }

    /// Compensate and White consume the image being replaced.
    pub const fn uses_previous_image(self) -> bool {
        matches!(self, Stage::Compensate | Stage::White)
    }
}

#[inline]
fn code(bit: u8, stage: Stage) -> u8 {
    let (black, white) = stage.codes();
    if bit & 1 != 0 { black } else { white }
}

/// Even pixels (bits 7, 5, 3, 1) of a source byte, each code kept in the
/// pair at the pixel's own position.
pub fn encode_even(byte: u8, stage: Stage) -> u8 {
    (0..4).fold(0, |out, k| out | code(byte >> (2 * k + 1), stage) << (2 * k))
}

/// Odd pixels (bits 0, 2, 4, 6); pair order is mirrored on the wire.
pub fn encode_odd(byte: u8, stage: Stage) -> u8 {
    (0..4).fold(0, |out, k| out | code(byte >> (2 * k), stage) << (2 * (3 - k)))
}

/// Scan byte `index` of the scan section for `row`. Rows outside the
/// panel select no gate at all (used by the power-off dummy line).
#[inline]
pub fn scan_byte(row: u16, index: u16) -> u8 {
    if row / 4 == index {
        0xc0 >> (2 * (row & 0x03))
    } else {
        0x00
    }
}
