// Per-model constants for the COG (chip-on-glass) panels.
// Rows are gate lines, columns are source dots; 1 bit per pixel in
// image data, 2 bits per pixel on the wire.

/// Largest `bytes_per_row` of any supported panel (2.7": 264 / 8).
pub const MAX_BYTES_PER_ROW: usize = 33;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelSize {
    /// 1.44", 128 x 96
    Epd1in44,
    /// 2.0", 200 x 96
    Epd2in0,
    /// 2.7", 264 x 176
    Epd2in7,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PanelGeometry {
    pub rows: u16,
    pub columns: u16,
    pub bytes_per_row: u16,
    /// One 2-bit scan code per row, so rows / 4 bytes.
    pub bytes_per_scan: u16,
    /// Base duration of one refresh stage at room temperature.
    pub stage_time_ms: u32,
    /// Payload of the gate/source voltage register.
    pub gate_source: &'static [u8],
    /// Payload of the channel select register.
    pub channel_select: &'static [u8],
    /// Trailing 0x00 after every line.
    pub filler: bool,
}

static EPD_1IN44: PanelGeometry = PanelGeometry {
    rows: 96,
    columns: 128,
    bytes_per_row: 128 / 8,
    bytes_per_scan: 96 / 4,
    stage_time_ms: 480,
    gate_source: &[0x03],
    channel_select: &[0x00, 0x00, 0x00, 0x00, 0x00, 0x0f, 0xff, 0x00],
    filler: false,
};

static EPD_2IN0: PanelGeometry = PanelGeometry {
    rows: 96,
    columns: 200,
    bytes_per_row: 200 / 8,
    bytes_per_scan: 96 / 4,
    stage_time_ms: 480,
    gate_source: &[0x03],
    channel_select: &[0x00, 0x00, 0x00, 0x00, 0x01, 0xff, 0xe0, 0x00],
    filler: true,
};

static EPD_2IN7: PanelGeometry = PanelGeometry {
    rows: 176,
    columns: 264,
    bytes_per_row: 264 / 8,
    bytes_per_scan: 176 / 4,
    stage_time_ms: 630,
    gate_source: &[0x00],
    channel_select: &[0x00, 0x00, 0x00, 0x7f, 0xff, 0xfe, 0x00, 0x00],
    filler: true,
};

impl PanelSize {
    pub const ALL: [PanelSize; 3] = [PanelSize::Epd1in44, PanelSize::Epd2in0, PanelSize::Epd2in7];

    pub fn geometry(self) -> &'static PanelGeometry {
        match self {
            PanelSize::Epd1in44 => &EPD_1IN44,
            PanelSize::Epd2in0 => &EPD_2IN0,
            PanelSize::Epd2in7 => &EPD_2IN7,
        }
    }
}

impl PanelGeometry {
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.bytes_per_row as usize
    }

    /// Bytes of a full-panel 1bpp image.
    pub fn frame_bytes(&self) -> usize {
        self.row_bytes() * self.rows as usize
    }
}
