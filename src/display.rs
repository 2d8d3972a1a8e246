// Segmented framebuffer display on top of the COG driver.
//
// Drawing code addresses the whole canvas; one segment is resident and
// `display` pushes it to that segment's rows. A full-canvas update walks
// the segments in order, normally inside one powered session:
//
//   select_segment(0), draw, display(.., true, false)
//   select_segment(1), draw, display(.., false, false)
//   ...
//   select_segment(n-1), draw, display(.., false, true)
//
// `render` does exactly that with a draw callback.

use embedded_graphics_core::geometry::Point;
use embedded_graphics_core::pixelcolor::BinaryColor;
use log::{debug, info, warn};

use crate::drivers::cog::Epd;
use crate::drivers::frame::{FlashImage, FrameSource, Subsampled};
use crate::drivers::interface::EpdInterface;
use crate::drivers::segment::{CompensationMode, SegmentBuffer};
use crate::drivers::temperature::{NoSensor, TemperatureSensor, TemperatureSource};
use crate::error::{ConfigError, Error};
use crate::fonts::{self, GlyphSource};

pub struct SegmentedDisplay<I, S = NoSensor> {
    epd: Epd<I>,
    buffer: SegmentBuffer,
    temperature: TemperatureSource<S>,
}

impl<I: EpdInterface, S: TemperatureSensor> SegmentedDisplay<I, S> {
    pub fn new(
        epd: Epd<I>,
        temperature: TemperatureSource<S>,
        segment_rows: u16,
        mode: CompensationMode,
    ) -> Result<Self, Error> {
        let g = epd.geometry();
        let buffer = SegmentBuffer::new(g.columns, g.rows, segment_rows, mode)?;
        info!(
            "[EPD] {:?}: {} segments of {} rows, {:?}",
            epd.size(),
            buffer.segment_count(),
            segment_rows,
            mode
        );
        Ok(Self {
            epd,
            buffer,
            temperature,
        })
    }

    /// Erase the panel to a known white state before first use.
    pub fn begin(&mut self) -> Result<(), Error> {
        self.clear()
    }

    pub fn width(&self) -> u16 {
        self.buffer.width()
    }

    pub fn height(&self) -> u16 {
        self.buffer.height()
    }

    pub fn segment_count(&self) -> u16 {
        self.buffer.segment_count()
    }

    pub fn segment(&self) -> u16 {
        self.buffer.segment()
    }

    pub fn buffer(&self) -> &SegmentBuffer {
        &self.buffer
    }

    /// The resident segment as an embedded-graphics draw target.
    pub fn buffer_mut(&mut self) -> &mut SegmentBuffer {
        &mut self.buffer
    }

    pub fn epd(&self) -> &Epd<I> {
        &self.epd
    }

    pub fn epd_mut(&mut self) -> &mut Epd<I> {
        &mut self.epd
    }

    pub fn release(self) -> (Epd<I>, TemperatureSource<S>) {
        (self.epd, self.temperature)
    }

    /// Sample the temperature source and rescale stage timing.
    pub fn update_temperature(&mut self) -> i16 {
        let celsius = self.temperature.read();
        self.epd.set_temperature(celsius);
        debug!(
            "[EPD] {} C -> {} ms per stage",
            celsius,
            self.epd.factored_stage_ms()
        );
        celsius
    }

    // ── Drawing ─────────────────────────────────────────────

    pub fn select_segment(&mut self, index: u16) -> Result<(), Error> {
        self.buffer.select_segment(index)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: BinaryColor) -> Result<(), Error> {
        self.buffer.set_pixel(x, y, color)
    }

    pub fn draw_char<G: GlyphSource + ?Sized>(
        &mut self,
        glyphs: &G,
        origin: Point,
        ch: char,
        fg: BinaryColor,
        bg: BinaryColor,
        scale: u8,
    ) {
        fonts::draw_char(&mut self.buffer, glyphs, origin, ch, fg, bg, scale);
    }

    pub fn draw_str<G: GlyphSource + ?Sized>(
        &mut self,
        glyphs: &G,
        origin: Point,
        text: &str,
        fg: BinaryColor,
        bg: BinaryColor,
        scale: u8,
    ) -> Point {
        fonts::draw_str(&mut self.buffer, glyphs, origin, text, fg, bg, scale)
    }

    // ── Panel updates ───────────────────────────────────────

    /// Push the resident segment to its rows. Without an old image the
    /// rows are optionally cleared first and then driven from white; in
    /// dual-buffer mode a compensated old -> new transition is used and
    /// `clear_first` is ignored. With `power_off` set the panel is
    /// powered down even when the update fails. Asking for `power_on`
    /// while a session is already open is `AlreadyPowered` and leaves
    /// that session untouched.
    pub fn display(
        &mut self,
        clear_first: bool,
        power_on: bool,
        power_off: bool,
    ) -> Result<(), Error> {
        if power_on {
            self.update_temperature();
        }
        let rows = self.buffer.rows();
        debug!(
            "[EPD] segment {} rows {}..{}",
            self.buffer.segment(),
            rows.start,
            rows.end
        );

        let result = self.session(power_on, power_off, |epd, buffer| {
            let (old, new) = buffer.transition();
            match old {
                Some(old) => epd.show_image(
                    Some(&mut FrameSource::Buffer(old)),
                    &mut FrameSource::Buffer(new),
                    rows,
                ),
                None => {
                    if clear_first {
                        epd.clear(rows.clone())?;
                    }
                    epd.show_image(None, &mut FrameSource::Buffer(new), rows)
                }
            }
        });

        if result.is_ok() {
            self.buffer.commit();
        }
        result
    }

    /// Draw and display every segment in order within one powered
    /// session. Once powered on here, the panel is always powered off
    /// afterwards.
    pub fn render<F>(&mut self, clear_first: bool, mut draw: F) -> Result<(), Error>
    where
        F: FnMut(&mut SegmentBuffer),
    {
        self.update_temperature();
        info!("[EPD] render {} segments", self.buffer.segment_count());

        self.open()?;
        let result = self.render_segments(clear_first, &mut draw);
        let off = self.epd.power_off();
        result.and(off)
    }

    fn render_segments<F>(&mut self, clear_first: bool, draw: &mut F) -> Result<(), Error>
    where
        F: FnMut(&mut SegmentBuffer),
    {
        for index in 0..self.buffer.segment_count() {
            self.buffer.select_segment(index)?;
            draw(&mut self.buffer);
            self.display(clear_first, false, false)?;
        }
        Ok(())
    }

    /// Erase the whole panel, whatever the segment holds, in its own
    /// powered session. Forgets the resident and remembered images once
    /// the erase has completed.
    pub fn clear(&mut self) -> Result<(), Error> {
        info!("[EPD] clear");
        self.update_temperature();
        self.session(true, true, |epd, _| {
            let full = epd.full_range();
            epd.clear(full)
        })?;
        self.buffer.reset();
        Ok(())
    }

    /// Show a full-panel bitmap straight from flash without going through
    /// the segment buffer. A `subsampled` image is half size in both
    /// directions and gets every pixel doubled.
    pub fn show_bitmap(&mut self, image: &'static [u8], subsampled: bool) -> Result<(), Error> {
        let g = self.epd.geometry();
        let row_bytes = g.row_bytes();
        let needed = if subsampled {
            Subsampled::source_len(row_bytes, g.rows as usize)
        } else {
            g.frame_bytes()
        };
        if image.len() < needed {
            return Err(ConfigError::SourceLength {
                needed,
                len: image.len(),
            }
            .into());
        }

        info!(
            "[EPD] bitmap {} bytes{}",
            image.len(),
            if subsampled { " (2x)" } else { "" }
        );
        self.update_temperature();

        self.session(true, true, |epd, _| {
            let full = epd.full_range();
            epd.clear(full.clone())?;
            if subsampled {
                let mut half = Subsampled::new(image, row_bytes);
                epd.show_image(None, &mut FrameSource::reader(0, &mut half), full)
            } else {
                let mut flash = FlashImage::new(image);
                epd.show_image(None, &mut FrameSource::reader(0, &mut flash), full)
            }
        })?;

        // the panel no longer shows what the buffer remembers
        self.buffer.reset();
        Ok(())
    }

    // Optional power bracketing. Once the panel is on, a requested
    // power-off happens whatever `f` returns.
    fn session<F>(&mut self, power_on: bool, power_off: bool, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Epd<I>, &SegmentBuffer) -> Result<(), Error>,
    {
        if power_on {
            self.open()?;
        }
        let result = f(&mut self.epd, &self.buffer);

        if power_off {
            let off = self.epd.power_off();
            return result.and(off);
        }
        result
    }

    // Power on for a session. A start that fails part-way is torn down;
    // a session the caller already opened is left running.
    fn open(&mut self) -> Result<(), Error> {
        match self.epd.power_on() {
            Err(Error::AlreadyPowered) => {
                warn!("[EPD] panel already powered, leaving its session open");
                Err(Error::AlreadyPowered)
            }
            Err(e) => {
                let _ = self.epd.power_off();
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }
}
