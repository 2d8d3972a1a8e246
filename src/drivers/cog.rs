// COG e-paper driver (1.44", 2.0", 2.7" panels).
// No framebuffer: every line is built on the fly from a FrameSource.
// An update is four timed stages (compensate, white, inverse, normal);
// each stage re-sends whole frames until its temperature-scaled time is
// used up. BUSY is polled after every byte of a line.

use core::ops::Range;

use log::{debug, info, warn};

use super::frame::FrameSource;
use super::interface::{EpdInterface, Pin};
use super::panel::{MAX_BYTES_PER_ROW, PanelGeometry, PanelSize};
use super::stopwatch::Stopwatch;
use super::temperature::{ROOM_TEMPERATURE, factored_duration_ms};
use super::waveform::{self, FILL_BLACK, FILL_NOTHING, FILL_WHITE, Stage};
use crate::error::{ConfigError, Error};

// every SPI frame starts with one of these
const HEADER_INDEX: u8 = 0x70;
const HEADER_DATA: u8 = 0x72;

// COG registers
mod reg {
    pub const CHANNEL_SELECT: u8 = 0x01;
    pub const OUTPUT_ENABLE: u8 = 0x02;
    pub const LATCH: u8 = 0x03;
    pub const VOLTAGE: u8 = 0x04; // gate/source levels; discharge steps
    pub const CHARGE_PUMP: u8 = 0x05;
    pub const DCDC_FREQUENCY: u8 = 0x06;
    pub const OSCILLATOR: u8 = 0x07;
    pub const ADC: u8 = 0x08;
    pub const VCOM: u8 = 0x09;
    pub const PIXEL_DATA: u8 = 0x0a;
}

/// Bound on BUSY after a single pixel byte.
pub const BYTE_BUSY_TIMEOUT_MS: u64 = 50;
/// Bound on the COG coming out of reset.
pub const COG_READY_TIMEOUT_MS: u64 = 1000;

// past the last gate: the scan section selects nothing
const DUMMY_ROW: u16 = 0x7fff;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    Off,
    /// Panel supply is on but the COG never reported ready.
    Starting,
    On,
}

#[derive(Clone, Copy)]
enum LineData<'a> {
    Fixed(u8),
    Pixels(&'a [u8]),
}

pub struct Epd<I> {
    iface: I,
    size: PanelSize,
    geometry: &'static PanelGeometry,
    temperature: i16,
    factored_stage_ms: u32,
    power: PowerState,
}

impl<I: EpdInterface> Epd<I> {
    pub fn new(size: PanelSize, iface: I) -> Self {
        let geometry = size.geometry();
        Self {
            iface,
            size,
            geometry,
            temperature: ROOM_TEMPERATURE,
            factored_stage_ms: geometry.stage_time_ms,
            power: PowerState::Off,
        }
    }

    pub fn size(&self) -> PanelSize {
        self.size
    }

    pub fn geometry(&self) -> &'static PanelGeometry {
        self.geometry
    }

    pub fn full_range(&self) -> Range<u16> {
        0..self.geometry.rows
    }

    pub fn power_state(&self) -> PowerState {
        self.power
    }

    pub fn is_powered(&self) -> bool {
        self.power == PowerState::On
    }

    pub fn temperature(&self) -> i16 {
        self.temperature
    }

    /// Current per-stage duration.
    pub fn factored_stage_ms(&self) -> u32 {
        self.factored_stage_ms
    }

    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.iface
    }

    pub fn release(self) -> I {
        self.iface
    }

    /// Rescale stage time for the given ambient temperature. Takes effect
    /// from the next stage; a running stage keeps its duration.
    pub fn set_temperature(&mut self, celsius: i16) {
        self.temperature = celsius;
        self.factored_stage_ms = factored_duration_ms(self.geometry.stage_time_ms, celsius);
    }

    // ── Power sequencing ────────────────────────────────────

    pub fn power_on(&mut self) -> Result<(), Error> {
        if self.power != PowerState::Off {
            return Err(Error::AlreadyPowered);
        }
        info!("[EPD] power on ({:?})", self.size);

        self.iface.write(&[0x00]);
        for pin in [
            Pin::Reset,
            Pin::PanelOn,
            Pin::Discharge,
            Pin::Border,
            Pin::ChipSelect,
        ] {
            self.iface.set_pin(pin, false);
        }

        self.iface.set_pwm(true);
        self.iface.delay_ms(5);
        self.iface.set_pin(Pin::PanelOn, true);
        self.power = PowerState::Starting;
        self.iface.delay_ms(10);

        self.iface.set_pin(Pin::Reset, true);
        self.iface.set_pin(Pin::Border, true);
        self.iface.set_pin(Pin::ChipSelect, true);
        self.iface.delay_ms(5);

        self.iface.set_pin(Pin::Reset, false);
        self.iface.delay_ms(5);
        self.iface.set_pin(Pin::Reset, true);
        self.iface.delay_ms(5);

        if let Err(e) = self.wait_ready(COG_READY_TIMEOUT_MS) {
            warn!("[EPD] COG not ready after reset");
            return Err(e);
        }

        let g = self.geometry;

        self.iface.delay_us(10);
        self.send(&[HEADER_INDEX, reg::CHANNEL_SELECT]);
        self.iface.delay_us(10);
        self.send_data(g.channel_select);

        self.write_register(reg::DCDC_FREQUENCY, &[0xff]);
        // high power mode oscillator
        self.write_register(reg::OSCILLATOR, &[0x9d]);
        self.write_register(reg::ADC, &[0x00]);
        self.write_register(reg::VCOM, &[0xd0, 0x00]);
        self.write_register(reg::VOLTAGE, g.gate_source);
        self.iface.delay_ms(5);

        // pulse the driver latch
        self.write_register(reg::LATCH, &[0x01]);
        self.write_register(reg::LATCH, &[0x00]);
        self.iface.delay_ms(5);

        // positive pump needs the PWM clock; negative pump and Vcom don't
        self.write_register(reg::CHARGE_PUMP, &[0x01]);
        self.iface.delay_ms(30);
        self.iface.set_pwm(false);

        self.write_register(reg::CHARGE_PUMP, &[0x03]);
        self.iface.delay_ms(30);

        self.write_register(reg::CHARGE_PUMP, &[0x0f]);
        self.iface.delay_ms(30);

        self.write_register(reg::OUTPUT_ENABLE, &[0x24]);

        self.power = PowerState::On;
        Ok(())
    }

    /// Safe to call in any state; a no-op when already off. The electrical
    /// teardown always completes, and a dummy-frame failure is returned
    /// afterwards.
    pub fn power_off(&mut self) -> Result<(), Error> {
        let state = self.power;
        if state == PowerState::Off {
            return Ok(());
        }
        info!("[EPD] power off");

        let flushed = if state == PowerState::On {
            self.dummy_frame()
        } else {
            Ok(())
        };
        if flushed.is_err() {
            warn!("[EPD] dummy frame failed, discharging anyway");
        }

        self.discharge();
        self.power = PowerState::Off;
        flushed
    }

    fn dummy_frame(&mut self) -> Result<(), Error> {
        let full = self.full_range();
        self.frame(&mut FrameSource::Fixed(FILL_NOTHING), Stage::Normal, full)?;

        if self.size == PanelSize::Epd1in44 {
            self.line(DUMMY_ROW, LineData::Fixed(FILL_WHITE), Stage::Normal)?;
            self.iface.delay_ms(250);
        } else {
            self.line(DUMMY_ROW, LineData::Fixed(FILL_NOTHING), Stage::Normal)?;
            self.iface.delay_ms(25);
            self.iface.set_pin(Pin::Border, false);
            self.iface.delay_ms(250);
            self.iface.set_pin(Pin::Border, true);
        }
        Ok(())
    }

    fn discharge(&mut self) {
        self.iface.set_pwm(false);

        // latch reset, output off, Vcom off, negative pump off
        self.write_register(reg::LATCH, &[0x01]);
        self.write_register(reg::OUTPUT_ENABLE, &[0x05]);
        self.write_register(reg::CHARGE_PUMP, &[0x0e]);
        self.write_register(reg::CHARGE_PUMP, &[0x02]);

        self.write_register(reg::VOLTAGE, &[0x0c]);
        self.iface.delay_ms(120);

        self.write_register(reg::CHARGE_PUMP, &[0x00]);
        self.write_register(reg::OSCILLATOR, &[0x0d]);

        // internal discharge in three steps
        self.write_register(reg::VOLTAGE, &[0x50]);
        self.iface.delay_ms(40);
        self.write_register(reg::VOLTAGE, &[0xa0]);
        self.iface.delay_ms(40);
        self.write_register(reg::VOLTAGE, &[0x00]);

        self.iface.set_pin(Pin::Reset, false);
        self.iface.set_pin(Pin::PanelOn, false);
        self.iface.set_pin(Pin::Border, false);
        self.iface.set_pin(Pin::ChipSelect, false);

        self.iface.set_pin(Pin::Discharge, true);
        self.iface.delay_ms(150);
        self.iface.set_pin(Pin::Discharge, false);
    }

    // ── Stage primitives ────────────────────────────────────

    /// One pass over `rows` with `stage`'s encoding.
    pub fn refresh_once(
        &mut self,
        source: &mut FrameSource<'_>,
        stage: Stage,
        rows: Range<u16>,
    ) -> Result<(), Error> {
        self.check_request(source, &rows)?;
        self.frame(source, stage, rows)
    }

    /// Repeats `refresh_once` until the factored stage time has elapsed.
    /// Returns the number of frames driven (always at least one).
    pub fn refresh_repeat(
        &mut self,
        source: &mut FrameSource<'_>,
        stage: Stage,
        rows: Range<u16>,
    ) -> Result<u32, Error> {
        self.check_request(source, &rows)?;

        let budget = self.factored_stage_ms as u64;
        let mut watch = Stopwatch::new();
        loop {
            watch.start(self.iface.now_ms());
            self.frame(source, stage, rows.clone())?;
            watch.stop(self.iface.now_ms());
            if watch.elapsed_ms() >= budget {
                break;
            }
        }

        debug!(
            "[EPD] {:?} rows {}..{}: {} frames in {} ms (avg {} ms, budget {} ms)",
            stage,
            rows.start,
            rows.end,
            watch.events(),
            watch.elapsed_ms(),
            watch.average_ms(),
            budget
        );
        Ok(watch.events())
    }

    // ── Compositions ────────────────────────────────────────

    /// Anything -> white: flash black, then drive white.
    pub fn clear(&mut self, rows: Range<u16>) -> Result<(), Error> {
        for (stage, fill) in [
            (Stage::Compensate, FILL_BLACK),
            (Stage::White, FILL_BLACK),
            (Stage::Inverse, FILL_WHITE),
            (Stage::Normal, FILL_WHITE),
        ] {
            self.refresh_repeat(&mut FrameSource::Fixed(fill), stage, rows.clone())?;
        }
        Ok(())
    }

    /// Full old -> new transition. Without `old` the panel is assumed
    /// white and the erase stages just drive white.
    pub fn show_image(
        &mut self,
        old: Option<&mut FrameSource<'_>>,
        new: &mut FrameSource<'_>,
        rows: Range<u16>,
    ) -> Result<(), Error> {
        let mut blank = FrameSource::Fixed(FILL_WHITE);
        let old = old.unwrap_or(&mut blank);

        for stage in Stage::ALL {
            if stage.uses_previous_image() {
                self.refresh_repeat(old, stage, rows.clone())?;
            } else {
                self.refresh_repeat(new, stage, rows.clone())?;
            }
        }
        Ok(())
    }

    /// A single frame of one stage of an old -> new transition; the caller
    /// owns repetition and timing.
    pub fn show_stage(
        &mut self,
        old: Option<&mut FrameSource<'_>>,
        new: &mut FrameSource<'_>,
        stage: Stage,
        rows: Range<u16>,
    ) -> Result<(), Error> {
        if stage.uses_previous_image() {
            let mut blank = FrameSource::Fixed(FILL_WHITE);
            self.refresh_once(old.unwrap_or(&mut blank), stage, rows)
        } else {
            self.refresh_once(new, stage, rows)
        }
    }

    // ── Validation ──────────────────────────────────────────

    fn check_request(&self, source: &FrameSource<'_>, rows: &Range<u16>) -> Result<(), Error> {
        if self.power != PowerState::On {
            return Err(Error::NotPowered);
        }

        if rows.start >= rows.end || rows.end > self.geometry.rows {
            warn!(
                "[EPD] rejected row range {}..{} (panel has {} rows)",
                rows.start, rows.end, self.geometry.rows
            );
            return Err(ConfigError::RowRange {
                start: rows.start,
                end: rows.end,
                rows: self.geometry.rows,
            }
            .into());
        }

        if let FrameSource::Buffer(data) = source {
            let needed = (rows.end - rows.start) as usize * self.geometry.row_bytes();
            if data.len() < needed {
                return Err(ConfigError::SourceLength {
                    needed,
                    len: data.len(),
                }
                .into());
            }
        }
        Ok(())
    }

    // ── Line protocol ───────────────────────────────────────

    fn frame(
        &mut self,
        source: &mut FrameSource<'_>,
        stage: Stage,
        rows: Range<u16>,
    ) -> Result<(), Error> {
        let row_bytes = self.geometry.row_bytes();
        let mut row_buf = [0u8; MAX_BYTES_PER_ROW];
        let first = rows.start;

        for row in rows {
            let offset = (row - first) as usize * row_bytes;
            let data = match source {
                FrameSource::Fixed(value) => LineData::Fixed(*value),
                FrameSource::Buffer(buf) => LineData::Pixels(&buf[offset..offset + row_bytes]),
                FrameSource::Reader { address, reader } => {
                    let at = address.wrapping_add(offset as u32);
                    reader.read(&mut row_buf[..row_bytes], at);
                    LineData::Pixels(&row_buf[..row_bytes])
                }
            };
            self.line(row, data, stage)?;
        }
        Ok(())
    }

    fn line(&mut self, row: u16, data: LineData<'_>, stage: Stage) -> Result<(), Error> {
        // charge pump voltage levels
        self.iface.delay_us(10);
        self.send(&[HEADER_INDEX, reg::VOLTAGE]);
        self.iface.delay_us(10);
        self.send_data(self.geometry.gate_source);

        self.iface.delay_us(10);
        self.send(&[HEADER_INDEX, reg::PIXEL_DATA]);
        self.iface.delay_us(10);

        self.iface.set_pin(Pin::ChipSelect, false);
        let streamed = self.stream_line(row, data, stage);
        self.iface.set_pin(Pin::ChipSelect, true);
        if let Err(e) = streamed {
            warn!("[EPD] BUSY stuck on row {}", row);
            return Err(e);
        }

        // output the line to the panel
        self.iface.delay_us(10);
        self.send(&[HEADER_INDEX, reg::OUTPUT_ENABLE]);
        self.iface.delay_us(10);
        self.send(&[HEADER_DATA, 0x2f]);
        Ok(())
    }

    // header, even pixels (last byte first), scan, odd pixels, filler
    fn stream_line(&mut self, row: u16, data: LineData<'_>, stage: Stage) -> Result<(), Error> {
        let g = self.geometry;
        self.put_wait(HEADER_DATA)?;

        for b in (0..g.row_bytes()).rev() {
            let byte = match data {
                LineData::Fixed(value) => value,
                LineData::Pixels(px) => waveform::encode_even(px[b], stage),
            };
            self.put_wait(byte)?;
        }

        for b in 0..g.bytes_per_scan {
            self.put_wait(waveform::scan_byte(row, b))?;
        }

        for b in 0..g.row_bytes() {
            let byte = match data {
                LineData::Fixed(value) => value,
                LineData::Pixels(px) => waveform::encode_odd(px[b], stage),
            };
            self.put_wait(byte)?;
        }

        if g.filler {
            self.put_wait(0x00)?;
        }
        Ok(())
    }

    // ── Low-level SPI / busy ────────────────────────────────

    fn put_wait(&mut self, byte: u8) -> Result<(), Error> {
        self.iface.write(&[byte]);
        self.wait_ready(BYTE_BUSY_TIMEOUT_MS)
    }

    fn wait_ready(&mut self, timeout_ms: u64) -> Result<(), Error> {
        let deadline = self.iface.now_ms() + timeout_ms;
        while self.iface.is_busy() {
            if self.iface.now_ms() >= deadline {
                return Err(Error::DeviceTimeout);
            }
        }
        Ok(())
    }

    // one CS-framed transfer
    fn send(&mut self, bytes: &[u8]) {
        self.iface.set_pin(Pin::ChipSelect, false);
        self.iface.write(bytes);
        self.iface.set_pin(Pin::ChipSelect, true);
    }

    fn send_data(&mut self, data: &[u8]) {
        self.iface.set_pin(Pin::ChipSelect, false);
        self.iface.write(&[HEADER_DATA]);
        self.iface.write(data);
        self.iface.set_pin(Pin::ChipSelect, true);
    }

    fn write_register(&mut self, index: u8, data: &[u8]) {
        self.send(&[HEADER_INDEX, index]);
        self.send_data(data);
    }
}
