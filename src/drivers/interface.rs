// Hardware seam for the COG driver.
//
// `Epd` only needs to push bytes, flip control lines, poll BUSY, sleep
// and read a millisecond clock. `Interface` provides that over
// embedded-hal; tests substitute a recording fake.
//
// Chip-select is driven by hand rather than through `SpiDevice`: pixel
// data goes out one byte at a time with BUSY polled between bytes while
// CS stays asserted for the whole line. Every write is flushed before it
// returns, so BUSY is never sampled ahead of the byte it answers.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal::spi::SpiBus;

/// Output roles on the panel connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pin {
    ChipSelect,
    PanelOn,
    Border,
    Discharge,
    Reset,
}

/// What the driver needs from the board. All operations are infallible
/// here; a broken transport shows up as BUSY never clearing.
pub trait EpdInterface {
    /// Returns once `bytes` have been clocked out.
    fn write(&mut self, bytes: &[u8]);
    fn set_pin(&mut self, pin: Pin, high: bool);
    /// Charge-pump clock on the PWM pin.
    fn set_pwm(&mut self, on: bool);
    fn is_busy(&mut self) -> bool;
    fn delay_ms(&mut self, ms: u32);
    fn delay_us(&mut self, us: u32);
    /// Monotonic milliseconds. Must advance while BUSY is polled or the
    /// busy timeouts never fire.
    fn now_ms(&mut self) -> u64;
}

impl<T: EpdInterface + ?Sized> EpdInterface for &mut T {
    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes)
    }
    fn set_pin(&mut self, pin: Pin, high: bool) {
        (**self).set_pin(pin, high)
    }
    fn set_pwm(&mut self, on: bool) {
        (**self).set_pwm(on)
    }
    fn is_busy(&mut self) -> bool {
        (**self).is_busy()
    }
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
    fn now_ms(&mut self) -> u64 {
        (**self).now_ms()
    }
}

/// Millisecond time source, e.g. `|| Instant::now().duration_since_epoch().as_millis()`.
///
/// Must be monotonic and keep advancing while the driver spins on BUSY:
/// every busy timeout is measured against it, so a clock that stands
/// still turns a stuck BUSY line into an endless loop.
pub trait Clock {
    fn now_ms(&mut self) -> u64;
}

impl<F: FnMut() -> u64> Clock for F {
    fn now_ms(&mut self) -> u64 {
        self()
    }
}

/// GPIO side of the connector.
pub trait PinBank {
    fn set(&mut self, pin: Pin, high: bool);
    fn busy(&mut self) -> bool;
    fn pwm(&mut self, on: bool);
}

/// One embedded-hal pin per connector role.
pub struct ControlPins<CS, ON, BORDER, DISCHARGE, RST, BUSY, PWM> {
    pub cs: CS,
    pub panel_on: ON,
    pub border: BORDER,
    pub discharge: DISCHARGE,
    pub reset: RST,
    pub busy: BUSY,
    pub pwm: PWM,
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) {
    let _ = if high { pin.set_high() } else { pin.set_low() };
}

impl<CS, ON, BORDER, DISCHARGE, RST, BUSY, PWM> PinBank
    for ControlPins<CS, ON, BORDER, DISCHARGE, RST, BUSY, PWM>
where
    CS: OutputPin,
    ON: OutputPin,
    BORDER: OutputPin,
    DISCHARGE: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    PWM: SetDutyCycle,
{
    fn set(&mut self, pin: Pin, high: bool) {
        match pin {
            Pin::ChipSelect => drive(&mut self.cs, high),
            Pin::PanelOn => drive(&mut self.panel_on, high),
            Pin::Border => drive(&mut self.border, high),
            Pin::Discharge => drive(&mut self.discharge, high),
            Pin::Reset => drive(&mut self.reset, high),
        }
    }

    // a pin read error counts as busy so the poll bound trips
    fn busy(&mut self) -> bool {
        self.busy.is_high().unwrap_or(true)
    }

    fn pwm(&mut self, on: bool) {
        let _ = if on {
            self.pwm.set_duty_cycle_percent(50)
        } else {
            self.pwm.set_duty_cycle_fully_off()
        };
    }
}

pub struct Interface<SPI, PINS, DELAY, CLK> {
    spi: SPI,
    pins: PINS,
    delay: DELAY,
    clock: CLK,
}

impl<SPI, PINS, DELAY, CLK> Interface<SPI, PINS, DELAY, CLK>
where
    SPI: SpiBus,
    PINS: PinBank,
    DELAY: DelayNs,
    CLK: Clock,
{
    pub fn new(spi: SPI, pins: PINS, delay: DELAY, clock: CLK) -> Self {
        Self {
            spi,
            pins,
            delay,
            clock,
        }
    }

    pub fn release(self) -> (SPI, PINS, DELAY, CLK) {
        (self.spi, self.pins, self.delay, self.clock)
    }
}

impl<SPI, PINS, DELAY, CLK> EpdInterface for Interface<SPI, PINS, DELAY, CLK>
where
    SPI: SpiBus,
    PINS: PinBank,
    DELAY: DelayNs,
    CLK: Clock,
{
    // BUSY is sampled right after a write, so the bytes must be on the
    // wire before this returns, not queued in a FIFO or DMA buffer
    fn write(&mut self, bytes: &[u8]) {
        let _ = self.spi.write(bytes);
        let _ = self.spi.flush();
    }

    fn set_pin(&mut self, pin: Pin, high: bool) {
        self.pins.set(pin, high);
    }

    fn set_pwm(&mut self, on: bool) {
        self.pins.pwm(on);
    }

    fn is_busy(&mut self) -> bool {
        self.pins.busy()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn now_ms(&mut self) -> u64 {
        self.clock.now_ms()
    }
}
