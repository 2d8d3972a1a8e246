//! Recording fake for the driver's hardware seam.
//!
//! Every write, pin change, PWM toggle and delay is logged in order. Time
//! is simulated in microseconds: delays advance it by their length and
//! every BUSY poll advances it by `poll_us`, so the number of frames a
//! stage runs is fully determined by the test.

#![allow(dead_code)]

use cog_epd::{EpdInterface, PanelGeometry, Pin};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Write(Vec<u8>),
    Pin(Pin, bool),
    Pwm(bool),
    DelayMs(u32),
    DelayUs(u32),
}

pub struct FakeInterface {
    pub events: Vec<Event>,
    pub now_us: u64,
    pub poll_us: u64,
    pub polls: u64,
    /// BUSY never drops.
    pub stuck_busy: bool,
}

/// Ten milliseconds per BUSY poll: a single line outlasts any
/// room-temperature stage, so every stage runs exactly one frame.
pub const SLOW_POLL_US: u64 = 10_000;

impl FakeInterface {
    pub fn new(poll_us: u64) -> Self {
        Self {
            events: Vec::new(),
            now_us: 0,
            poll_us,
            polls: 0,
            stuck_busy: false,
        }
    }

    pub fn slow() -> Self {
        Self::new(SLOW_POLL_US)
    }
}

impl EpdInterface for FakeInterface {
    fn write(&mut self, bytes: &[u8]) {
        self.events.push(Event::Write(bytes.to_vec()));
    }

    fn set_pin(&mut self, pin: Pin, high: bool) {
        self.events.push(Event::Pin(pin, high));
    }

    fn set_pwm(&mut self, on: bool) {
        self.events.push(Event::Pwm(on));
    }

    fn is_busy(&mut self) -> bool {
        self.polls += 1;
        self.now_us += self.poll_us;
        self.stuck_busy
    }

    fn delay_ms(&mut self, ms: u32) {
        self.events.push(Event::DelayMs(ms));
        self.now_us += ms as u64 * 1_000;
    }

    fn delay_us(&mut self, us: u32) {
        self.events.push(Event::DelayUs(us));
        self.now_us += us as u64;
    }

    fn now_ms(&mut self) -> u64 {
        self.now_us / 1_000
    }
}

/// Bytes of every chip-select framed transfer, in order. Empty frames
/// (pins toggled with nothing written) are dropped.
pub fn transfers(events: &[Event]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    for event in events {
        match event {
            Event::Pin(Pin::ChipSelect, false) => current = Some(Vec::new()),
            Event::Pin(Pin::ChipSelect, true) => {
                if let Some(bytes) = current.take() {
                    if !bytes.is_empty() {
                        out.push(bytes);
                    }
                }
            }
            Event::Write(bytes) => {
                if let Some(buf) = current.as_mut() {
                    buf.extend_from_slice(bytes);
                }
            }
            _ => {}
        }
    }
    out
}

/// `(register, data)` for every register write except pixel data.
pub fn registers(events: &[Event]) -> Vec<(u8, Vec<u8>)> {
    let t = transfers(events);
    let mut out = Vec::new();
    for pair in t.windows(2) {
        if pair[0].len() == 2 && pair[0][0] == 0x70 && pair[0][1] != 0x0a && pair[1][0] == 0x72 {
            out.push((pair[0][1], pair[1][1..].to_vec()));
        }
    }
    out
}

/// A pixel-data line split into its sections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Addressed gate, `None` for the dummy line.
    pub row: Option<u16>,
    /// Even-pixel bytes exactly as sent (last source byte first).
    pub even: Vec<u8>,
    pub scan: Vec<u8>,
    pub odd: Vec<u8>,
    pub filler: Option<u8>,
}

pub fn lines(events: &[Event], g: &PanelGeometry) -> Vec<Line> {
    let t = transfers(events);
    let rb = g.bytes_per_row as usize;
    let sb = g.bytes_per_scan as usize;

    let mut out = Vec::new();
    for pair in t.windows(2) {
        if pair[0] != [0x70, 0x0a] {
            continue;
        }
        let data = &pair[1];
        assert_eq!(data[0], 0x72, "pixel data header");
        let expected = 1 + rb + sb + rb + usize::from(g.filler);
        assert_eq!(data.len(), expected, "line length");

        let even = data[1..1 + rb].to_vec();
        let scan = data[1 + rb..1 + rb + sb].to_vec();
        let odd = data[1 + rb + sb..1 + rb + sb + rb].to_vec();
        let filler = g.filler.then(|| data[expected - 1]);
        out.push(Line {
            row: scan_row(&scan),
            even,
            scan,
            odd,
            filler,
        });
    }
    out
}

fn scan_row(scan: &[u8]) -> Option<u16> {
    let (index, &byte) = scan.iter().enumerate().find(|&(_, &b)| b != 0)?;
    let slot = match byte {
        0xc0 => 0,
        0x30 => 1,
        0x0c => 2,
        0x03 => 3,
        other => panic!("bad scan byte {:#04x}", other),
    };
    Some(index as u16 * 4 + slot)
}

/// True when every byte of both pixel sections is `fill`.
pub fn is_fill(line: &Line, fill: u8) -> bool {
    line.even.iter().chain(line.odd.iter()).all(|&b| b == fill)
}

pub fn count(events: &[Event], wanted: &Event) -> usize {
    events.iter().filter(|&e| e == wanted).count()
}
