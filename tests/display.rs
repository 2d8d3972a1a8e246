//! Segmented display tests: segment flow, power bracketing, dual-buffer
//! transitions and the flash bitmap path.
//!
//! Run with: cargo test --test display

mod common;

use cog_epd::drivers::waveform::{encode_even, encode_odd};
use cog_epd::fonts::bitmap::ColumnFont;
use cog_epd::{
    CompensationMode, ConfigError, Epd, Error, NoSensor, PanelSize, Pin, PowerState,
    SegmentedDisplay, Stage, TemperatureSource,
};
use common::{Event, FakeInterface, count, is_fill, lines};
use embedded_graphics::prelude::*;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

const SMALL: PanelSize = PanelSize::Epd1in44;

fn display(
    segment_rows: u16,
    mode: CompensationMode,
    fake: FakeInterface,
) -> SegmentedDisplay<FakeInterface> {
    SegmentedDisplay::new(
        Epd::new(SMALL, fake),
        TemperatureSource::Fixed(25),
        segment_rows,
        mode,
    )
    .unwrap()
}

fn events(d: &mut SegmentedDisplay<FakeInterface>) -> &mut Vec<Event> {
    &mut d.epd_mut().interface_mut().events
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn segment_height_must_divide_panel() {
    let r = SegmentedDisplay::new(
        Epd::new(SMALL, FakeInterface::slow()),
        TemperatureSource::<NoSensor>::Fixed(25),
        7,
        CompensationMode::AlwaysClear,
    );
    assert_eq!(
        r.err(),
        Some(Error::InvalidConfiguration(ConfigError::SegmentHeight {
            rows: 96,
            segment_rows: 7
        }))
    );

    let r = SegmentedDisplay::new(
        Epd::new(SMALL, FakeInterface::slow()),
        TemperatureSource::<NoSensor>::Fixed(25),
        8,
        CompensationMode::DualBuffer,
    );
    assert_eq!(
        r.err(),
        Some(ConfigError::DualBufferSegmented { segments: 12 }.into())
    );
}

#[test]
fn sensor_temperature_is_sampled_on_update() {
    let mut d = SegmentedDisplay::new(
        Epd::new(SMALL, FakeInterface::slow()),
        TemperatureSource::Sensor(|| -> i16 { -7 }),
        8,
        CompensationMode::AlwaysClear,
    )
    .unwrap();
    assert_eq!(d.update_temperature(), -7);
    assert_eq!(d.epd().factored_stage_ms(), 480 * 12);
}

// ---------------------------------------------------------------------------
// Segment flow
// ---------------------------------------------------------------------------

#[test]
fn begin_clears_the_whole_panel() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.begin().unwrap();

    let ev = events(&mut d);
    let ls = lines(ev, SMALL.geometry());
    // four clear stages over all rows, then the power-off dummy frame
    assert_eq!(ls.len(), 4 * 96 + 97);
    assert!(ls[..96].iter().all(|l| is_fill(l, 0xff)));
    assert!(ls[2 * 96..4 * 96].iter().all(|l| is_fill(l, 0xaa)));
    assert_eq!(count(ev, &Event::Pin(Pin::PanelOn, true)), 1);
    assert_eq!(d.epd().power_state(), PowerState::Off);
}

#[test]
fn segment_display_drives_only_its_rows() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.select_segment(1).unwrap();
    d.set_pixel(0, 9, BinaryColor::On).unwrap();
    // other segment: dropped
    d.set_pixel(0, 3, BinaryColor::On).unwrap();
    assert_eq!(
        d.set_pixel(128, 9, BinaryColor::On),
        Err(Error::OutOfBoundsPixel { x: 128, y: 9 })
    );

    d.display(false, true, true).unwrap();

    let ls = lines(events(&mut d), SMALL.geometry());
    assert_eq!(ls.len(), 4 * 8 + 97);
    for stage in 0..4 {
        for i in 0..8 {
            assert_eq!(ls[stage * 8 + i].row, Some(8 + i as u16));
        }
    }
    // no old image: erase stages drive white
    assert!(ls[..16].iter().all(|l| is_fill(l, 0xaa)));

    let normal_row9 = &ls[3 * 8 + 1];
    assert_eq!(normal_row9.odd[0], encode_odd(0x01, Stage::Normal));
    assert!(normal_row9.odd[1..].iter().all(|&b| b == 0xaa));
    assert!(normal_row9.even.iter().all(|&b| b == 0xaa));

    // display only reads the buffer
    assert_eq!(d.buffer().data()[16], 0x01);
    assert_eq!(d.epd().power_state(), PowerState::Off);
}

#[test]
fn clear_first_adds_a_clear_cycle() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.select_segment(11).unwrap();
    d.display(true, true, true).unwrap();

    let ls = lines(events(&mut d), SMALL.geometry());
    assert_eq!(ls.len(), 8 * 8 + 97);
    assert!(ls[..8].iter().all(|l| is_fill(l, 0xff)));
    assert_eq!(ls[0].row, Some(88));
    assert_eq!(ls[63].row, Some(95));
}

#[test]
fn segments_can_share_one_powered_session() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.select_segment(0).unwrap();
    d.display(false, true, false).unwrap();
    assert!(d.epd().is_powered());
    d.select_segment(1).unwrap();
    d.display(false, false, true).unwrap();

    let ev = events(&mut d);
    assert_eq!(count(ev, &Event::Pin(Pin::PanelOn, true)), 1);
    assert_eq!(count(ev, &Event::Pin(Pin::Discharge, true)), 1);
    assert_eq!(lines(ev, SMALL.geometry()).len(), 32 + 32 + 97);
}

#[test]
fn display_without_power_is_an_error() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    assert_eq!(d.display(false, false, false), Err(Error::NotPowered));
}

#[test]
fn failed_update_still_powers_off() {
    let mut fake = FakeInterface::slow();
    fake.stuck_busy = true;
    let mut d = display(8, CompensationMode::AlwaysClear, fake);

    assert_eq!(d.display(false, true, true), Err(Error::DeviceTimeout));
    assert_eq!(d.epd().power_state(), PowerState::Off);
    assert_eq!(count(events(&mut d), &Event::Pin(Pin::Discharge, true)), 1);
}

#[test]
fn clear_leaves_an_open_session_and_the_segment_alone() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.select_segment(0).unwrap();
    d.set_pixel(3, 2, BinaryColor::On).unwrap();
    d.display(false, true, false).unwrap();
    events(&mut d).clear();

    assert_eq!(d.clear(), Err(Error::AlreadyPowered));
    assert!(d.epd().is_powered());
    assert_eq!(d.buffer().pixel(3, 2), Some(BinaryColor::On));
    assert!(lines(events(&mut d), SMALL.geometry()).is_empty());
    assert_eq!(count(events(&mut d), &Event::Pin(Pin::Discharge, true)), 0);

    // the session opened above still closes normally
    d.select_segment(1).unwrap();
    d.display(false, false, true).unwrap();
    assert_eq!(d.epd().power_state(), PowerState::Off);
}

#[test]
fn render_and_bitmaps_refuse_to_take_over_an_open_session() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.display(false, true, false).unwrap();

    let mut calls = 0;
    assert_eq!(d.render(false, |_| calls += 1), Err(Error::AlreadyPowered));
    assert_eq!(calls, 0);
    assert_eq!(d.show_bitmap(&IMAGE, false), Err(Error::AlreadyPowered));
    assert!(d.epd().is_powered());
    assert_eq!(count(events(&mut d), &Event::Pin(Pin::Discharge, true)), 0);

    d.epd_mut().power_off().unwrap();
}

#[test]
fn render_walks_segments_in_one_session() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    let mut calls = 0;
    d.render(false, |buf| {
        calls += 1;
        Rectangle::new(Point::new(0, 20), Size::new(128, 1))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(buf)
            .unwrap();
    })
    .unwrap();
    assert_eq!(calls, 12);

    let ev = events(&mut d);
    assert_eq!(count(ev, &Event::Pin(Pin::PanelOn, true)), 1);
    let ls = lines(ev, SMALL.geometry());
    assert_eq!(ls.len(), 12 * 32 + 97);

    // segment 2 holds rows 16..24; its normal stage starts 24 lines in
    let row20 = &ls[2 * 32 + 24 + 4];
    assert_eq!(row20.row, Some(20));
    assert!(is_fill(row20, 0xff));
    assert!(is_fill(&ls[2 * 32 + 24 + 3], 0xaa));
    assert_eq!(d.epd().power_state(), PowerState::Off);
}

#[test]
fn draw_char_lands_in_the_resident_segment() {
    static DIGITS: [u8; 10] = [
        0x3e, 0x51, 0x49, 0x45, 0x3e, //
        0x00, 0x42, 0x7f, 0x40, 0x00,
    ];
    let font = ColumnFont::new(&DIGITS, b'0', b'1', 5, 8);

    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.select_segment(1).unwrap();
    // straddles segments 0 and 1
    let end = d.draw_str(
        &font,
        Point::new(10, 4),
        "1",
        BinaryColor::On,
        BinaryColor::Off,
        1,
    );
    assert_eq!(end, Point::new(16, 4));
    // stem of '1' is column 2, rows 0..7
    assert_eq!(d.buffer().pixel(12, 8), Some(BinaryColor::On));
    assert_eq!(d.buffer().pixel(12, 10), Some(BinaryColor::On));
    assert_eq!(d.buffer().pixel(12, 4), None);
    assert_eq!(d.buffer().pixel(13, 8), Some(BinaryColor::Off));

    d.draw_char(&font, Point::new(0, 8), '0', BinaryColor::On, BinaryColor::On, 1);
    // '0' column 0 = 0x3e: rows 1..6
    assert_eq!(d.buffer().pixel(0, 8), Some(BinaryColor::Off));
    assert_eq!(d.buffer().pixel(0, 9), Some(BinaryColor::On));
}

// ---------------------------------------------------------------------------
// Dual buffer
// ---------------------------------------------------------------------------

#[test]
fn dual_buffer_compensates_with_previous_image() {
    let mut d = display(96, CompensationMode::DualBuffer, FakeInterface::slow());
    d.set_pixel(8, 0, BinaryColor::On).unwrap();
    d.display(false, true, true).unwrap();
    assert_eq!(d.buffer().old_data(), Some(d.buffer().data()));

    events(&mut d).clear();
    d.select_segment(0).unwrap();
    // no forced clear in dual-buffer mode
    d.display(true, true, true).unwrap();

    let ls = lines(events(&mut d), SMALL.geometry());
    assert_eq!(ls.len(), 4 * 96 + 97);
    // compensate stage replays the previous image
    assert_eq!(ls[0].odd[1], encode_odd(0x01, Stage::Compensate));
    assert_eq!(ls[0].odd[0], encode_odd(0x00, Stage::Compensate));
    // white stage: the old black pixel is left alone, the rest go white
    assert_eq!(ls[96].odd[1], encode_odd(0x01, Stage::White));
    assert!(ls[97..2 * 96].iter().all(|l| is_fill(l, 0xaa)));
    // new image is all white
    assert!(ls[3 * 96..4 * 96].iter().all(|l| is_fill(l, 0xaa)));
    assert!(d.buffer().old_data().unwrap().iter().all(|&b| b == 0));
}

// ---------------------------------------------------------------------------
// Flash bitmaps
// ---------------------------------------------------------------------------

static IMAGE: [u8; 16 * 96] = {
    let mut a = [0u8; 16 * 96];
    let mut i = 0;
    while i < a.len() {
        a[i] = (i * 7) as u8;
        i += 1;
    }
    a
};

// half size: 8 bytes per row, 48 rows; low nibble set everywhere
static HALF: [u8; 8 * 48] = [0x0f; 8 * 48];

#[test]
fn show_bitmap_streams_the_full_panel() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.show_bitmap(&IMAGE, false).unwrap();

    let ls = lines(events(&mut d), SMALL.geometry());
    assert_eq!(ls.len(), 4 * 96 + 4 * 96 + 97);

    let normal_row3 = &ls[4 * 96 + 3 * 96 + 3];
    assert_eq!(normal_row3.row, Some(3));
    let src = &IMAGE[3 * 16..4 * 16];
    let even: Vec<u8> = (0..16).rev().map(|b| encode_even(src[b], Stage::Normal)).collect();
    assert_eq!(normal_row3.even, even);
    assert_eq!(d.epd().power_state(), PowerState::Off);
}

#[test]
fn show_bitmap_doubles_subsampled_images() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    d.show_bitmap(&HALF, true).unwrap();

    let ls = lines(events(&mut d), SMALL.geometry());
    let normal_row5 = &ls[4 * 96 + 3 * 96 + 5];
    // every source byte 0x0f -> full-size bytes 0xff, 0x00, 0xff, ...
    let row: Vec<u8> = (0..16).map(|b| if b % 2 == 0 { 0xff } else { 0x00 }).collect();
    let odd: Vec<u8> = row.iter().map(|&b| encode_odd(b, Stage::Normal)).collect();
    assert_eq!(normal_row5.odd, odd);
}

#[test]
fn short_bitmaps_are_rejected_before_any_io() {
    let mut d = display(8, CompensationMode::AlwaysClear, FakeInterface::slow());
    assert_eq!(
        d.show_bitmap(&IMAGE[..100], false),
        Err(ConfigError::SourceLength {
            needed: 1536,
            len: 100
        }
        .into())
    );
    assert_eq!(
        d.show_bitmap(&HALF[..383], true),
        Err(ConfigError::SourceLength {
            needed: 384,
            len: 383
        }
        .into())
    );
    assert!(events(&mut d).is_empty());
}
