// Driver for Pervasive Displays COG e-paper panels (1.44", 2.0", 2.7")
// with a segmented framebuffer for small-RAM microcontrollers.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod display;
pub mod drivers;
pub mod error;
pub mod fonts;

pub use display::SegmentedDisplay;
pub use drivers::cog::{Epd, PowerState};
pub use drivers::frame::{FlashImage, FrameSource, RowReader, Subsampled};
pub use drivers::interface::{Clock, ControlPins, EpdInterface, Interface, Pin, PinBank};
pub use drivers::panel::{PanelGeometry, PanelSize};
pub use drivers::segment::{CompensationMode, DEFAULT_SEGMENT_ROWS, SegmentBuffer};
pub use drivers::temperature::{NoSensor, TemperatureSensor, TemperatureSource};
pub use drivers::waveform::Stage;
pub use error::{ConfigError, Error};
