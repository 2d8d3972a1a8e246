// Panel drivers: protocol, timing and pixel storage.
//
// Nothing here knows about a particular board; pins and buses come in
// through the `interface` seam.

pub mod cog;
pub mod frame;
pub mod interface;
pub mod panel;
pub mod segment;
pub mod stopwatch;
pub mod temperature;
pub mod waveform;
