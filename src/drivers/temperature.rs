// Temperature compensation for stage timing.
// Cold panels switch slowly, so every stage is stretched by a factor read
// from a fixed table (one decimal digit of precision, 10 = 1.0x).

// (upper bound in degrees C, factor x10), scanned in order
const FACTOR_TABLE: [(i16, u16); 7] = [
    (-10, 170),
    (-5, 120),
    (5, 80),
    (10, 40),
    (15, 30),
    (20, 20),
    (40, 10),
];

// anything warmer than the last entry
const HOT_FACTOR_10X: u16 = 7;

pub const ROOM_TEMPERATURE: i16 = 25;

pub fn factor_10x(celsius: i16) -> u16 {
    FACTOR_TABLE
        .iter()
        .find(|&&(limit, _)| celsius <= limit)
        .map(|&(_, factor)| factor)
        .unwrap_or(HOT_FACTOR_10X)
}

/// `stage_time * factor_10x(celsius) / 10`
pub fn factored_duration_ms(stage_time_ms: u32, celsius: i16) -> u32 {
    stage_time_ms * factor_10x(celsius) as u32 / 10
}

/// Anything that can report ambient temperature in whole degrees Celsius.
pub trait TemperatureSensor {
    fn read_celsius(&mut self) -> i16;
}

impl<F: FnMut() -> i16> TemperatureSensor for F {
    fn read_celsius(&mut self) -> i16 {
        self()
    }
}

/// Sensor type for displays built with a fixed temperature.
#[derive(Debug)]
pub enum NoSensor {}

impl TemperatureSensor for NoSensor {
    fn read_celsius(&mut self) -> i16 {
        match *self {}
    }
}

pub enum TemperatureSource<S = NoSensor> {
    /// Hardcoded reading, saves the sensor driver entirely.
    Fixed(i16),
    Sensor(S),
}

impl<S: TemperatureSensor> TemperatureSource<S> {
    pub fn read(&mut self) -> i16 {
        match self {
            TemperatureSource::Fixed(c) => *c,
            TemperatureSource::Sensor(s) => s.read_celsius(),
        }
    }
}

impl Default for TemperatureSource<NoSensor> {
    fn default() -> Self {
        TemperatureSource::Fixed(ROOM_TEMPERATURE)
    }
}
