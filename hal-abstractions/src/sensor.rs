//! Sensor ports
//!
//! The core reads sensors through these traits without knowing the wire
//! protocol (single-wire digital, ADC channel, mock).

use core::fmt::Debug;
use core::future::Future;

/// One raw humidity/temperature sample
///
/// Either field may be NaN when the sensor answered with garbage; the reader
/// decides validity, not the driver.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AirSample {
    /// Relative humidity in percent
    pub humidity: f32,
    /// Temperature in degrees Celsius
    pub temperature: f32,
}

impl AirSample {
    /// Sample reported when the driver could not talk to the sensor at all
    pub const INVALID: Self = Self {
        humidity: f32::NAN,
        temperature: f32::NAN,
    };

    /// Create a new sample
    pub const fn new(humidity: f32, temperature: f32) -> Self {
        Self {
            humidity,
            temperature,
        }
    }

    /// Both values are numeric
    pub fn is_valid(&self) -> bool {
        !self.humidity.is_nan() && !self.temperature.is_nan()
    }
}

/// Combined humidity/temperature sensor (DHT22 and friends)
///
/// Reads are noisy; a single failed read is expected and retried by the caller.
pub trait AirSensor {
    /// Driver-specific failure (timeout, checksum, bus error)
    type Error: Debug;

    /// Perform one acquisition
    fn read(&mut self) -> impl Future<Output = Result<AirSample, Self::Error>>;
}

/// Analog-to-digital converter shared by all soil probes
///
/// Probes are addressed by the pin identifier from their configuration.
pub trait AnalogReader {
    /// ADC or pin-mapping failure
    type Error: Debug;

    /// Sample the given pin once and return the raw conversion result
    fn read_raw(&mut self, pin: u8) -> impl Future<Output = Result<u16, Self::Error>>;
}
