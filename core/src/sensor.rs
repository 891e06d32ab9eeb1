//! Sensor reader
//!
//! Runs one acquisition pass over the air sensor (with bounded retry) and
//! every configured soil probe, keeping only the latest value of each.
//! Results are read back through accessors between passes.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{AirSample, AirSensor, AnalogReader};
use heapless::Vec;

use crate::config::{SensorConfig, MAX_SOIL_SENSORS};
use crate::fmt::Debug2Format;

/// Latest humidity/temperature pair
///
/// On failure the last raw values (usually NaN) are kept, not reset.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AirReading {
    pub humidity: f32,
    pub temperature: f32,
    pub success: bool,
}

impl AirReading {
    /// Both values are numeric, regardless of the success flag
    pub fn is_numeric(&self) -> bool {
        !self.humidity.is_nan() && !self.temperature.is_nan()
    }
}

/// Latest reading of one soil probe
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoilReading {
    pub name: &'static str,
    /// Raw ADC value (0 if the ADC failed)
    pub raw: u16,
    /// Clamped moisture percentage
    pub percent: u8,
    /// Raw value was inside the calibrated range
    pub success: bool,
}

/// Everything the reader knows after the last pass
#[derive(Clone, Debug, PartialEq)]
pub struct ReaderState {
    pub air_enabled: bool,
    pub air: AirReading,
    pub soil: Vec<SoilReading, MAX_SOIL_SENSORS>,
}

/// Acquisition orchestrator
pub struct SensorReader<A, S, D> {
    config: SensorConfig,
    air_sensor: A,
    analog: S,
    delay: D,
    state: ReaderState,
    has_read: bool,
}

impl<A, S, D> SensorReader<A, S, D>
where
    A: AirSensor,
    S: AnalogReader,
    D: DelayNs,
{
    /// Create a reader; probes beyond [`MAX_SOIL_SENSORS`] are ignored
    pub fn new(mut config: SensorConfig, air_sensor: A, analog: S, delay: D) -> Self {
        if config.soil.len() > MAX_SOIL_SENSORS {
            warn!(
                "{} soil probes configured, only the first {} are read",
                config.soil.len(),
                MAX_SOIL_SENSORS
            );
            config.soil = &config.soil[..MAX_SOIL_SENSORS];
        }

        let mut soil = Vec::new();
        for probe in config.soil {
            // Cannot overflow: truncated above
            let _ = soil.push(SoilReading {
                name: probe.name,
                raw: 0,
                percent: 0,
                success: false,
            });
        }

        Self {
            state: ReaderState {
                air_enabled: config.air.enabled,
                air: AirReading {
                    humidity: AirSample::INVALID.humidity,
                    temperature: AirSample::INVALID.temperature,
                    success: false,
                },
                soil,
            },
            config,
            air_sensor,
            analog,
            delay,
            has_read: false,
        }
    }

    /// Perform one full acquisition pass and update the state
    pub async fn read_all(&mut self) {
        if self.config.air.enabled {
            self.read_air().await;
        }
        self.read_soil().await;
        self.has_read = true;
    }

    async fn read_air(&mut self) {
        let retry = self.config.retry;
        let attempts = retry.max_retries.max(1);
        let mut sample = AirSample::INVALID;

        for attempt in 0..attempts {
            sample = match self.air_sensor.read().await {
                Ok(sample) => sample,
                Err(e) => {
                    debug!(
                        "Air sensor attempt {} failed: {:?}",
                        attempt + 1,
                        Debug2Format(&e)
                    );
                    AirSample::INVALID
                }
            };
            if sample.is_valid() {
                break;
            }
            if attempt + 1 < attempts {
                self.delay.delay_ms(retry.retry_delay_ms).await;
            }
        }

        let air = &mut self.state.air;
        air.humidity = sample.humidity;
        air.temperature = sample.temperature;
        air.success = sample.is_valid();

        if air.success {
            info!(
                "Humidity: {} %  Temperature: {} C",
                air.humidity, air.temperature
            );
        } else {
            warn!("Air sensor: read failed after {} attempts", attempts);
        }
    }

    async fn read_soil(&mut self) {
        let probes = self.config.soil;
        for (probe, reading) in probes.iter().zip(self.state.soil.iter_mut()) {
            match self.analog.read_raw(probe.pin).await {
                Ok(raw) => {
                    let mapped = probe.calibration.map(raw);
                    reading.raw = raw;
                    reading.percent = mapped.percent;
                    reading.success = mapped.valid;
                }
                Err(e) => {
                    error!(
                        "ADC read on pin {} failed: {:?}",
                        probe.pin,
                        Debug2Format(&e)
                    );
                    reading.raw = 0;
                    reading.percent = 0;
                    reading.success = false;
                }
            }

            if reading.success {
                info!("{}: {} %", reading.name, reading.percent);
            } else {
                warn!("{}: read failed (raw {})", reading.name, reading.raw);
            }
        }
    }

    /// Snapshot of the last pass
    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    /// At least one pass has completed; before that the state holds no readings
    pub fn has_read(&self) -> bool {
        self.has_read
    }

    pub fn air_sensor(&self) -> &A {
        &self.air_sensor
    }

    pub fn humidity(&self) -> f32 {
        self.state.air.humidity
    }

    pub fn temperature(&self) -> f32 {
        self.state.air.temperature
    }

    pub fn is_air_enabled(&self) -> bool {
        self.config.air.enabled
    }

    pub fn is_air_read_success(&self) -> bool {
        self.state.air.success
    }

    pub fn soil_sensor_count(&self) -> usize {
        self.state.soil.len()
    }

    /// Moisture percentage of probe `index`, 0 if out of range
    pub fn soil_moisture(&self, index: usize) -> u8 {
        self.state.soil.get(index).map_or(0, |r| r.percent)
    }

    /// Name of probe `index`, empty if out of range
    pub fn soil_name(&self, index: usize) -> &'static str {
        self.state.soil.get(index).map_or("", |r| r.name)
    }

    /// Validity of probe `index`, false if out of range
    pub fn is_soil_read_success(&self, index: usize) -> bool {
        self.state.soil.get(index).is_some_and(|r| r.success)
    }
}
