#![deny(unsafe_code)]
#![deny(warnings)]
//! Soil probes on ADC1
//!
//! Probe pins are numbered like the Feather silkscreen: 0 is A0 (PA4)
//! through 5 for A5 (PC5). Conversions run at 10 bits so calibration
//! values from the windowsill prototype carry over unchanged.

use defmt::Format;
use embassy_stm32::adc::{Adc, AnyAdcChannel, Resolution, SampleTime};
use embassy_stm32::peripherals::ADC1;
use hal_abstractions::AnalogReader;

/// Analog inputs broken out on the Feather header
pub const ANALOG_PINS: usize = 6;

#[derive(Debug, Clone, Copy, Format)]
pub enum SoilError {
    /// Configured pin is not one of A0..A5
    NoSuchPin { pin: u8 },
}

pub struct SoilAdc {
    adc: Adc<'static, ADC1>,
    channels: [AnyAdcChannel<ADC1>; ANALOG_PINS],
}

impl SoilAdc {
    pub fn new(mut adc: Adc<'static, ADC1>, channels: [AnyAdcChannel<ADC1>; ANALOG_PINS]) -> Self {
        adc.set_resolution(Resolution::BITS10);
        adc.set_sample_time(SampleTime::CYCLES480);
        Self { adc, channels }
    }
}

impl AnalogReader for SoilAdc {
    type Error = SoilError;

    async fn read_raw(&mut self, pin: u8) -> Result<u16, Self::Error> {
        let channel = self
            .channels
            .get_mut(pin as usize)
            .ok_or(SoilError::NoSuchPin { pin })?;
        Ok(self.adc.blocking_read(channel))
    }
}
