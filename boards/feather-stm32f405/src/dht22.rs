#![deny(unsafe_code)]
#![deny(warnings)]
//! Single-wire DHT22 driver
//!
//! The data line is driven open-drain and relies on the module's pull-up.
//! Bit timing is measured by counting polling iterations with interrupts
//! masked; decoding happens in `greenhouse_core::dht`.

use defmt::{debug, Format};
use embassy_stm32::gpio::{Flex, Speed};
use embassy_time::Timer;
use greenhouse_core::dht::{decode_frame, frame_from_cycles, BitCycles, FrameError, FRAME_BITS};
use hal_abstractions::{AirSample, AirSensor};

/// Polling iterations before a pulse is considered lost (well over 1 ms at 84 MHz)
const PULSE_TIMEOUT: u32 = 20_000;

/// Host start signal length; the datasheet asks for at least 1 ms
const START_LOW_MS: u64 = 2;

#[derive(Debug, Clone, Copy, Format)]
pub enum Dht22Error {
    /// Sensor did not acknowledge the start signal
    NoResponse,
    /// A data bit never finished
    Timeout { bit: u8 },
    /// Frame arrived but the checksum was wrong
    Frame(FrameError),
}

pub struct Dht22 {
    pin: Flex<'static>,
}

impl Dht22 {
    pub fn new(mut pin: Flex<'static>) -> Self {
        pin.set_high();
        pin.set_as_input_output(Speed::Low);
        Self { pin }
    }

    /// Count iterations while the line stays at `level`
    fn expect_pulse(&self, level: bool) -> Option<u32> {
        let mut count = 0;
        while self.pin.is_high() == level {
            count += 1;
            if count >= PULSE_TIMEOUT {
                return None;
            }
        }
        Some(count)
    }

    fn capture(&mut self) -> Result<[BitCycles; FRAME_BITS], Dht22Error> {
        let mut cycles = [BitCycles::default(); FRAME_BITS];

        critical_section::with(|_| -> Result<(), Dht22Error> {
            self.pin.set_high();

            // Released line, then the 80 µs low / 80 µs high acknowledge
            self.expect_pulse(true).ok_or(Dht22Error::NoResponse)?;
            self.expect_pulse(false).ok_or(Dht22Error::NoResponse)?;
            self.expect_pulse(true).ok_or(Dht22Error::NoResponse)?;

            for (bit, slot) in cycles.iter_mut().enumerate() {
                let timeout = Dht22Error::Timeout { bit: bit as u8 };
                slot.low = self.expect_pulse(false).ok_or(timeout)?;
                slot.high = self.expect_pulse(true).ok_or(timeout)?;
            }
            Ok(())
        })?;

        Ok(cycles)
    }
}

impl AirSensor for Dht22 {
    type Error = Dht22Error;

    async fn read(&mut self) -> Result<AirSample, Self::Error> {
        self.pin.set_low();
        Timer::after_millis(START_LOW_MS).await;

        let result = self.capture();
        self.pin.set_high();

        let frame = frame_from_cycles(&result?);
        debug!("DHT22 frame: {:02x}", frame);
        decode_frame(frame).map_err(Dht22Error::Frame)
    }
}
