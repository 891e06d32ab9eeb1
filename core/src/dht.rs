//! DHT22 (AM2302) frame decoding
//!
//! The sensor answers a start pulse with 40 bits:
//! `[hum_hi, hum_lo, temp_hi, temp_lo, checksum]`. Humidity and temperature
//! are in tenths; bit 7 of `temp_hi` is the temperature sign. The checksum is
//! the low byte of the sum of the first four bytes.
//!
//! Bit timing lives in the board driver; this module only turns bits into a
//! sample so it can be tested on the host.

use hal_abstractions::AirSample;

/// Bits in one frame
pub const FRAME_BITS: usize = 40;

/// Frame decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Checksum byte did not match the payload
    Checksum { expected: u8, received: u8 },
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Checksum { expected, received } => write!(
                f,
                "DHT22 checksum mismatch (expected {:#04x}, got {:#04x})",
                expected, received
            ),
        }
    }
}

impl core::error::Error for FrameError {}

/// Decode a 5-byte frame into humidity (%) and temperature (°C)
pub fn decode_frame(frame: [u8; 5]) -> Result<AirSample, FrameError> {
    let expected = frame[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if expected != frame[4] {
        return Err(FrameError::Checksum {
            expected,
            received: frame[4],
        });
    }

    let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 / 10.0;
    let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as f32 / 10.0;
    let temperature = if frame[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok(AirSample::new(humidity, temperature))
}

/// Duration of the two halves of one bit, in polling loop iterations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitCycles {
    pub low: u32,
    pub high: u32,
}

/// Pack measured bit timings into a frame
///
/// Every bit starts with a ~50 µs low phase followed by a high phase of
/// ~26 µs (0) or ~70 µs (1). Comparing the two halves against each other
/// needs no calibrated timer: a bit is 1 when its high phase is longer.
pub fn frame_from_cycles(cycles: &[BitCycles; FRAME_BITS]) -> [u8; 5] {
    let mut frame = [0u8; 5];
    for (i, bit) in cycles.iter().enumerate() {
        if bit.high > bit.low {
            frame[i / 8] |= 0x80 >> (i % 8);
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasheet_example() {
        // 65.2 %RH, 35.1 °C
        let sample = decode_frame([0x02, 0x8C, 0x01, 0x5F, 0xEE]).unwrap();
        assert!((sample.humidity - 65.2).abs() < 1e-4);
        assert!((sample.temperature - 35.1).abs() < 1e-4);
    }

    #[test]
    fn test_negative_temperature() {
        // -10.1 °C
        let sample = decode_frame([0x01, 0xF4, 0x80, 0x65, 0xDA]).unwrap();
        assert!((sample.humidity - 50.0).abs() < 1e-4);
        assert!((sample.temperature + 10.1).abs() < 1e-4);
    }

    #[test]
    fn test_checksum_mismatch() {
        assert_eq!(
            decode_frame([0x02, 0x8C, 0x01, 0x5F, 0xEF]),
            Err(FrameError::Checksum {
                expected: 0xEE,
                received: 0xEF
            })
        );
    }

    #[test]
    fn test_checksum_wraps() {
        // 0xFF * 4 = 0x3FC -> 0xFC
        assert!(decode_frame([0xFF, 0xFF, 0xFF, 0xFF, 0xFC]).is_ok());
    }

    #[test]
    fn test_cycles_to_frame() {
        let zero = BitCycles { low: 50, high: 26 };
        let one = BitCycles { low: 50, high: 70 };
        let mut cycles = [zero; FRAME_BITS];
        // 0x02 in the first byte, 0x01 in the last
        cycles[6] = one;
        cycles[39] = one;
        let frame = frame_from_cycles(&cycles);
        assert_eq!(frame, [0x02, 0x00, 0x00, 0x00, 0x01]);
    }
}
