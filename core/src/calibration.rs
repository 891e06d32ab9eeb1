//! Soil moisture calibration
//!
//! Maps a raw ADC reading onto a 0-100 % scale between two calibration
//! points measured in free air (driest) and in water (wettest).
//!
//! The raw polarity of capacitive probes varies, so `air` may be above or
//! below `water`. Range checks always use min/max of the pair.

/// Tolerance in raw units outside the calibrated range before a reading is
/// considered out of range (disconnected probe, saturated ADC)
pub const MARGIN: i32 = 150;

/// Calibration points for one soil probe
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoilCalibration {
    /// Raw reading with the probe in dry air (maps to 0 %)
    pub air: u16,
    /// Raw reading with the probe in water (maps to 100 %)
    pub water: u16,
}

impl SoilCalibration {
    /// Create calibration from the two measured endpoints
    pub const fn new(air: u16, water: u16) -> Self {
        Self { air, water }
    }

    /// Map a raw reading with this calibration
    pub fn map(&self, raw: u16) -> Calibrated {
        map_calibration(raw, self.air, self.water)
    }

    /// Accepted raw range including [`MARGIN`]
    pub fn valid_range(&self) -> (i32, i32) {
        let low = self.air.min(self.water) as i32 - MARGIN;
        let high = self.air.max(self.water) as i32 + MARGIN;
        (low, high)
    }
}

/// Result of mapping one raw reading
///
/// `percent` is always clamped to 0-100, even when `valid` is false, so the
/// flag must be checked before trusting the number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibrated {
    pub percent: u8,
    pub valid: bool,
}

/// Map `raw` linearly from `[air, water]` onto `[0, 100]`
///
/// Integer arithmetic truncating toward zero, then clamped. A degenerate
/// calibration (`air == water`) maps everything to 0.
pub fn map_calibration(raw: u16, air: u16, water: u16) -> Calibrated {
    let calibration = SoilCalibration::new(air, water);
    let (low, high) = calibration.valid_range();
    let raw = raw as i32;
    let valid = (low..=high).contains(&raw);

    let air = air as i32;
    let water = water as i32;
    let mapped = if air == water {
        0
    } else {
        (raw - air) * 100 / (water - air)
    };

    Calibrated {
        percent: mapped.clamp(0, 100) as u8,
        valid,
    }
}
