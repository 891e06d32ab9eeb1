//! Clock adjuster
//!
//! Keeps an approximate local wall clock without a hardware RTC:
//! - resynchronizes against a remote [`TimeSource`] at most once per
//!   `resync_interval_ms` of uptime
//! - extrapolates between syncs from the monotonic millisecond counter
//! - picks one of two fixed UTC offsets from a calendar heuristic
//!
//! ## Daylight saving heuristic
//!
//! April to September is summer time, November to February winter time.
//! The switch days are approximated: summer time starts on March 25th and
//! ends on October 25th instead of the last Sundays. Consumers of the
//! timestamps already account for this, so it is kept as-is.
//!
//! The date is the local one, computed with the offset that was active
//! before the sync, so the switch happens at local midnight.

use core::fmt::Write;

use hal_abstractions::TimeSource;
use heapless::String;

use crate::calendar::CivilDateTime;
use crate::config::ClockConfig;
use crate::error::TimeError;
use crate::fmt::Debug2Format;

/// Length of `YYYY-MM-DDTHH:MM:SS+HH:MM`
pub const TIMESTAMP_LEN: usize = 25;

/// Active UTC offset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UtcOffset {
    /// Winter time
    Standard,
    /// Summer time
    Daylight,
}

/// Summer time heuristic on a local calendar date
pub fn is_daylight(month: u8, day: u8) -> bool {
    match month {
        4..=9 => true,
        3 => day >= 25,
        10 => day < 25,
        _ => false,
    }
}

/// [`is_daylight`] for local time given in seconds since the Unix epoch
pub fn is_daylight_at(unix_secs: u64) -> bool {
    let date = CivilDateTime::from_unix(unix_secs as i64);
    is_daylight(date.month, date.day)
}

/// Format a UTC instant as local time, `YYYY-MM-DDTHH:MM:SS±HH:MM`
///
/// The offset is added once before splitting into calendar fields; the
/// suffix is derived from the same offset.
pub fn format_local_timestamp(unix_secs: u64, offset_secs: i32) -> String<TIMESTAMP_LEN> {
    let local = CivilDateTime::from_unix(unix_secs as i64 + offset_secs as i64);
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let offset = offset_secs.unsigned_abs();

    let mut out = String::new();
    // Only overflows past year 9999
    write!(
        out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{:02}:{:02}",
        local.year,
        local.month,
        local.day,
        local.hour,
        local.minute,
        local.second,
        sign,
        offset / 3600,
        (offset % 3600) / 60
    )
    .ok();
    out
}

/// Synchronization bookkeeping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockState {
    /// Uptime of the last contact attempt, successful or not
    pub last_sync_ms: Option<u32>,
    /// UTC seconds reported by the last successful sync
    pub synced_unix_secs: Option<u64>,
    /// Uptime at which `synced_unix_secs` was valid
    pub synced_at_ms: u32,
    pub offset: UtcOffset,
}

/// Rate-limited wall clock
pub struct ClockAdjuster<T> {
    config: ClockConfig,
    source: T,
    state: ClockState,
}

impl<T: TimeSource> ClockAdjuster<T> {
    pub fn new(config: ClockConfig, source: T) -> Self {
        Self {
            config,
            source,
            state: ClockState {
                last_sync_ms: None,
                synced_unix_secs: None,
                synced_at_ms: 0,
                offset: UtcOffset::Standard,
            },
        }
    }

    /// Resynchronize if the interval has elapsed, otherwise do nothing
    ///
    /// Returns `Ok(true)` when the clock was resynchronized. A failed contact
    /// still counts toward the interval, so an unreachable source is retried
    /// on the next interval rather than on every call.
    pub async fn update(&mut self, now_ms: u32) -> Result<bool, TimeError> {
        let due = match self.state.last_sync_ms {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) >= self.config.resync_interval_ms,
        };
        if !due {
            return Ok(false);
        }
        self.state.last_sync_ms = Some(now_ms);

        let unix_secs = self.source.fetch_unix_secs().await.map_err(|e| {
            warn!("Time source failed: {:?}", Debug2Format(&e));
            TimeError::SourceUnavailable
        })?;

        self.state.synced_unix_secs = Some(unix_secs);
        self.state.synced_at_ms = now_ms;
        let local_secs = unix_secs.saturating_add_signed(self.offset_secs() as i64);
        self.state.offset = if is_daylight_at(local_secs) {
            UtcOffset::Daylight
        } else {
            UtcOffset::Standard
        };

        info!(
            "Clock synced: {} UTC ({:?})",
            unix_secs, self.state.offset
        );
        Ok(true)
    }

    /// At least one resync succeeded
    pub fn is_synced(&self) -> bool {
        self.state.synced_unix_secs.is_some()
    }

    /// Current UTC time in Unix seconds, 0 until the first sync
    pub fn unix_secs(&self, now_ms: u32) -> u64 {
        match self.state.synced_unix_secs {
            Some(base) => base + (now_ms.wrapping_sub(self.state.synced_at_ms) / 1000) as u64,
            None => 0,
        }
    }

    pub fn offset(&self) -> UtcOffset {
        self.state.offset
    }

    /// Active offset from UTC in seconds
    pub fn offset_secs(&self) -> i32 {
        match self.state.offset {
            UtcOffset::Standard => self.config.standard_offset_secs,
            UtcOffset::Daylight => self.config.daylight_offset_secs,
        }
    }

    /// Local timestamp for uploads
    pub fn formatted_timestamp(&self, now_ms: u32) -> String<TIMESTAMP_LEN> {
        format_local_timestamp(self.unix_secs(now_ms), self.offset_secs())
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }
}
