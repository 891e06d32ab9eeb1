//! Cooperative main loop
//!
//! One [`Scheduler::tick`] per loop iteration. Each tick pumps the
//! publisher's events, lets the clock resync if its own interval elapsed,
//! reads the sensors when the read interval elapsed and uploads the latest
//! snapshot when the upload interval elapsed and the publisher is ready.
//!
//! All intervals are compared with wrapping subtraction, so the 32-bit
//! millisecond uptime counter rolling over (~49.7 days) is harmless.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{AirSensor, AnalogReader, TimeSource};

use crate::clock::ClockAdjuster;
use crate::config::ScheduleConfig;
use crate::error::PublishError;
use crate::publish::{PublishOutcome, Publisher};
use crate::sensor::SensorReader;

/// Fixed-period trigger on the millisecond uptime counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalTimer {
    pub interval_ms: u32,
    pub last_fire_ms: u32,
}

impl IntervalTimer {
    /// Timer counting from uptime 0
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_fire_ms: 0,
        }
    }

    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_fire_ms) >= self.interval_ms
    }

    /// Record a firing at `now_ms`
    pub fn fire(&mut self, now_ms: u32) {
        self.last_fire_ms = now_ms;
    }

    /// Fire if due; returns whether it fired
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if self.is_due(now_ms) {
            self.fire(now_ms);
            true
        } else {
            false
        }
    }
}

/// Last-fire bookkeeping for the read and upload intervals
///
/// The clock resync interval lives inside the [`ClockAdjuster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerState {
    pub read: IntervalTimer,
    pub upload: IntervalTimer,
}

impl From<ScheduleConfig> for SchedulerState {
    fn from(config: ScheduleConfig) -> Self {
        Self {
            read: IntervalTimer::new(config.read_interval_ms),
            upload: IntervalTimer::new(config.upload_interval_ms),
        }
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Clock resynchronized this tick
    pub clock_synced: bool,
    /// Sensors were read this tick
    pub read: bool,
    /// Upload attempt result, `None` if no upload was attempted
    pub upload: Option<Result<PublishOutcome, PublishError>>,
}

/// Owns the reader, the clock and the publisher and sequences them
pub struct Scheduler<A, S, D, T, P> {
    reader: SensorReader<A, S, D>,
    clock: ClockAdjuster<T>,
    publisher: P,
    state: SchedulerState,
}

impl<A, S, D, T, P> Scheduler<A, S, D, T, P>
where
    A: AirSensor,
    S: AnalogReader,
    D: DelayNs,
    T: TimeSource,
    P: Publisher,
{
    pub fn new(
        config: ScheduleConfig,
        reader: SensorReader<A, S, D>,
        clock: ClockAdjuster<T>,
        publisher: P,
    ) -> Self {
        Self {
            reader,
            clock,
            publisher,
            state: config.into(),
        }
    }

    /// Run one loop iteration at uptime `now_ms`
    ///
    /// Never fails: collaborator errors are logged and reported, and the
    /// affected step waits for its next interval.
    pub async fn tick(&mut self, now_ms: u32) -> TickReport {
        let mut report = TickReport::default();

        self.publisher.service().await;

        match self.clock.update(now_ms).await {
            Ok(synced) => report.clock_synced = synced,
            Err(e) => warn!("Clock update failed: {}", e),
        }

        if self.state.read.poll(now_ms) {
            self.reader.read_all().await;
            report.read = true;
        }

        // Upload timer only advances once there is a snapshot and the
        // publisher can take it
        if self.reader.has_read() && self.publisher.is_ready() && self.state.upload.poll(now_ms) {
            let timestamp = self.clock.formatted_timestamp(now_ms);
            let result = self
                .publisher
                .publish(self.reader.state(), &timestamp)
                .await;
            match &result {
                Ok(PublishOutcome::Sent) => info!("Upload sent at {}", timestamp.as_str()),
                Ok(PublishOutcome::Skipped) => info!("Upload skipped"),
                Err(e) => error!("Upload failed: {}", e),
            }
            report.upload = Some(result);
        }

        report
    }

    pub fn reader(&self) -> &SensorReader<A, S, D> {
        &self.reader
    }

    pub fn clock(&self) -> &ClockAdjuster<T> {
        &self.clock
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClockConfig, DocumentConfig, SensorConfig};
    use crate::sensor::ReaderState;
    use crate::publish::DocumentPublisher;
    use crate::testing::{
        s, FixedAnalog, RecordingDelay, RecordingStore, ScriptedAirSensor, StubTimeSource,
    };
    use hal_abstractions::StoreResult;
    use core::cell::Cell;
    use embassy_futures::block_on;
    use hal_abstractions::AirSample;

    #[test]
    fn test_timer_fires_when_interval_elapsed() {
        let mut timer = IntervalTimer::new(1_000);
        assert!(!timer.is_due(999));
        assert!(timer.is_due(1_000));
        assert!(timer.poll(1_500));
        assert_eq!(timer.last_fire_ms, 1_500);
    }

    #[test]
    fn test_timer_does_not_double_fire() {
        let mut timer = IntervalTimer::new(1_000);
        assert!(timer.poll(1_000));
        assert!(!timer.poll(1_000));
        assert!(!timer.poll(1_999));
        assert!(timer.poll(2_000));
    }

    #[test]
    fn test_timer_across_rollover() {
        let mut timer = IntervalTimer::new(1_000);
        timer.fire(u32::MAX - 499);
        // 500 ms elapsed
        assert!(!timer.is_due(0));
        // 1_000 ms elapsed
        assert!(timer.poll(500));
        assert_eq!(timer.last_fire_ms, 500);
    }

    /// Publisher that records payload-free summaries of what it was given
    #[derive(Default)]
    struct StubPublisher {
        ready: bool,
        fail: bool,
        services: u32,
        uploads: Vec<(bool, String)>,
    }

    impl Publisher for StubPublisher {
        async fn service(&mut self) {
            self.services += 1;
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn publish(
            &mut self,
            state: &ReaderState,
            timestamp: &str,
        ) -> Result<PublishOutcome, PublishError> {
            if self.fail {
                return Err(PublishError::Transport);
            }
            self.uploads.push((state.air.success, timestamp.into()));
            Ok(PublishOutcome::Sent)
        }
    }

    const SCHEDULE: ScheduleConfig = ScheduleConfig {
        read_interval_ms: 1_000,
        upload_interval_ms: 2_000,
    };

    // 2024-06-15T10:00:00Z
    const JUNE: u64 = 1_718_445_600;

    #[test]
    fn test_tick_sequence() {
        let elapsed = Cell::new(0);
        let unix = Cell::new(Some(JUNE));
        let fetches = Cell::new(0);

        let reader = SensorReader::new(
            SensorConfig::default(),
            // First pass exhausts its three attempts, the second succeeds
            ScriptedAirSensor::failing_then(3, AirSample::new(45.0, 22.0)),
            FixedAnalog::new(&[342]),
            RecordingDelay::new(&elapsed),
        );
        let clock = ClockAdjuster::new(
            ClockConfig::default(),
            StubTimeSource {
                unix_secs: &unix,
                fetches: &fetches,
            },
        );
        let publisher = StubPublisher {
            ready: true,
            ..Default::default()
        };
        let mut scheduler = Scheduler::new(SCHEDULE, reader, clock, publisher);

        let report = block_on(scheduler.tick(0));
        assert!(report.clock_synced);
        assert!(!report.read);
        assert_eq!(report.upload, None);

        let report = block_on(scheduler.tick(1_000));
        assert!(!report.clock_synced);
        assert!(report.read);
        assert_eq!(report.upload, None);
        assert!(!scheduler.reader().is_air_read_success());
        assert_eq!(scheduler.reader().soil_moisture(0), 50);

        let report = block_on(scheduler.tick(2_000));
        assert!(report.read);
        assert_eq!(report.upload, Some(Ok(PublishOutcome::Sent)));

        // Upload carries the snapshot taken in the same tick
        let uploads = &scheduler.publisher().uploads;
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].0);
        assert_eq!(uploads[0].1, "2024-06-15T12:00:02+02:00");
        assert_eq!(scheduler.publisher().services, 3);
        assert_eq!(fetches.get(), 1);
    }

    #[test]
    fn test_upload_waits_for_ready_publisher() {
        let elapsed = Cell::new(0);
        let unix = Cell::new(None);
        let fetches = Cell::new(0);

        let reader = SensorReader::new(
            SensorConfig::default(),
            ScriptedAirSensor::always_failing(),
            FixedAnalog::new(&[342]),
            RecordingDelay::new(&elapsed),
        );
        let clock = ClockAdjuster::new(
            ClockConfig::default(),
            StubTimeSource {
                unix_secs: &unix,
                fetches: &fetches,
            },
        );
        let mut scheduler = Scheduler::new(SCHEDULE, reader, clock, StubPublisher::default());

        // Clock failure does not stop the tick
        let report = block_on(scheduler.tick(2_000));
        assert!(!report.clock_synced);
        assert!(report.read);
        assert_eq!(report.upload, None);
        assert_eq!(scheduler.state().upload.last_fire_ms, 0);

        // Becomes ready later: uploads immediately, timer not consumed before
        scheduler.publisher_mut().ready = true;
        let report = block_on(scheduler.tick(2_500));
        assert_eq!(report.upload, Some(Ok(PublishOutcome::Sent)));
        assert_eq!(scheduler.state().upload.last_fire_ms, 2_500);
        assert_eq!(
            scheduler.publisher().uploads[0].1,
            "1970-01-01T01:00:00+01:00"
        );
    }

    #[test]
    fn test_failed_upload_waits_for_next_interval() {
        let elapsed = Cell::new(0);
        let unix = Cell::new(Some(JUNE));
        let fetches = Cell::new(0);

        let reader = SensorReader::new(
            SensorConfig::default(),
            ScriptedAirSensor::always_failing(),
            FixedAnalog::new(&[342]),
            RecordingDelay::new(&elapsed),
        );
        let clock = ClockAdjuster::new(
            ClockConfig::default(),
            StubTimeSource {
                unix_secs: &unix,
                fetches: &fetches,
            },
        );
        let publisher = StubPublisher {
            ready: true,
            fail: true,
            ..Default::default()
        };
        let mut scheduler = Scheduler::new(SCHEDULE, reader, clock, publisher);

        let report = block_on(scheduler.tick(2_000));
        assert_eq!(report.upload, Some(Err(PublishError::Transport)));
        let report = block_on(scheduler.tick(3_000));
        assert_eq!(report.upload, None);
        let report = block_on(scheduler.tick(4_000));
        assert_eq!(report.upload, Some(Err(PublishError::Transport)));
    }

    #[test]
    fn test_default_schedule_never_uploads_before_first_read() {
        let elapsed = Cell::new(0);
        let unix = Cell::new(Some(JUNE));
        let fetches = Cell::new(0);

        let reader = SensorReader::new(
            SensorConfig::default(),
            ScriptedAirSensor::steady(AirSample::new(45.0, 22.0)),
            FixedAnalog::new(&[342]),
            RecordingDelay::new(&elapsed),
        );
        let clock = ClockAdjuster::new(
            ClockConfig::default(),
            StubTimeSource {
                unix_secs: &unix,
                fetches: &fetches,
            },
        );
        let store = RecordingStore::new(StoreResult::Available {
            task: s("createDocument"),
        });
        let publisher = DocumentPublisher::new(DocumentConfig::default(), store);
        let schedule = ScheduleConfig::default();
        assert!(schedule.upload_interval_ms >= schedule.read_interval_ms);
        let mut scheduler = Scheduler::new(schedule, reader, clock, publisher);

        let report = block_on(scheduler.tick(0));
        assert!(!report.read);
        assert_eq!(report.upload, None);

        // Every upload carries a snapshot that was actually read
        let mut now = 0;
        while scheduler.publisher().store().documents.is_empty() {
            now += 1_000;
            assert!(now <= schedule.upload_interval_ms, "no upload by {} ms", now);
            let report = block_on(scheduler.tick(now));
            if report.upload.is_some() {
                assert!(scheduler.reader().has_read());
                assert_eq!(report.upload, Some(Ok(PublishOutcome::Sent)));
            }
        }

        let documents = &scheduler.publisher().store().documents;
        assert_eq!(documents.len(), 1);
        assert!(documents[0].1.contains("\"value\":45"));
        assert!(documents[0].1.contains("\"value\":22"));
        assert!(documents[0].1.contains("\"value\":50"));
    }
}
