//! Stub collaborators shared by the unit tests

use core::cell::Cell;

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{
    AirSample, AirSensor, AnalogReader, DocumentStore, MqttTransport, NetworkLink, StoreResult,
    TimeSource,
};
use heapless::{String, Vec};

/// Delay that returns immediately and adds the requested time to a counter
pub struct RecordingDelay<'a> {
    elapsed_ms: &'a Cell<u64>,
    pending_ns: u64,
}

impl<'a> RecordingDelay<'a> {
    pub fn new(elapsed_ms: &'a Cell<u64>) -> Self {
        Self {
            elapsed_ms,
            pending_ns: 0,
        }
    }
}

impl DelayNs for RecordingDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.pending_ns += ns as u64;
        let whole_ms = self.pending_ns / 1_000_000;
        self.pending_ns %= 1_000_000;
        self.elapsed_ms.set(self.elapsed_ms.get() + whole_ms);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms.set(self.elapsed_ms.get() + ms as u64);
    }
}

#[derive(Debug)]
pub struct SensorTimeout;

/// Air sensor that fails a fixed number of times, then answers once
///
/// After the scripted answer it keeps returning NaN, like a sensor that
/// dropped off the bus, unless built with [`ScriptedAirSensor::steady`].
pub struct ScriptedAirSensor {
    failures: usize,
    as_error: bool,
    repeat: bool,
    answer: Option<AirSample>,
    pub calls: usize,
}

impl ScriptedAirSensor {
    pub fn failing_then(failures: usize, answer: AirSample) -> Self {
        Self {
            failures,
            as_error: false,
            repeat: false,
            answer: Some(answer),
            calls: 0,
        }
    }

    /// Answers every read with the same sample
    pub fn steady(answer: AirSample) -> Self {
        Self {
            repeat: true,
            ..Self::failing_then(0, answer)
        }
    }

    pub fn erroring_then(failures: usize, answer: AirSample) -> Self {
        Self {
            as_error: true,
            ..Self::failing_then(failures, answer)
        }
    }

    pub fn always_failing() -> Self {
        Self {
            failures: usize::MAX,
            as_error: false,
            repeat: false,
            answer: None,
            calls: 0,
        }
    }
}

impl AirSensor for ScriptedAirSensor {
    type Error = SensorTimeout;

    async fn read(&mut self) -> Result<AirSample, Self::Error> {
        self.calls += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return if self.as_error {
                Err(SensorTimeout)
            } else {
                Ok(AirSample::INVALID)
            };
        }
        let answer = if self.repeat {
            self.answer
        } else {
            self.answer.take()
        };
        Ok(answer.unwrap_or(AirSample::INVALID))
    }
}

#[derive(Debug)]
pub struct NoSuchPin;

/// ADC returning a fixed value per pin; pin N reads `values[N]`
pub struct FixedAnalog {
    values: &'static [u16],
}

impl FixedAnalog {
    pub fn new(values: &'static [u16]) -> Self {
        Self { values }
    }
}

impl AnalogReader for FixedAnalog {
    type Error = NoSuchPin;

    async fn read_raw(&mut self, pin: u8) -> Result<u16, Self::Error> {
        self.values.get(pin as usize).copied().ok_or(NoSuchPin)
    }
}

#[derive(Debug)]
pub struct Unreachable;

/// Time source answering from a fixed value, counting contacts
pub struct StubTimeSource<'a> {
    pub unix_secs: &'a Cell<Option<u64>>,
    pub fetches: &'a Cell<u32>,
}

impl TimeSource for StubTimeSource<'_> {
    type Error = Unreachable;

    async fn fetch_unix_secs(&mut self) -> Result<u64, Self::Error> {
        self.fetches.set(self.fetches.get() + 1);
        self.unix_secs.get().ok_or(Unreachable)
    }
}

/// MQTT transport that records what was published
#[derive(Default)]
pub struct RecordingMqtt {
    pub connected: bool,
    pub fail: bool,
    pub polls: u32,
    pub published: Vec<(String<64>, String<256>), 8>,
}

impl MqttTransport for RecordingMqtt {
    type Error = Unreachable;

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn poll(&mut self) {
        self.polls += 1;
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(Unreachable);
        }
        let mut t = String::new();
        let _ = t.push_str(topic);
        let mut p = String::new();
        let _ = p.push_str(core::str::from_utf8(payload).unwrap_or("<binary>"));
        let _ = self.published.push((t, p));
        Ok(())
    }
}

/// Document store answering every write with a preset result
pub struct RecordingStore {
    pub ready: bool,
    pub answer: StoreResult,
    pub polls: u32,
    pub documents: Vec<(String<64>, String<512>), 4>,
}

impl RecordingStore {
    pub fn new(answer: StoreResult) -> Self {
        Self {
            ready: true,
            answer,
            polls: 0,
            documents: Vec::new(),
        }
    }
}

impl DocumentStore for RecordingStore {
    async fn poll(&mut self) {
        self.polls += 1;
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn create_document(&mut self, path: &str, body: &str) -> StoreResult {
        let mut p = String::new();
        let _ = p.push_str(path);
        let mut b = String::new();
        let _ = b.push_str(body);
        let _ = self.documents.push((p, b));
        self.answer.clone()
    }
}

/// Link that comes up after a number of polls
pub struct DelayedLink {
    pub up_after: Cell<u32>,
}

impl NetworkLink for DelayedLink {
    fn is_up(&self) -> bool {
        let remaining = self.up_after.get();
        if remaining == 0 {
            return true;
        }
        self.up_after.set(remaining - 1);
        false
    }
}

/// Convenience for building heapless strings in assertions
pub fn s<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    let _ = out.push_str(text);
    out
}
