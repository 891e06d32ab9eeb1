//! Platform-agnostic core logic for the greenhouse sensor node
//!
//! This crate contains the decision logic shared by every board: soil probe
//! calibration, sensor acquisition with retry, the adjusted wall clock, the
//! interval scheduler and the upload payloads. It has NO hardware
//! dependencies; boards plug in through the `hal-abstractions` traits.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

#[macro_use]
mod fmt;

pub mod calendar;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod dht;
pub mod error;
pub mod network;
pub mod payload;
pub mod publish;
pub mod scheduler;
pub mod sensor;

#[cfg(test)]
mod testing;

pub use calibration::{map_calibration, Calibrated, SoilCalibration};
pub use clock::{format_local_timestamp, is_daylight, ClockAdjuster, UtcOffset};
pub use config::GreenhouseConfig;
pub use error::{LinkError, PayloadError, PublishError, TimeError};
pub use network::{wait_for_link, LinkWait};
pub use publish::{DocumentPublisher, MqttPublisher, PublishOutcome, Publisher};
pub use scheduler::{IntervalTimer, Scheduler, TickReport};
pub use sensor::{ReaderState, SensorReader};
