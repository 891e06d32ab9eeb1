//! Hardware abstraction traits for IoT firmware
//!
//! This crate defines the traits that separate the greenhouse core logic from
//! the board. BSPs implement these traits; the core only ever sees them.
//!
//! - **`sensor`**: air (humidity/temperature) sensor and analog soil probes
//! - **`time`**: remote wall-clock source used for resynchronization
//! - **`network`**: link status, MQTT transport and cloud document store

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod network;
pub mod sensor;
pub mod time;

pub use network::{DocumentStore, MqttTransport, NetworkLink, StoreResult};
pub use sensor::{AirSample, AirSensor, AnalogReader};
pub use time::TimeSource;
