#![deny(warnings)]
//! Network side of the board
//!
//! - **`config`**: SNTP and stack settings with `Default` implementations
//! - **`error`**: Error enum shared by every network client
//! - **`manager`**: Link status of the embassy-net stack
//! - **`mqtt`**: Connect-per-publish MQTT transport
//! - **`sntp`**: SNTP time source for the clock adjuster
//! - **`socket`**: Async TCP socket wrapper for embedded-io-async
//!
//! Each client implements one of the `hal-abstractions` traits, so the core
//! scheduler drives them without knowing about embassy-net.

pub mod config;
pub mod error;
pub mod manager;
pub mod mqtt;
pub mod sntp;
pub mod socket;

pub use config::{NetworkConfig, SntpConfig};
pub use manager::StackLink;
pub use mqtt::MqttLink;
pub use sntp::SntpClient;
