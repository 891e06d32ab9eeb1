//! Node configuration structures
//!
//! Everything is supplied once at startup and never mutated. Defaults match
//! the windowsill prototype: one DHT22 on pin 2 and one soil probe.

use crate::calibration::SoilCalibration;

/// Maximum number of soil probes a node reads
pub const MAX_SOIL_SENSORS: usize = 6;

/// Identity of this node
#[derive(Debug, Clone, Copy)]
pub struct DeviceConfig {
    /// Unique device id, used in the MQTT topic
    pub id: &'static str,
    /// Free-form placement label
    pub location: &'static str,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: "arduino-1",
            location: "windowsill",
        }
    }
}

/// Combined humidity/temperature sensor settings
#[derive(Debug, Clone, Copy)]
pub struct AirSensorConfig {
    pub enabled: bool,
    /// Data pin of the single-wire bus
    pub pin: u8,
}

impl Default for AirSensorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pin: 2,
        }
    }
}

/// One analog soil probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoilSensorConfig {
    /// ADC pin identifier understood by the board's `AnalogReader`
    pub pin: u8,
    /// Name used in logs and as the MQTT payload key
    pub name: &'static str,
    pub calibration: SoilCalibration,
}

impl SoilSensorConfig {
    pub const fn new(pin: u8, name: &'static str, calibration: SoilCalibration) -> Self {
        Self {
            pin,
            name,
            calibration,
        }
    }
}

/// Default probe list: a single probe on A0
pub const DEFAULT_SOIL_SENSORS: &[SoilSensorConfig] = &[SoilSensorConfig::new(
    0,
    "soil_moisture",
    SoilCalibration::new(478, 206),
)];

/// Retry policy for the noisy digital sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per pass (0 is treated as 1)
    pub max_retries: u8,
    /// Pause between attempts in milliseconds
    pub retry_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// Everything the sensor reader needs
#[derive(Debug, Clone, Copy)]
pub struct SensorConfig {
    pub air: AirSensorConfig,
    pub soil: &'static [SoilSensorConfig],
    pub retry: RetryPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            air: AirSensorConfig::default(),
            soil: DEFAULT_SOIL_SENSORS,
            retry: RetryPolicy::default(),
        }
    }
}

/// Scheduler intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Sensor read interval in milliseconds
    pub read_interval_ms: u32,
    /// Upload/publish interval in milliseconds
    pub upload_interval_ms: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            read_interval_ms: 2_000,
            upload_interval_ms: 30_000,
        }
    }
}

/// Clock adjuster settings
///
/// Two fixed UTC offsets: `standard` in winter, `daylight` in summer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Minimum spacing between remote time source contacts (ms of uptime)
    pub resync_interval_ms: u32,
    /// Winter offset from UTC in seconds (CET)
    pub standard_offset_secs: i32,
    /// Summer offset from UTC in seconds (CEST)
    pub daylight_offset_secs: i32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            resync_interval_ms: 60_000,
            standard_offset_secs: 3600,
            daylight_offset_secs: 7200,
        }
    }
}

/// MQTT publishing settings
#[derive(Debug, Clone, Copy)]
pub struct MqttConfig {
    /// Broker hostname or dotted IPv4 address
    pub broker_host: &'static str,
    /// Broker port (1883 for plain MQTT)
    pub broker_port: u16,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Topic prefix; the device id is appended as `<prefix>/<id>`
    pub topic_prefix: &'static str,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "192.168.1.1",
            broker_port: 1883,
            keep_alive_secs: 60,
            topic_prefix: "greenhouse",
        }
    }
}

/// Cloud document store settings
#[derive(Debug, Clone, Copy)]
pub struct DocumentConfig {
    /// Collection path new readings are created under
    pub path: &'static str,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: "devices/growbox/readings",
        }
    }
}

/// Link bring-up settings for the blocking startup phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Poll period while waiting for the link
    pub poll_ms: u32,
    /// Give up after this many polls; `None` waits forever
    pub max_attempts: Option<u32>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_ms: 300,
            max_attempts: None,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenhouseConfig {
    pub device: DeviceConfig,
    pub sensors: SensorConfig,
    pub schedule: ScheduleConfig,
    pub clock: ClockConfig,
    pub mqtt: MqttConfig,
    pub document: DocumentConfig,
    pub link: LinkConfig,
}
