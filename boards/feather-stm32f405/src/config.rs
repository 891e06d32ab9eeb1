#![deny(unsafe_code)]
#![deny(warnings)]
//! Node configuration for the Feather greenhouse build
//!
//! Built once in the network task and never changed.

use greenhouse_core::config::{
    AirSensorConfig, DeviceConfig, GreenhouseConfig, MqttConfig, SensorConfig,
    SoilSensorConfig,
};
use greenhouse_core::SoilCalibration;

use crate::network::{NetworkConfig, SntpConfig};

/// Probes wired to A0 and A1
const SOIL_SENSORS: &[SoilSensorConfig] = &[
    SoilSensorConfig::new(0, "soil_moisture", SoilCalibration::new(478, 206)),
    SoilSensorConfig::new(1, "soil_moisture_2", SoilCalibration::new(478, 206)),
];

pub struct BoardConfig {
    pub node: GreenhouseConfig,
    pub network: NetworkConfig,
    pub sntp: SntpConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        let node = GreenhouseConfig {
            device: DeviceConfig {
                id: "feather-1",
                location: "greenhouse",
            },
            sensors: SensorConfig {
                // DHT22 data line on D5 (PC7)
                air: AirSensorConfig {
                    enabled: true,
                    pin: 5,
                },
                soil: SOIL_SENSORS,
                ..SensorConfig::default()
            },
            mqtt: MqttConfig {
                broker_host: "192.168.1.10",
                ..MqttConfig::default()
            },
            ..GreenhouseConfig::default()
        };

        Self {
            node,
            network: NetworkConfig::default(),
            sntp: SntpConfig::default(),
        }
    }
}
