//! Upload payload builders
//!
//! JSON is written by hand into fixed-capacity buffers. Keys of the MQTT
//! payload are present only for sensors that read successfully this pass;
//! consumers treat a missing key as "unknown", never as zero.

use core::fmt::Write;

use heapless::String;

use crate::error::PayloadError;
use crate::sensor::ReaderState;

/// Capacity of the compact MQTT payload
pub const MQTT_PAYLOAD_LEN: usize = 256;

/// Capacity of the nested document payload
pub const DOCUMENT_PAYLOAD_LEN: usize = 512;

/// Capacity of an MQTT topic
pub const TOPIC_LEN: usize = 64;

/// Build `<prefix>/<device_id>`
///
/// Topic names may not contain wildcards (`+`, `#`) or NUL.
pub fn mqtt_topic(prefix: &str, device_id: &str) -> Result<String<TOPIC_LEN>, PayloadError> {
    for part in [prefix, device_id] {
        if part.contains(['+', '#', '\0']) {
            return Err(PayloadError::InvalidTopic);
        }
    }
    let mut topic = String::new();
    write!(topic, "{}/{}", prefix, device_id)?;
    Ok(topic)
}

/// Compact payload, e.g. `{"temperature":21.5,"humidity":40.2,"soil_moisture":37}`
pub fn mqtt_payload(state: &ReaderState) -> Result<String<MQTT_PAYLOAD_LEN>, PayloadError> {
    let mut payload = String::new();
    let mut first = true;

    payload.push('{').map_err(|_| PayloadError::Capacity)?;

    if state.air_enabled && state.air.success {
        write!(
            payload,
            "\"temperature\":{:.1},\"humidity\":{:.1}",
            state.air.temperature, state.air.humidity
        )?;
        first = false;
    }

    for probe in state.soil.iter().filter(|p| p.success) {
        if !first {
            payload.push(',').map_err(|_| PayloadError::Capacity)?;
        }
        write!(payload, "\"{}\":{}", probe.name, probe.percent)?;
        first = false;
    }

    payload.push('}').map_err(|_| PayloadError::Capacity)?;
    Ok(payload)
}

/// Nested document for the cloud store
///
/// Air values are written as-is; callers skip the upload when they are NaN.
/// The `air` section is left out when the air sensor is disabled. Soil
/// moisture is the first configured probe; the `soil` section is left out
/// when no probe is configured.
pub fn document_payload(
    state: &ReaderState,
    timestamp: &str,
) -> Result<String<DOCUMENT_PAYLOAD_LEN>, PayloadError> {
    let mut doc = String::new();

    write!(doc, "{{\"timestamp\":\"{}\",\"sensors\":{{", timestamp)?;
    if state.air_enabled {
        write!(
            doc,
            "\"air\":{{\"humidity\":{{\"unit\":\"Percent\",\"value\":{}}},\
             \"temperature\":{{\"unit\":\"Celsius\",\"value\":{}}}}}",
            state.air.humidity, state.air.temperature
        )?;
    }
    if let Some(probe) = state.soil.first() {
        if state.air_enabled {
            doc.push(',').map_err(|_| PayloadError::Capacity)?;
        }
        write!(
            doc,
            "\"soil\":{{\"moisture\":{{\"unit\":\"%\",\"value\":{}}}}}",
            probe.percent
        )?;
    }
    write!(doc, "}}}}")?;

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{AirReading, SoilReading};
    use heapless::Vec;

    fn soil(name: &'static str, percent: u8, success: bool) -> SoilReading {
        SoilReading {
            name,
            raw: 300,
            percent,
            success,
        }
    }

    fn state(air_enabled: bool, air_success: bool, soil: &[SoilReading]) -> ReaderState {
        ReaderState {
            air_enabled,
            air: AirReading {
                humidity: 40.24,
                temperature: 21.46,
                success: air_success,
            },
            soil: Vec::from_slice(soil).unwrap(),
        }
    }

    #[test]
    fn test_topic() {
        let topic = mqtt_topic("greenhouse", "arduino-1").unwrap();
        assert_eq!(topic.as_str(), "greenhouse/arduino-1");
    }

    #[test]
    fn test_topic_too_long() {
        let long = "x".repeat(TOPIC_LEN);
        assert_eq!(mqtt_topic("greenhouse", &long), Err(PayloadError::Capacity));
    }

    #[test]
    fn test_topic_rejects_wildcards() {
        assert_eq!(
            mqtt_topic("greenhouse/+", "arduino-1"),
            Err(PayloadError::InvalidTopic)
        );
        assert_eq!(
            mqtt_topic("greenhouse", "node#1"),
            Err(PayloadError::InvalidTopic)
        );
    }

    #[test]
    fn test_soil_only_payload() {
        let state = state(false, false, &[soil("a", 10, true), soil("b", 20, true)]);
        let payload = mqtt_payload(&state).unwrap();
        assert_eq!(payload.as_str(), "{\"a\":10,\"b\":20}");
    }

    #[test]
    fn test_full_payload_rounds_to_one_decimal() {
        let state = state(true, true, &[soil("soil_moisture", 37, true)]);
        let payload = mqtt_payload(&state).unwrap();
        assert_eq!(
            payload.as_str(),
            "{\"temperature\":21.5,\"humidity\":40.2,\"soil_moisture\":37}"
        );
    }

    #[test]
    fn test_failed_sensors_are_omitted() {
        let state = state(true, false, &[soil("a", 0, false), soil("b", 55, true)]);
        let payload = mqtt_payload(&state).unwrap();
        assert_eq!(payload.as_str(), "{\"b\":55}");
    }

    #[test]
    fn test_nothing_valid_gives_empty_object() {
        let state = state(true, false, &[soil("a", 0, false)]);
        assert_eq!(mqtt_payload(&state).unwrap().as_str(), "{}");
    }

    #[test]
    fn test_document_payload() {
        let mut state = state(true, true, &[soil("soil_moisture", 37, true), soil("b", 90, true)]);
        state.air.humidity = 40.5;
        state.air.temperature = 21.25;
        let doc = document_payload(&state, "2024-06-15T12:00:00+02:00").unwrap();
        assert_eq!(
            doc.as_str(),
            "{\"timestamp\":\"2024-06-15T12:00:00+02:00\",\"sensors\":{\
             \"air\":{\"humidity\":{\"unit\":\"Percent\",\"value\":40.5},\
             \"temperature\":{\"unit\":\"Celsius\",\"value\":21.25}},\
             \"soil\":{\"moisture\":{\"unit\":\"%\",\"value\":37}}}}"
        );
    }

    #[test]
    fn test_document_without_air_sensor() {
        let state = state(false, false, &[soil("soil_moisture", 37, true)]);
        let doc = document_payload(&state, "2024-06-15T12:00:00+02:00").unwrap();
        assert_eq!(
            doc.as_str(),
            "{\"timestamp\":\"2024-06-15T12:00:00+02:00\",\"sensors\":{\
             \"soil\":{\"moisture\":{\"unit\":\"%\",\"value\":37}}}}"
        );
    }

    #[test]
    fn test_document_without_soil_sensors() {
        let mut state = state(true, true, &[]);
        state.air.humidity = 50.0;
        state.air.temperature = -3.5;
        let doc = document_payload(&state, "1970-01-01T01:00:00+01:00").unwrap();
        assert!(doc.ends_with("\"value\":-3.5}}}}"));
        assert!(!doc.contains("soil"));
    }
}
