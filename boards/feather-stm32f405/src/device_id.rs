#![deny(unsafe_code)]
#![deny(warnings)]
//! Device identifier utilities for STM32F405
//!
//! The factory-programmed 96-bit unique device ID is stable across reboots
//! and unique to each chip. It becomes the MQTT client ID, while the
//! configured device id names the topic.

use heapless::String;

/// Format: "stm32f405-" (10 chars) + 24 hex chars = 34 chars total
pub const CLIENT_ID_MAX_LEN: usize = 34;

const CLIENT_ID_PREFIX: &str = "stm32f405-";

/// Get the STM32F405 unique device ID as a 24-character hex string
pub fn uid_hex() -> &'static str {
    embassy_stm32::uid::uid_hex()
}

/// Generate an MQTT client ID, `stm32f405-{24_hex_chars}`
pub fn mqtt_client_id() -> String<CLIENT_ID_MAX_LEN> {
    let mut client_id = String::new();
    // Prefix and a 24-char UID fill the buffer exactly
    let _ = client_id.push_str(CLIENT_ID_PREFIX);
    let _ = client_id.push_str(uid_hex());
    client_id
}
