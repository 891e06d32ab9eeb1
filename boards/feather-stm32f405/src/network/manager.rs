#![deny(unsafe_code)]
#![deny(warnings)]
//! Network stack manager
//!
//! Exposes the embassy-net stack's DHCP state as a [`NetworkLink`] for the
//! startup wait, and logs the acquired addresses.

use defmt::info;
use embassy_net::Stack;
use hal_abstractions::NetworkLink;

/// Ethernet link backed by the embassy-net stack
#[derive(Clone, Copy)]
pub struct StackLink {
    stack: Stack<'static>,
}

impl StackLink {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }
}

impl NetworkLink for StackLink {
    /// Cable plugged in and DHCP lease acquired
    fn is_up(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }
}

/// Log IP address and gateway
pub fn log_config(stack: &Stack<'_>) {
    if let Some(config) = stack.config_v4() {
        let ip = config.address.address();
        let octets = ip.octets();
        info!(
            "IP: {}.{}.{}.{}",
            octets[0], octets[1], octets[2], octets[3]
        );

        if let Some(gateway) = config.gateway {
            let gw_octets = gateway.octets();
            info!(
                "Gateway: {}.{}.{}.{}",
                gw_octets[0], gw_octets[1], gw_octets[2], gw_octets[3]
            );
        }
    }
}
