#![deny(warnings)]
//! MQTT v5.0 transport over plain TCP
//!
//! Readings go out every upload interval, far longer than any useful
//! keep-alive, so every publish opens its own session:
//! DNS → TCP connect → CONNECT/CONNACK → PUBLISH (QoS 0) → DISCONNECT →
//! TCP close. The socket is lent to the client so it can be closed after
//! the client is done with it.
//!
//! # Memory Management
//!
//! Uses the bump allocator from `rust-mqtt`; all buffers live inside
//! [`MqttLink`] and are reused for every session:
//! - MQTT packet buffer: 2KB for packet assembly
//! - TCP buffers: 2KB each direction

#![allow(unsafe_code)] // TopicName::new_unchecked

use defmt::{debug, error, info, warn, Debug2Format};
use embassy_net::{dns::DnsQueryType, IpEndpoint, Stack};
use greenhouse_core::config::MqttConfig;
use hal_abstractions::{MqttTransport, NetworkLink};
use heapless::String;
use rust_mqtt::{
    buffer::BumpBuffer,
    client::{
        options::{ConnectOptions, DisconnectOptions, PublicationOptions, TopicReference},
        Client,
    },
    config::{KeepAlive, SessionExpiryInterval},
    types::{MqttString, QoS, TopicName},
    Bytes,
};

use crate::device_id::{self, CLIENT_ID_MAX_LEN};

use super::error::NetworkError;
use super::manager::StackLink;
use super::socket::AsyncTcpSocket;

/// MQTT packet buffer size: 2KB for packet assembly
const MQTT_BUFFER_SIZE: usize = 2048;

/// TCP socket buffer size per direction
const TCP_BUFFER_SIZE: usize = 2048;

/// Connect-per-publish MQTT transport
pub struct MqttLink {
    stack: Stack<'static>,
    config: MqttConfig,
    client_id: String<CLIENT_ID_MAX_LEN>,
    link_up: bool,
    mqtt_buffer: [u8; MQTT_BUFFER_SIZE],
    rx_buffer: [u8; TCP_BUFFER_SIZE],
    tx_buffer: [u8; TCP_BUFFER_SIZE],
}

impl MqttLink {
    pub fn new(stack: Stack<'static>, config: MqttConfig) -> Self {
        let client_id = device_id::mqtt_client_id();
        info!(
            "MQTT broker {}:{}, client ID {}",
            config.broker_host,
            config.broker_port,
            client_id.as_str()
        );
        Self {
            stack,
            config,
            client_id,
            link_up: false,
            mqtt_buffer: [0; MQTT_BUFFER_SIZE],
            rx_buffer: [0; TCP_BUFFER_SIZE],
            tx_buffer: [0; TCP_BUFFER_SIZE],
        }
    }

    async fn resolve_broker(&self) -> Result<IpEndpoint, NetworkError> {
        let server_ip = self
            .stack
            .dns_query(self.config.broker_host, DnsQueryType::A)
            .await
            .map_err(|e| {
                error!("DNS query failed: {:?}", Debug2Format(&e));
                NetworkError::DnsError
            })?
            .first()
            .copied()
            .ok_or_else(|| {
                error!("DNS returned no results for {}", self.config.broker_host);
                NetworkError::DnsError
            })?;

        Ok(IpEndpoint::new(server_ip, self.config.broker_port))
    }

    async fn session_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), NetworkError> {
        let endpoint = self.resolve_broker().await?;

        let mut socket = AsyncTcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.connect(endpoint).await?;
        debug!("TCP connection established to {}", Debug2Format(&endpoint));

        let result = run_session(
            &mut socket,
            &mut self.mqtt_buffer,
            self.client_id.as_str(),
            self.config.keep_alive_secs,
            topic,
            payload,
        )
        .await;

        if let Err(e) = socket.close().await {
            warn!("TCP close to {} failed: {}", Debug2Format(&endpoint), e);
        }
        result
    }
}

/// CONNECT, PUBLISH (QoS 0) and DISCONNECT over an open socket
async fn run_session(
    socket: &mut AsyncTcpSocket<'_>,
    mqtt_buffer: &mut [u8],
    client_id: &str,
    keep_alive_secs: u16,
    topic: &str,
    payload: &[u8],
) -> Result<(), NetworkError> {
    let mut buffer = BumpBuffer::new(mqtt_buffer);
    let mut mqtt_client = Client::<'_, _, _, 1, 1, 1, 0>::new(&mut buffer);

    let connect_opts = ConnectOptions {
        session_expiry_interval: SessionExpiryInterval::EndOnDisconnect,
        clean_start: true,
        keep_alive: if keep_alive_secs == 0 {
            KeepAlive::Infinite
        } else {
            KeepAlive::Seconds(keep_alive_secs)
        },
        will: None,
        user_name: None,
        password: None,
    };

    let mqtt_client_id = MqttString::new(client_id.into()).map_err(|e| {
        error!(
            "Failed to create MQTT client ID string: {:?}",
            Debug2Format(&e)
        );
        NetworkError::MqttProtocolError
    })?;

    mqtt_client
        .connect(socket, &connect_opts, Some(mqtt_client_id))
        .await
        .map_err(|e| {
            error!("MQTT connect failed: {:?}", Debug2Format(&e));
            NetworkError::MqttConnectionFailed
        })?;

    // SAFETY: topics come from `greenhouse_core::payload::mqtt_topic`,
    // which rejects wildcard and NUL characters.
    let topic_name = unsafe {
        TopicName::new_unchecked(MqttString::new(topic.into()).map_err(|e| {
            error!("Failed to create MQTT topic string: {:?}", Debug2Format(&e));
            NetworkError::MqttProtocolError
        })?)
    };

    let pub_options = PublicationOptions {
        retain: false,
        message_expiry_interval: None,
        topic: TopicReference::Name(topic_name),
        qos: QoS::AtMostOnce,
    };

    mqtt_client
        .publish(&pub_options, Bytes::from(payload))
        .await
        .map_err(|e| {
            error!("MQTT publish failed: {:?}", Debug2Format(&e));
            NetworkError::MqttPublishFailed
        })?;

    // Payload is already out; a failed DISCONNECT is not an upload failure
    let disconnect_opts = DisconnectOptions {
        publish_will: false,
        session_expiry_interval: None,
    };
    if let Err(e) = mqtt_client.disconnect(&disconnect_opts).await {
        warn!("MQTT disconnect failed: {:?}", Debug2Format(&e));
    }

    Ok(())
}

impl MqttTransport for MqttLink {
    type Error = NetworkError;

    /// Sessions are opened on demand; ready whenever the IP link is
    fn is_connected(&self) -> bool {
        self.link_up
    }

    async fn poll(&mut self) {
        let up = StackLink::new(self.stack).is_up();
        if up != self.link_up {
            if up {
                info!("Network link restored");
            } else {
                warn!("Network link lost, uploads paused");
            }
            self.link_up = up;
        }
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        self.session_publish(topic, payload).await
    }
}
