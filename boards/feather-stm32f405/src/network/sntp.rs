#![deny(unsafe_code)]
#![deny(warnings)]
//! SNTP client used as the clock adjuster's time source
//!
//! One 48-byte NTPv3 client request over UDP per attempt; the transmit
//! timestamp of the reply is corrected by half the round trip.

use defmt::{error, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Instant, Timer};
use hal_abstractions::TimeSource;

use super::config::SntpConfig;
use super::error::NetworkError;

/// Seconds between the NTP era (1900) and the Unix epoch (1970)
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// SNTP client for time synchronization
pub struct SntpClient {
    stack: Stack<'static>,
    config: SntpConfig,
}

impl SntpClient {
    pub fn new(stack: Stack<'static>, config: SntpConfig) -> Self {
        Self { stack, config }
    }

    /// Try every server in order until one answers
    async fn sync(&self) -> Result<u64, NetworkError> {
        for server in self.config.servers {
            for attempt in 0..self.config.retry_count {
                info!(
                    "Attempting SNTP sync with {} (attempt {})",
                    server,
                    attempt + 1
                );
                match self.sntp_request(server).await {
                    Ok(unix_secs) => return Ok(unix_secs),
                    Err(e) => {
                        warn!("SNTP request to {} failed: {:?}", server, e);
                        Timer::after_millis(self.config.retry_delay_ms).await;
                    }
                }
            }
        }
        error!("All SNTP sync attempts failed");
        Err(NetworkError::AllServersFailed)
    }

    async fn sntp_request(&self, server: &str) -> Result<u64, NetworkError> {
        let server_ip = self
            .stack
            .dns_query(server, DnsQueryType::A)
            .await
            .map_err(|_| NetworkError::DnsError)?
            .first()
            .copied()
            .ok_or(NetworkError::DnsError)?;

        let server_endpoint = IpEndpoint::new(server_ip, 123);

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NetworkError::SocketError)?;

        // NTP request: LI=0, VN=3, Mode=3 (Client)
        let mut ntp_packet = [0u8; 48];
        ntp_packet[0] = 0x1B;
        let transmit_time = Instant::now();
        socket
            .send_to(&ntp_packet, server_endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)?;

        let mut response = [0u8; 48];
        let timeout = Timer::after(Duration::from_millis(self.config.timeout_ms));
        let (recv_len, from_addr) = match select(timeout, socket.recv_from(&mut response)).await {
            Either::First(_) => return Err(NetworkError::Timeout),
            Either::Second(result) => result.map_err(|_| NetworkError::SocketError)?,
        };
        let rtt = Instant::now().duration_since(transmit_time);

        if recv_len < 48 || from_addr.endpoint.addr != server_ip {
            warn!(
                "Unexpected {} byte reply from {}",
                recv_len,
                Debug2Format(&from_addr)
            );
            return Err(NetworkError::InvalidResponse);
        }

        let stratum = response[1];
        if stratum == 0 || stratum > self.config.max_stratum {
            warn!(
                "Invalid stratum {} (max {})",
                stratum, self.config.max_stratum
            );
            return Err(NetworkError::ServerError);
        }

        let tx_secs =
            u32::from_be_bytes([response[40], response[41], response[42], response[43]]) as u64;
        let tx_frac =
            u32::from_be_bytes([response[44], response[45], response[46], response[47]]) as u64;
        if tx_secs < NTP_UNIX_OFFSET {
            return Err(NetworkError::InvalidResponse);
        }

        // Fraction in microseconds, plus RTT/2, rounded to whole seconds
        let micros = ((tx_frac * 1_000_000) >> 32) + rtt.as_micros() / 2;
        let unix_secs = tx_secs - NTP_UNIX_OFFSET + (micros + 500_000) / 1_000_000;

        info!(
            "NTP time from {}: {} UTC (stratum {}, RTT {} µs)",
            server,
            unix_secs,
            stratum,
            rtt.as_micros()
        );
        Ok(unix_secs)
    }
}

impl TimeSource for SntpClient {
    type Error = NetworkError;

    async fn fetch_unix_secs(&mut self) -> Result<u64, Self::Error> {
        self.sync().await
    }
}
