//! Network time retrieval
//!
//! [`ITimeSource`] is the worker's seam for "what time is it according to
//! the server". [`SntpTimeSource`] answers it with a single client-mode SNTP
//! exchange over UDP and corrects for the round trip using the four
//! timestamps of the exchange.
//!
//! ## Exchange
//!
//! ```text
//! client                      server
//!   T1 ──── request ────────→  T2
//!   T4 ←─── response ───────  T3
//!
//! offset = ((T2 - T1) + (T3 - T4)) / 2
//! time   = T4 + offset
//! ```

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ntpsync_core::domain::ServerAddress;
use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;

use crate::error::WorkerError;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// Size of an SNTP packet without extension fields.
const PACKET_LEN: usize = 48;

/// Protocol version written into requests.
const NTP_VERSION: u8 = 4;

const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;

/// Leap indicator value meaning "clock not synchronized".
const LI_ALARM: u8 = 3;

/// Port trait for retrieving the current time from a server
#[async_trait]
pub trait ITimeSource: Send + Sync {
    /// Returns the current UTC time according to `server`
    async fn fetch_time(&self, server: &ServerAddress) -> Result<DateTime<Utc>, WorkerError>;
}

// ============================================================================
// NTP timestamps
// ============================================================================

/// 64-bit NTP timestamp: seconds since 1900 and a 32-bit binary fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NtpTimestamp {
    seconds: u32,
    fraction: u32,
}

impl NtpTimestamp {
    fn from_datetime(t: DateTime<Utc>) -> Self {
        // Truncation to u32 selects the NTP era
        let seconds = (t.timestamp() + NTP_UNIX_OFFSET) as u32;
        let fraction = ((u64::from(t.timestamp_subsec_nanos()) << 32) / 1_000_000_000) as u32;
        Self { seconds, fraction }
    }

    fn to_datetime(self) -> Option<DateTime<Utc>> {
        let mut seconds = i64::from(self.seconds);
        // Era 1 starts in 2036; values with the top bit clear belong to it
        if self.seconds & 0x8000_0000 == 0 {
            seconds += 1 << 32;
        }
        let nanos = ((u64::from(self.fraction) * 1_000_000_000) >> 32) as u32;
        DateTime::<Utc>::from_timestamp(seconds - NTP_UNIX_OFFSET, nanos)
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            seconds: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            fraction: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }

    fn write(self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.seconds.to_be_bytes());
        buf[4..8].copy_from_slice(&self.fraction.to_be_bytes());
    }

    fn is_zero(self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }
}

// ============================================================================
// Packet encoding
// ============================================================================

/// Builds a client request whose transmit timestamp is `originate`
fn build_request(originate: NtpTimestamp) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = (NTP_VERSION << 3) | MODE_CLIENT;
    originate.write(&mut packet[40..48]);
    packet
}

/// Server-side timestamps of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ServerTimes {
    /// T2: request arrival at the server
    receive: DateTime<Utc>,
    /// T3: response departure from the server
    transmit: DateTime<Utc>,
}

impl ServerTimes {
    /// Clock value at `t4` given the local send (`t1`) and receive (`t4`) times
    fn clock_at(&self, t1: DateTime<Utc>, t4: DateTime<Utc>) -> DateTime<Utc> {
        let offset = ((self.receive - t1) + (self.transmit - t4)) / 2;
        t4 + offset
    }
}

/// Validates a server response to a request sent with `originate`
fn parse_response(buf: &[u8], originate: NtpTimestamp) -> Result<ServerTimes, WorkerError> {
    if buf.len() < PACKET_LEN {
        return Err(WorkerError::InvalidResponse(format!(
            "short packet: {} bytes",
            buf.len()
        )));
    }

    let leap = buf[0] >> 6;
    let mode = buf[0] & 0x07;
    let stratum = buf[1];

    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(WorkerError::InvalidResponse(format!(
            "unexpected mode {mode}"
        )));
    }
    if leap == LI_ALARM {
        return Err(WorkerError::InvalidResponse(
            "server clock is not synchronized".into(),
        ));
    }
    if stratum == 0 {
        let code = String::from_utf8_lossy(&buf[12..16]).trim_end_matches('\0').to_string();
        return Err(WorkerError::InvalidResponse(format!(
            "kiss-o'-death from server: {code}"
        )));
    }
    if stratum > 15 {
        return Err(WorkerError::InvalidResponse(format!(
            "invalid stratum {stratum}"
        )));
    }
    if NtpTimestamp::read(&buf[24..32]) != originate {
        return Err(WorkerError::InvalidResponse(
            "originate timestamp does not match request".into(),
        ));
    }

    let transmit = NtpTimestamp::read(&buf[40..48]);
    if transmit.is_zero() {
        return Err(WorkerError::InvalidResponse(
            "zero transmit timestamp".into(),
        ));
    }
    let receive = NtpTimestamp::read(&buf[32..40]);

    let out_of_range = || WorkerError::InvalidResponse("timestamp out of range".into());
    Ok(ServerTimes {
        receive: receive.to_datetime().ok_or_else(out_of_range)?,
        transmit: transmit.to_datetime().ok_or_else(out_of_range)?,
    })
}

// ============================================================================
// SntpTimeSource
// ============================================================================

/// Simple Network Time Protocol client
///
/// Resolution, send and receive together are bounded by `timeout`; when it
/// elapses the result is [`WorkerError::Timeout`].
#[derive(Debug, Clone)]
pub struct SntpTimeSource {
    timeout: Duration,
}

impl SntpTimeSource {
    /// Creates a client with the given overall timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn exchange(&self, server: &ServerAddress) -> Result<DateTime<Utc>, WorkerError> {
        let target = server.to_socket_target();
        let addr = lookup_host(&target)
            .await
            .map_err(|e| WorkerError::Resolve {
                server: server.to_string(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| WorkerError::Resolve {
                server: server.to_string(),
                reason: "no addresses".into(),
            })?;

        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(addr).await?;

        let t1 = Utc::now();
        let originate = NtpTimestamp::from_datetime(t1);
        socket.send(&build_request(originate)).await?;
        debug!(server = %server, peer = %addr, "SNTP request sent");

        let mut buf = [0u8; 512];
        let len = socket.recv(&mut buf).await?;
        let t4 = Utc::now();

        let times = parse_response(&buf[..len], originate)?;
        let now = times.clock_at(t1, t4);
        debug!(
            server = %server,
            rtt_ms = (t4 - t1).num_milliseconds(),
            offset_ms = (now - t4).num_milliseconds(),
            "SNTP response accepted"
        );
        Ok(now)
    }
}

#[async_trait]
impl ITimeSource for SntpTimeSource {
    async fn fetch_time(&self, server: &ServerAddress) -> Result<DateTime<Utc>, WorkerError> {
        tokio::time::timeout(self.timeout, self.exchange(server))
            .await
            .map_err(|_| WorkerError::Timeout {
                server: server.to_string(),
                after: self.timeout,
            })?
    }
}
