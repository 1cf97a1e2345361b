//! Network Time Protocol client time source
//!
//! Implements just enough of the NTP v3 client side (RFC 1305) to estimate
//! the offset between the local clock and a time server:
//!
//! ```text
//! offset = ((receive - origin) + (transmit - destination)) / 2
//! ```
//!
//! Each [`TimeSource::time`] call performs one request/reply exchange over a
//! UDP socket that is opened on construction and released by
//! [`NtpTimeSource::close`] (or on drop). There are no retries: a request
//! that gets no reply within the timeout fails with
//! `OtpError::TimeSyncError`.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use rand::Rng;
use tracing::{debug, warn};

use super::{unix_seconds_f64, TimeSource};
use crate::error::OtpError;

/// Time-out for time requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Well-known NTP port
pub const NTP_PORT: u16 = 123;

/// Size of an NTP packet without extension fields or authenticator
pub const PACKET_LEN: usize = 48;

/// Seconds from 1900-01-01 (NTP era 0) to 1970-01-01
const NTP_UNIX_OFFSET: f64 = 2_208_988_800.0;
const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// 64-bit NTP timestamp: seconds since 1900 in the upper 32 bits, binary
/// fraction of a second in the lower 32 bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NtpTimestamp(u64);

impl NtpTimestamp {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Convert fractional Unix seconds; instants before 1900 saturate to zero
    pub fn from_unix_seconds(seconds: f64) -> Self {
        let ntp = (seconds + NTP_UNIX_OFFSET).max(0.0);
        let whole = ntp.floor();
        let fraction = ((ntp - whole) * FRACTION_SCALE) as u64;
        Self(((whole as u64) << 32) | (fraction & 0xffff_ffff))
    }

    pub fn to_unix_seconds(self) -> f64 {
        (self.0 >> 32) as f64 - NTP_UNIX_OFFSET + (self.0 & 0xffff_ffff) as f64 / FRACTION_SCALE
    }

    /// Replace the lowest fraction byte (~60ns) with random noise so that
    /// consecutive requests never carry identical transmit timestamps
    fn with_random_low_byte<R: Rng>(self, rng: &mut R) -> Self {
        Self((self.0 & !0xff) | u64::from(rng.gen::<u8>()))
    }
}

/// NTP packet header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NtpPacket {
    /// Leap indicator (2 bits)
    pub leap: u8,
    /// Protocol version (3 bits)
    pub version: u8,
    /// Association mode (3 bits)
    pub mode: u8,
    pub stratum: u8,
    /// Poll interval, log2 seconds
    pub poll: i8,
    /// Clock precision, log2 seconds
    pub precision: i8,
    /// Round-trip delay to the reference clock, 16.16 fixed point
    pub root_delay: u32,
    /// Dispersion to the reference clock, 16.16 fixed point
    pub root_dispersion: u32,
    pub reference_id: [u8; 4],
    pub reference_timestamp: NtpTimestamp,
    /// Client transmit time, as echoed by the server
    pub origin_timestamp: NtpTimestamp,
    /// Server receive time
    pub receive_timestamp: NtpTimestamp,
    /// Transmit time of whoever sent this packet
    pub transmit_timestamp: NtpTimestamp,
}

impl NtpPacket {
    pub const VERSION: u8 = 3;
    pub const MODE_CLIENT: u8 = 3;
    pub const MODE_SERVER: u8 = 4;

    /// A client-mode request stamped with its transmit time
    pub fn client_request(transmit: NtpTimestamp) -> Self {
        Self {
            version: Self::VERSION,
            mode: Self::MODE_CLIENT,
            transmit_timestamp: transmit,
            ..Self::default()
        }
    }

    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut bytes = [0u8; PACKET_LEN];
        bytes[0] = (self.leap & 0x3) << 6 | (self.version & 0x7) << 3 | (self.mode & 0x7);
        bytes[1] = self.stratum;
        bytes[2] = self.poll as u8;
        bytes[3] = self.precision as u8;
        bytes[4..8].copy_from_slice(&self.root_delay.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.root_dispersion.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.reference_id);
        bytes[16..24].copy_from_slice(&self.reference_timestamp.to_bits().to_be_bytes());
        bytes[24..32].copy_from_slice(&self.origin_timestamp.to_bits().to_be_bytes());
        bytes[32..40].copy_from_slice(&self.receive_timestamp.to_bits().to_be_bytes());
        bytes[40..48].copy_from_slice(&self.transmit_timestamp.to_bits().to_be_bytes());
        bytes
    }

    /// Parse a packet header; trailing extension fields are ignored
    ///
    /// # Errors
    ///
    /// Returns `OtpError::TimeSyncError` if fewer than 48 bytes are given
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OtpError> {
        if bytes.len() < PACKET_LEN {
            return Err(OtpError::time_sync(format!(
                "short NTP packet: {} bytes",
                bytes.len()
            )));
        }

        let word = |at: usize| {
            u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let timestamp = |at: usize| {
            NtpTimestamp::from_bits(u64::from(word(at)) << 32 | u64::from(word(at + 4)))
        };

        Ok(Self {
            leap: bytes[0] >> 6 & 0x3,
            version: bytes[0] >> 3 & 0x7,
            mode: bytes[0] & 0x7,
            stratum: bytes[1],
            poll: bytes[2] as i8,
            precision: bytes[3] as i8,
            root_delay: word(4),
            root_dispersion: word(8),
            reference_id: [bytes[12], bytes[13], bytes[14], bytes[15]],
            reference_timestamp: timestamp(16),
            origin_timestamp: timestamp(24),
            receive_timestamp: timestamp(32),
            transmit_timestamp: timestamp(40),
        })
    }
}

#[derive(Debug)]
enum SocketState {
    Open(UdpSocket),
    Closed,
}

/// Time source synchronized with an NTP server
///
/// Owns one UDP socket for its whole life. After [`close`](Self::close),
/// every call to [`time`](TimeSource::time) fails with
/// `OtpError::ClosedSource`.
#[derive(Debug)]
pub struct NtpTimeSource {
    server: SocketAddr,
    timeout: Duration,
    state: Mutex<SocketState>,
}

impl NtpTimeSource {
    /// Connect to `host` on port 123 with a 3 second timeout
    pub fn connect(host: &str) -> Result<Self, OtpError> {
        Self::connect_with_port(host, NTP_PORT, DEFAULT_TIMEOUT)
    }

    /// Connect to `host` on port 123
    pub fn connect_with_timeout(host: &str, timeout: Duration) -> Result<Self, OtpError> {
        Self::connect_with_port(host, NTP_PORT, timeout)
    }

    /// Connect to `host:port`, waiting at most `timeout` for each reply
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidConfiguration` for a zero timeout and
    /// `OtpError::TimeSyncError` if the host cannot be resolved or the
    /// socket cannot be opened.
    pub fn connect_with_port(host: &str, port: u16, timeout: Duration) -> Result<Self, OtpError> {
        if timeout.is_zero() {
            return Err(OtpError::invalid_configuration("NTP timeout must be non-zero"));
        }

        let server = (host, port)
            .to_socket_addrs()
            .map_err(OtpError::time_sync)?
            .next()
            .ok_or_else(|| OtpError::time_sync(format!("could not resolve {}", host)))?;

        let local: SocketAddr = if server.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local).map_err(OtpError::time_sync)?;
        socket
            .set_read_timeout(Some(timeout))
            .map_err(OtpError::time_sync)?;
        socket
            .set_write_timeout(Some(timeout))
            .map_err(OtpError::time_sync)?;
        socket.connect(server).map_err(OtpError::time_sync)?;

        debug!(%server, ?timeout, "Opened NTP time source");

        Ok(Self {
            server,
            timeout,
            state: Mutex::new(SocketState::Open(socket)),
        })
    }

    /// Release the socket; further calls are no-ops
    pub fn close(&self) {
        let mut state = self.lock();
        if let SocketState::Open(_) = std::mem::replace(&mut *state, SocketState::Closed) {
            debug!(server = %self.server, "Closed NTP time source");
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.lock(), SocketState::Closed)
    }

    /// Estimate the offset of the server clock relative to the local clock,
    /// in seconds
    pub fn offset(&self) -> Result<f64, OtpError> {
        let state = self.lock();
        let socket = match &*state {
            SocketState::Open(socket) => socket,
            SocketState::Closed => return Err(OtpError::ClosedSource),
        };

        let offset = exchange(socket, self.timeout)?;
        debug!(server = %self.server, offset, "Received NTP reply");
        Ok(offset)
    }

    fn lock(&self) -> MutexGuard<'_, SocketState> {
        // The state is a plain enum; a panic elsewhere cannot leave it half-written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimeSource for NtpTimeSource {
    fn time(&self) -> Result<i64, OtpError> {
        let offset = self.offset()?;
        Ok((unix_seconds_f64(SystemTime::now()) + offset).floor() as i64)
    }
}

impl Drop for NtpTimeSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// One request/reply exchange, returning the clock offset in seconds
///
/// Replies to earlier requests that arrived after their own timeout are
/// discarded until the reply to this request arrives or `timeout` elapses.
fn exchange(socket: &UdpSocket, timeout: Duration) -> Result<f64, OtpError> {
    let transmit = NtpTimestamp::from_unix_seconds(unix_seconds_f64(SystemTime::now()))
        .with_random_low_byte(&mut rand::thread_rng());
    let request = NtpPacket::client_request(transmit);

    socket.send(&request.to_bytes()).map_err(request_error)?;
    let deadline = Instant::now() + timeout;

    // Room for extension fields and a MAC after the header
    let mut buf = [0u8; 128];
    let (reply, destination) = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(OtpError::time_sync("NTP request timed out"));
        }
        socket
            .set_read_timeout(Some(remaining))
            .map_err(OtpError::time_sync)?;

        let len = socket.recv(&mut buf).map_err(request_error)?;
        let destination = unix_seconds_f64(SystemTime::now());

        let reply = NtpPacket::from_bytes(&buf[..len])?;
        if reply.origin_timestamp == transmit {
            break (reply, destination);
        }
        warn!("Discarding NTP reply that does not answer our request");
    };

    if reply.mode != NtpPacket::MODE_SERVER {
        return Err(OtpError::time_sync(format!(
            "unexpected NTP mode {} in reply",
            reply.mode
        )));
    }

    let origin = reply.origin_timestamp.to_unix_seconds();
    let receive = reply.receive_timestamp.to_unix_seconds();
    let transmit = reply.transmit_timestamp.to_unix_seconds();

    Ok(((receive - origin) + (transmit - destination)) / 2.0)
}

fn request_error(error: io::Error) -> OtpError {
    match error.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            OtpError::time_sync("NTP request timed out")
        }
        _ => OtpError::time_sync(error),
    }
}
