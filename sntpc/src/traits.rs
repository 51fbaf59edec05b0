//! Pluggable interfaces the engine is generic over (`spec.md` §6, §9:
//! "Function pointers → interface abstractions... modelled as a sum type /
//! trait pair"). `Context` is monomorphized over these traits; no dynamic
//! dispatch is required.

use crate::error::Result;
use crate::packet::LeapIndicator;
use crate::server::ServerInfo;
use crate::timestamp::NtpTimestamp;

/// Resolves a [`ServerInfo`] host name to an IPv4 address, in host byte
/// order.
pub trait DnsResolver {
    fn resolve(&mut self, server: &ServerInfo<'_>) -> Option<u32>;
}

/// Reads the system clock. Must be monotonic enough for short elapsed-time
/// computations across era boundaries.
pub trait TimeSource {
    fn now(&mut self) -> NtpTimestamp;
}

/// Applies a computed offset to the system clock. Fire-and-forget: the
/// core never inspects the outcome.
pub trait SetTime {
    fn set_time(
        &mut self,
        server: &ServerInfo<'_>,
        server_time: NtpTimestamp,
        clock_offset_sec: i32,
        leap_second_type: LeapIndicator,
    );
}

/// Non-blocking UDP send/receive, honouring the tri-valued convention:
/// negative = error, zero = would-block, positive = bytes transferred
/// (possibly partial).
pub trait UdpTransport {
    fn send_to(
        &mut self,
        server_ip: u32,
        server_port: u16,
        buffer: &[u8],
    ) -> i32;

    fn recv_from(
        &mut self,
        server_ip: u32,
        server_port: u16,
        buffer: &mut [u8],
    ) -> i32;
}

/// Optional symmetric-key authentication. Both methods must be configured
/// together or not at all (`spec.md` §3's "never one-sided" invariant).
pub trait AuthCodec {
    /// Appends authentication data past [`crate::packet::PACKET_BASE_SIZE`]
    /// and reports how many bytes were appended.
    fn generate_client_auth(
        &mut self,
        server: &ServerInfo<'_>,
        buffer: &mut [u8],
        out_auth_size: &mut usize,
    ) -> Result<()>;

    /// Validates a server response's authentication data. Only
    /// `Ok(())`, [`crate::error::Error::AuthFailure`], and
    /// [`crate::error::Error::ServerNotAuthenticated`] are valid returns.
    fn validate_server_auth(
        &mut self,
        server: &ServerInfo<'_>,
        buffer: &[u8],
    ) -> Result<()>;
}
