//! `std::net`-backed implementations of the `sntpc` traits: DNS resolution,
//! a non-blocking UDP transport, and a system clock reader/writer.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};

use sntpc::{
    DnsResolver, LeapIndicator, NtpTimestamp, ServerInfo, SetTime,
    TimeSource, UdpTransport, SNTP_TIME_AT_UNIX_EPOCH_SECS,
};

/// Resolves a [`ServerInfo`] host name through the platform's standard
/// resolver, keeping the first IPv4 address returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDnsResolver;

impl DnsResolver for StdDnsResolver {
    fn resolve(&mut self, server: &ServerInfo<'_>) -> Option<u32> {
        (server.name, server.port)
            .to_socket_addrs()
            .ok()?
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(u32::from(*v4.ip())),
                SocketAddr::V6(_) => None,
            })
    }
}

/// Reads `std::time::SystemTime` as an NTP timestamp and, with the `utils`
/// feature, applies a computed offset back to the host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdClock;

impl TimeSource for StdClock {
    fn now(&mut self) -> NtpTimestamp {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        let seconds =
            (now.as_secs() as u32).wrapping_add(SNTP_TIME_AT_UNIX_EPOCH_SECS);
        let fractions =
            ((u64::from(now.subsec_nanos()) << 32) / 1_000_000_000) as u32;

        NtpTimestamp::new(seconds, fractions)
    }
}

impl SetTime for StdClock {
    fn set_time(
        &mut self,
        _server: &ServerInfo<'_>,
        server_time: NtpTimestamp,
        _clock_offset_sec: i32,
        _leap_second_type: LeapIndicator,
    ) {
        #[cfg(feature = "utils")]
        sync_system_clock(server_time);
        #[cfg(not(feature = "utils"))]
        let _ = server_time;
    }
}

/// Sets the host clock with the platform `date` command, the way the
/// teacher's `utils` feature does on Unix. Best-effort: a failure here
/// does not propagate, matching [`SetTime`]'s fire-and-forget contract.
#[cfg(feature = "utils")]
fn sync_system_clock(server_time: NtpTimestamp) {
    use chrono::{Datelike, Local, TimeZone, Timelike, Utc};
    use std::process::Command;

    let Ok((secs, micros)) = server_time.to_unix_time() else {
        return;
    };
    let Some(utc) =
        Utc.timestamp_opt(i64::from(secs), micros * 1_000).single()
    else {
        return;
    };
    let local = utc.with_timezone(&Local);
    let time_str = format!(
        "{}/{}/{} {:02}:{:02}:{:02}",
        local.month(),
        local.day(),
        local.year(),
        local.hour(),
        local.minute(),
        local.second()
    );

    let _ = Command::new("date").args(["-s", time_str.as_str()]).status();
}

/// Non-blocking UDP transport, honouring the tri-valued send/recv
/// convention: `WouldBlock` maps to `0`, any other I/O error to `-1`.
pub struct StdUdpTransport {
    socket: UdpSocket,
}

impl StdUdpTransport {
    /// Binds a non-blocking UDP socket to `local_addr` (e.g. `"0.0.0.0:0"`).
    pub fn bind(local_addr: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind(local_addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }
}

impl UdpTransport for StdUdpTransport {
    fn send_to(
        &mut self,
        server_ip: u32,
        server_port: u16,
        buffer: &[u8],
    ) -> i32 {
        let addr = SocketAddrV4::new(Ipv4Addr::from(server_ip), server_port);
        match self.socket.send_to(buffer, addr) {
            Ok(n) => n as i32,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(_) => -1,
        }
    }

    fn recv_from(
        &mut self,
        server_ip: u32,
        server_port: u16,
        buffer: &mut [u8],
    ) -> i32 {
        match self.socket.recv_from(buffer) {
            Ok((n, SocketAddr::V4(from)))
                if *from.ip() == Ipv4Addr::from(server_ip)
                    && from.port() == server_port =>
            {
                n as i32
            }
            // A datagram arrived from somewhere other than the server we
            // asked: already drained from the socket, treat as would-block.
            Ok(_) => 0,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(_) => -1,
        }
    }
}
