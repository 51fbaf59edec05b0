//! The per-server request/response state machine (`spec.md` §3, §4.2).

use crate::error::{Error, Result};
use crate::log::{debug, error, warn};
use crate::packet::{
    deserialize_response, serialize_request, DeserializeOutcome,
    ResponseData, PACKET_BASE_SIZE,
};
use crate::server::ServerInfo;
use crate::timestamp::{elapsed_ms, NtpTimestamp};
use crate::traits::{AuthCodec, DnsResolver, SetTime, TimeSource, UdpTransport};

/// Default budget for [`Context::send_retry_timeout_ms`], per `spec.md`
/// §4.2's recommended value.
pub const DEFAULT_SEND_RETRY_TIMEOUT_MS: u64 = 1000;

/// Default budget for [`Context::recv_polling_timeout_ms`].
pub const DEFAULT_RECV_POLLING_TIMEOUT_MS: u64 = 1000;

/// No-op [`AuthCodec`], the type-level way of expressing "authentication
/// is not configured" — the engine's single `AuthCodec` field replaces the
/// source's "both present or absent" pointer-pair invariant with a type
/// that is trivially either this marker or a real codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthCodec for NoAuth {
    fn generate_client_auth(
        &mut self,
        _server: &ServerInfo<'_>,
        _buffer: &mut [u8],
        out_auth_size: &mut usize,
    ) -> Result<()> {
        *out_auth_size = 0;
        Ok(())
    }

    fn validate_server_auth(
        &mut self,
        _server: &ServerInfo<'_>,
        _buffer: &[u8],
    ) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a terminal (non-rejected) [`Context::receive_time_response`]
/// call. Both variants still carry the parsed data: an overflowed offset
/// does not invalidate the server's reported time or leap status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReceiveOutcome {
    Accepted(ResponseData),
    Overflow(ResponseData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Ready,
    Awaiting,
}

/// Observable position in the per-server request/response state machine
/// (`spec.md` §4.2's `Ready(i)` / `Awaiting(i)` / `Exhausted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Ready to call [`Context::send_time_request`] against server `index`.
    Ready(usize),
    /// A request was sent to server `index`; awaiting a terminal outcome
    /// from [`Context::receive_time_response`].
    Awaiting(usize),
    /// The server list is exhausted; re-initialize to continue.
    Exhausted,
}

/// Owns the server list, cursor, network buffer, and the five plug-in
/// interfaces that drive one SNTP query cycle at a time.
pub struct Context<'a, D, T, S, U, A = NoAuth>
where
    D: DnsResolver,
    T: TimeSource,
    S: SetTime,
    U: UdpTransport,
    A: AuthCodec,
{
    servers: &'a [ServerInfo<'a>],
    current_server_index: usize,
    state: ServerState,
    buffer: &'a mut [u8],
    packet_size: usize,
    resolved_server_ip: Option<u32>,
    last_request_time: NtpTimestamp,
    response_timeout_ms: u64,
    send_retry_timeout_ms: u64,
    recv_polling_timeout_ms: u64,
    dns: D,
    clock: T,
    set_time: S,
    transport: U,
    auth: A,
}

impl<'a, D, T, S, U, A> Context<'a, D, T, S, U, A>
where
    D: DnsResolver,
    T: TimeSource,
    S: SetTime,
    U: UdpTransport,
    A: AuthCodec,
{
    /// Equivalent of the source's `Sntp_Init`: validates the server list
    /// and buffer before any engine operation can run.
    pub fn new(
        servers: &'a [ServerInfo<'a>],
        buffer: &'a mut [u8],
        response_timeout_ms: u64,
        dns: D,
        clock: T,
        set_time: S,
        transport: U,
        auth: A,
    ) -> Result<Self> {
        if servers.is_empty() {
            return Err(Error::BadParameter);
        }
        if buffer.len() < PACKET_BASE_SIZE {
            return Err(Error::BufferTooSmall);
        }

        Ok(Self {
            servers,
            current_server_index: 0,
            state: ServerState::Ready,
            buffer,
            packet_size: PACKET_BASE_SIZE,
            resolved_server_ip: None,
            last_request_time: NtpTimestamp::default(),
            response_timeout_ms,
            send_retry_timeout_ms: DEFAULT_SEND_RETRY_TIMEOUT_MS,
            recv_polling_timeout_ms: DEFAULT_RECV_POLLING_TIMEOUT_MS,
            dns,
            clock,
            set_time,
            transport,
            auth,
        })
    }

    pub fn with_send_retry_timeout_ms(mut self, ms: u64) -> Self {
        self.send_retry_timeout_ms = ms;
        self
    }

    pub fn with_recv_polling_timeout_ms(mut self, ms: u64) -> Self {
        self.recv_polling_timeout_ms = ms;
        self
    }

    /// Index of the server the next operation will target, or `None` once
    /// the list is exhausted.
    pub fn current_server_index(&self) -> Option<usize> {
        (self.current_server_index < self.servers.len())
            .then_some(self.current_server_index)
    }

    /// Current position in the request/response state machine.
    pub fn state(&self) -> ClientState {
        if self.is_exhausted() {
            return ClientState::Exhausted;
        }

        match self.state {
            ServerState::Ready => ClientState::Ready(self.current_server_index),
            ServerState::Awaiting => {
                ClientState::Awaiting(self.current_server_index)
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.current_server_index >= self.servers.len()
    }

    fn current_server(&self) -> ServerInfo<'a> {
        self.servers[self.current_server_index]
    }

    /// Resolves the current server, captures T1, serializes a request
    /// (optionally appending authentication data), and sends it with the
    /// send-retry protocol (`spec.md` §4.2).
    pub fn send_time_request(&mut self, random_number: u32) -> Result<()> {
        if self.is_exhausted() {
            return Err(Error::ChangeServer);
        }

        let server = self.current_server();
        let ip = self.dns.resolve(&server).ok_or(Error::DnsFailure)?;
        debug!("resolved {} to {:08x}", server.name, ip);
        self.resolved_server_ip = Some(ip);

        self.last_request_time = self.clock.now();
        serialize_request(
            &mut self.last_request_time,
            random_number,
            self.buffer,
        )?;
        self.packet_size = PACKET_BASE_SIZE;

        let mut auth_size = 0usize;
        self.auth
            .generate_client_auth(&server, self.buffer, &mut auth_size)?;
        if auth_size > self.buffer.len() - PACKET_BASE_SIZE {
            return Err(Error::AuthFailure);
        }
        self.packet_size = PACKET_BASE_SIZE + auth_size;

        self.send_with_retry(ip, server.port)?;
        self.state = ServerState::Awaiting;
        Ok(())
    }

    fn send_with_retry(&mut self, ip: u32, port: u16) -> Result<()> {
        let mut sent = 0usize;
        let mut last_send_time = self.clock.now();

        loop {
            if sent >= self.packet_size {
                return Ok(());
            }

            let remaining = &self.buffer[sent..self.packet_size];
            let result = self.transport.send_to(ip, port, remaining);

            if result < 0 {
                error!("transport error sending to {:08x}:{}", ip, port);
                return Err(Error::NetworkFailure);
            } else if result == 0 {
                let now = self.clock.now();
                if elapsed_ms(last_send_time, now) >= self.send_retry_timeout_ms
                {
                    warn!(
                        "send retry deadline expired for {:08x}:{}",
                        ip, port
                    );
                    return Err(Error::NetworkFailure);
                }
            } else {
                sent += result as usize;
                last_send_time = self.clock.now();
            }
        }
    }

    /// Polls for a response, validates it, computes the clock offset, and
    /// on success or overflow invokes the set-time hook (`spec.md` §4.2).
    pub fn receive_time_response(
        &mut self,
        block_time_ms: u64,
    ) -> Result<ReceiveOutcome> {
        if self.is_exhausted() {
            return Err(Error::ChangeServer);
        }

        let ip = self.resolved_server_ip.ok_or(Error::BadParameter)?;
        let server = self.current_server();
        let loop_start = self.clock.now();

        loop {
            let mut peek_buf = [0u8; 1];
            let peeked =
                self.transport.recv_from(ip, server.port, &mut peek_buf);

            if peeked < 0 {
                error!("transport error receiving from {}", server.name);
                return Err(Error::NetworkFailure);
            }

            if peeked > 0 {
                self.buffer[0] = peek_buf[0];
                self.drain_remaining(ip, server.port)?;
                break;
            }

            let now = self.clock.now();
            if elapsed_ms(self.last_request_time, now)
                >= self.response_timeout_ms
            {
                warn!("no response from {} within deadline", server.name);
                return Err(Error::ResponseTimeout);
            }
            if elapsed_ms(loop_start, now) >= block_time_ms {
                return Err(Error::NoResponseReceived);
            }
        }

        let t4 = self.clock.now();
        self.auth
            .validate_server_auth(&server, &self.buffer[..self.packet_size])?;

        let outcome = deserialize_response(
            &self.last_request_time,
            &t4,
            &self.buffer[..self.packet_size],
        )?;

        match outcome {
            DeserializeOutcome::Accepted(data) => {
                self.set_time.set_time(
                    &server,
                    data.server_time,
                    data.clock_offset_sec,
                    data.leap_second_type,
                );
                self.state = ServerState::Ready;
                Ok(ReceiveOutcome::Accepted(data))
            }
            DeserializeOutcome::Overflow(data) => {
                warn!(
                    "clock offset from {} exceeds representable range",
                    server.name
                );
                self.set_time.set_time(
                    &server,
                    data.server_time,
                    data.clock_offset_sec,
                    data.leap_second_type,
                );
                self.state = ServerState::Ready;
                Ok(ReceiveOutcome::Overflow(data))
            }
            DeserializeOutcome::Rejected(kind, _data) => {
                warn!(
                    "server {} rejected request: {}",
                    server.name,
                    kind.as_str()
                );
                self.current_server_index += 1;
                self.state = ServerState::Ready;
                Err(Error::RejectedResponse)
            }
        }
    }

    fn drain_remaining(&mut self, ip: u32, port: u16) -> Result<()> {
        let mut received = 1usize;
        let mut last_recv_time = self.clock.now();

        while received < self.packet_size {
            let result = self.transport.recv_from(
                ip,
                port,
                &mut self.buffer[received..self.packet_size],
            );

            if result < 0 {
                return Err(Error::NetworkFailure);
            } else if result == 0 {
                let now = self.clock.now();
                if elapsed_ms(last_recv_time, now)
                    >= self.recv_polling_timeout_ms
                {
                    return Err(Error::NetworkFailure);
                }
            } else {
                received += result as usize;
                last_recv_time = self.clock.now();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    struct StepClock {
        ticks: RefCell<std::collections::VecDeque<NtpTimestamp>>,
        last: RefCell<NtpTimestamp>,
    }

    impl StepClock {
        fn new(ticks: Vec<NtpTimestamp>) -> Self {
            Self {
                ticks: RefCell::new(ticks.into()),
                last: RefCell::new(NtpTimestamp::default()),
            }
        }
    }

    impl TimeSource for &StepClock {
        fn now(&mut self) -> NtpTimestamp {
            let next = self.ticks.borrow_mut().pop_front();
            let value = next.unwrap_or(*self.last.borrow());
            *self.last.borrow_mut() = value;
            value
        }
    }

    struct FixedDns(Option<u32>);
    impl DnsResolver for FixedDns {
        fn resolve(&mut self, _server: &ServerInfo<'_>) -> Option<u32> {
            self.0
        }
    }

    #[derive(Default)]
    struct CapturingSetTime {
        calls: Vec<(NtpTimestamp, i32)>,
    }
    impl SetTime for &mut CapturingSetTime {
        fn set_time(
            &mut self,
            _server: &ServerInfo<'_>,
            server_time: NtpTimestamp,
            clock_offset_sec: i32,
            _leap_second_type: crate::packet::LeapIndicator,
        ) {
            self.calls.push((server_time, clock_offset_sec));
        }
    }

    struct ScriptedTransport {
        send_script: RefCell<std::collections::VecDeque<i32>>,
        recv_script: RefCell<std::collections::VecDeque<(i32, Vec<u8>)>>,
    }

    impl ScriptedTransport {
        fn new(send_script: Vec<i32>, recv_script: Vec<(i32, Vec<u8>)>) -> Self {
            Self {
                send_script: RefCell::new(send_script.into()),
                recv_script: RefCell::new(recv_script.into()),
            }
        }
    }

    impl UdpTransport for &ScriptedTransport {
        fn send_to(&mut self, _ip: u32, _port: u16, buffer: &[u8]) -> i32 {
            self.send_script
                .borrow_mut()
                .pop_front()
                .unwrap_or(buffer.len() as i32)
        }

        fn recv_from(&mut self, _ip: u32, _port: u16, buffer: &mut [u8]) -> i32 {
            let Some((n, data)) = self.recv_script.borrow_mut().pop_front()
            else {
                return 0;
            };
            if n > 0 {
                let n = n as usize;
                buffer[..n].copy_from_slice(&data[..n]);
            }
            n as i32
        }
    }

    /// Test `AuthCodec` appending/checking a fixed 4-byte MAC past
    /// [`PACKET_BASE_SIZE`]. `claim_auth_size` lets a test request a MAC
    /// larger than what was actually written, to exercise the byte-budget
    /// check independently of the MAC logic itself.
    struct FixedMacAuth {
        tag: [u8; 4],
        claim_auth_size: usize,
        validation: Result<()>,
    }

    impl AuthCodec for &mut FixedMacAuth {
        fn generate_client_auth(
            &mut self,
            _server: &ServerInfo<'_>,
            buffer: &mut [u8],
            out_auth_size: &mut usize,
        ) -> Result<()> {
            let available = buffer.len() - PACKET_BASE_SIZE;
            let written = self.tag.len().min(available);
            buffer[PACKET_BASE_SIZE..PACKET_BASE_SIZE + written]
                .copy_from_slice(&self.tag[..written]);
            *out_auth_size = self.claim_auth_size;
            Ok(())
        }

        fn validate_server_auth(
            &mut self,
            _server: &ServerInfo<'_>,
            _buffer: &[u8],
        ) -> Result<()> {
            self.validation
        }
    }

    fn synth_response_bytes(
        mode_stratum_li: (u8, u8, u8),
        ref_id: [u8; 4],
        originate: NtpTimestamp,
        receive: NtpTimestamp,
        transmit: NtpTimestamp,
    ) -> Vec<u8> {
        let (mode, stratum, li) = mode_stratum_li;
        let mut buf = vec![0u8; PACKET_BASE_SIZE];
        buf[0] = (li << 6) | (4 << 3) | mode;
        buf[1] = stratum;
        buf[12..16].copy_from_slice(&ref_id);
        originate.write_be(&mut buf, 24);
        receive.write_be(&mut buf, 32);
        transmit.write_be(&mut buf, 40);
        buf
    }

    #[test]
    fn scenario_s1_successful_cycle() {
        let servers = [ServerInfo::new("time.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 1000), // T1 captured in send
            NtpTimestamp::new(3000, 1000), // last_send_time baseline
            NtpTimestamp::new(3000, 1000), // loop_start in receive
            NtpTimestamp::new(3006, 0),    // T4
        ]);
        let response = synth_response_bytes(
            (4, 1, 0),
            [0; 4],
            NtpTimestamp::new(3000, 1000 | 0x0000_AABB),
            NtpTimestamp::new(3002, 0),
            NtpTimestamp::new(3004, 0),
        );
        let transport = ScriptedTransport::new(
            vec![PACKET_BASE_SIZE as i32],
            vec![(1, response[..1].to_vec()), ((PACKET_BASE_SIZE - 1) as i32, response[1..].to_vec())],
        );
        let mut set_time = CapturingSetTime::default();

        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        )
        .unwrap();

        ctx.send_time_request(0xAABB_CCDD).unwrap();
        let outcome = ctx.receive_time_response(1000).unwrap();
        match outcome {
            ReceiveOutcome::Accepted(data) => {
                assert_eq!(data.clock_offset_sec, 0);
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
        assert_eq!(set_time.calls.len(), 1);
        assert_eq!(set_time.calls[0].1, 0);
    }

    #[test]
    fn state_transitions_ready_awaiting_ready() {
        let servers = [ServerInfo::new("time.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3006, 0),
        ]);
        let response = synth_response_bytes(
            (4, 1, 0),
            [0; 4],
            NtpTimestamp::new(3000, 1000 | 0x0000_AABB),
            NtpTimestamp::new(3002, 0),
            NtpTimestamp::new(3004, 0),
        );
        let transport = ScriptedTransport::new(
            vec![PACKET_BASE_SIZE as i32],
            vec![
                (1, response[..1].to_vec()),
                ((PACKET_BASE_SIZE - 1) as i32, response[1..].to_vec()),
            ],
        );
        let mut set_time = CapturingSetTime::default();

        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        )
        .unwrap();

        assert_eq!(ctx.state(), ClientState::Ready(0));
        ctx.send_time_request(0xAABB_CCDD).unwrap();
        assert_eq!(ctx.state(), ClientState::Awaiting(0));
        ctx.receive_time_response(1000).unwrap();
        assert_eq!(ctx.state(), ClientState::Ready(0));
    }

    #[test]
    fn scenario_s3_kod_rate_advances_cursor() {
        let servers = [
            ServerInfo::new("a.example.com"),
            ServerInfo::new("b.example.com"),
        ];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3001, 0),
        ]);
        let response = synth_response_bytes(
            (4, 0, 0),
            *b"RATE",
            NtpTimestamp::new(3000, 1000 | 0x0000_AABB),
            NtpTimestamp::default(),
            NtpTimestamp::default(),
        );
        let transport = ScriptedTransport::new(
            vec![PACKET_BASE_SIZE as i32],
            vec![(1, response[..1].to_vec()), ((PACKET_BASE_SIZE - 1) as i32, response[1..].to_vec())],
        );
        let mut set_time = CapturingSetTime::default();

        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        )
        .unwrap();

        assert_eq!(ctx.current_server_index(), Some(0));
        ctx.send_time_request(0xAABB_CCDD).unwrap();
        let err = ctx.receive_time_response(1000).unwrap_err();
        assert_eq!(err, Error::RejectedResponse);
        assert_eq!(ctx.current_server_index(), Some(1));
        assert!(set_time.calls.is_empty());
    }

    #[test]
    fn scenario_s4_replay_does_not_advance_cursor() {
        let servers = [ServerInfo::new("a.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3000, 1000),
            NtpTimestamp::new(3001, 0),
        ]);
        let mut tampered_originate = NtpTimestamp::new(3000, 1000 | 0x0000_AABB);
        tampered_originate.fractions ^= 1;
        let response = synth_response_bytes(
            (4, 1, 0),
            [0; 4],
            tampered_originate,
            NtpTimestamp::new(3002, 0),
            NtpTimestamp::new(3004, 0),
        );
        let transport = ScriptedTransport::new(
            vec![PACKET_BASE_SIZE as i32],
            vec![(1, response[..1].to_vec()), ((PACKET_BASE_SIZE - 1) as i32, response[1..].to_vec())],
        );
        let mut set_time = CapturingSetTime::default();

        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        )
        .unwrap();

        ctx.send_time_request(0xAABB_CCDD).unwrap();
        let err = ctx.receive_time_response(1000).unwrap_err();
        assert_eq!(err, Error::InvalidResponse);
        assert_eq!(ctx.current_server_index(), Some(0));
    }

    #[test]
    fn scenario_s5_send_retry_then_success() {
        let servers = [ServerInfo::new("a.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 1000), // T1
            NtpTimestamp::new(3000, 1000), // last_send_time baseline
            NtpTimestamp::new(3000, 100),  // after first 0
            NtpTimestamp::new(3000, 200),  // after second 0
        ]);
        let transport = ScriptedTransport::new(
            vec![0, 0, PACKET_BASE_SIZE as i32],
            vec![],
        );

        let mut set_time = CapturingSetTime::default();
        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        )
        .unwrap();

        ctx.send_time_request(0).unwrap();
    }

    #[test]
    fn scenario_s6_response_timeout() {
        let servers = [ServerInfo::new("a.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 0), // T1
            NtpTimestamp::new(3000, 0), // last_send_time
            NtpTimestamp::new(3000, 0), // loop_start in receive
            NtpTimestamp::new(3005, 0), // now: elapsed >= responseTimeoutMs
        ]);
        let transport =
            ScriptedTransport::new(vec![PACKET_BASE_SIZE as i32], vec![(0, vec![])]);

        let mut set_time = CapturingSetTime::default();
        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000, // responseTimeoutMs
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        )
        .unwrap();

        ctx.send_time_request(0).unwrap();
        let err = ctx.receive_time_response(60_000).unwrap_err();
        assert_eq!(err, Error::ResponseTimeout);
    }

    #[test]
    fn exhausted_server_list_rejects_both_operations() {
        let servers = [ServerInfo::new("a.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![]);
        let transport = ScriptedTransport::new(vec![], vec![]);
        let mut set_time = CapturingSetTime::default();
        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        )
        .unwrap();

        // Manually drive the cursor to exhaustion the same way a KoD
        // rejection would.
        assert_eq!(ctx.servers.len(), 1);
        ctx.current_server_index = 1;

        assert_eq!(
            ctx.send_time_request(0),
            Err(Error::ChangeServer)
        );
        assert_eq!(
            ctx.receive_time_response(10),
            Err(Error::ChangeServer)
        );
    }

    #[test]
    fn new_rejects_empty_server_list() {
        let servers: [ServerInfo<'_>; 0] = [];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![]);
        let transport = ScriptedTransport::new(vec![], vec![]);
        let mut set_time = CapturingSetTime::default();
        let result = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(None),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        );
        assert_eq!(result.err(), Some(Error::BadParameter));
    }

    #[test]
    fn new_rejects_undersized_buffer() {
        let servers = [ServerInfo::new("a.example.com")];
        let mut buffer = [0u8; 10];
        let clock = StepClock::new(vec![]);
        let transport = ScriptedTransport::new(vec![], vec![]);
        let mut set_time = CapturingSetTime::default();
        let result = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(None),
            &clock,
            &mut set_time,
            &transport,
            NoAuth,
        );
        assert_eq!(result.err(), Some(Error::BufferTooSmall));
    }

    #[test]
    fn auth_round_trip_extends_packet_size() {
        let servers = [ServerInfo::new("a.example.com")];
        let auth_packet_size = PACKET_BASE_SIZE + 4;
        let mut buffer = vec![0u8; auth_packet_size];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 1000), // T1
            NtpTimestamp::new(3000, 1000), // last_send_time baseline
            NtpTimestamp::new(3000, 1000), // loop_start in receive
            NtpTimestamp::new(3006, 0),    // T4
        ]);
        let mut response = synth_response_bytes(
            (4, 1, 0),
            [0; 4],
            NtpTimestamp::new(3000, 1000 | 0x0000_AABB),
            NtpTimestamp::new(3002, 0),
            NtpTimestamp::new(3004, 0),
        );
        response.extend_from_slice(&[0u8; 4]);
        let transport = ScriptedTransport::new(
            vec![auth_packet_size as i32],
            vec![
                (1, response[..1].to_vec()),
                ((auth_packet_size - 1) as i32, response[1..].to_vec()),
            ],
        );
        let mut set_time = CapturingSetTime::default();
        let mut auth = FixedMacAuth {
            tag: *b"MACT",
            claim_auth_size: 4,
            validation: Ok(()),
        };

        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            &mut auth,
        )
        .unwrap();

        ctx.send_time_request(0xAABB_CCDD).unwrap();
        assert_eq!(ctx.packet_size, auth_packet_size);
        assert_eq!(
            &ctx.buffer[PACKET_BASE_SIZE..auth_packet_size],
            b"MACT"
        );
        let outcome = ctx.receive_time_response(1000).unwrap();
        assert!(matches!(outcome, ReceiveOutcome::Accepted(_)));
    }

    #[test]
    fn auth_size_exceeding_buffer_budget_rejects() {
        let servers = [ServerInfo::new("a.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![NtpTimestamp::new(3000, 1000)]);
        let transport = ScriptedTransport::new(vec![], vec![]);
        let mut auth = FixedMacAuth {
            tag: *b"MACT",
            claim_auth_size: 1,
            validation: Ok(()),
        };

        let mut set_time = CapturingSetTime::default();
        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            &mut auth,
        )
        .unwrap();

        assert_eq!(
            ctx.send_time_request(0xAABB_CCDD),
            Err(Error::AuthFailure)
        );
    }

    #[test]
    fn server_not_authenticated_propagates_unchanged() {
        let servers = [ServerInfo::new("a.example.com")];
        let mut buffer = [0u8; PACKET_BASE_SIZE];
        let clock = StepClock::new(vec![
            NtpTimestamp::new(3000, 1000), // T1
            NtpTimestamp::new(3000, 1000), // last_send_time baseline
            NtpTimestamp::new(3000, 1000), // loop_start in receive
            NtpTimestamp::new(3006, 0),    // T4
        ]);
        let response = vec![0u8; PACKET_BASE_SIZE];
        let transport = ScriptedTransport::new(
            vec![PACKET_BASE_SIZE as i32],
            vec![
                (1, response[..1].to_vec()),
                ((PACKET_BASE_SIZE - 1) as i32, response[1..].to_vec()),
            ],
        );
        let mut auth = FixedMacAuth {
            tag: *b"MACT",
            claim_auth_size: 0,
            validation: Err(Error::ServerNotAuthenticated),
        };

        let mut set_time = CapturingSetTime::default();
        let mut ctx = Context::new(
            &servers,
            &mut buffer,
            5000,
            FixedDns(Some(0x7f00_0001)),
            &clock,
            &mut set_time,
            &transport,
            &mut auth,
        )
        .unwrap();

        ctx.send_time_request(0xAABB_CCDD).unwrap();
        let err = ctx.receive_time_response(1000).unwrap_err();
        assert_eq!(err, Error::ServerNotAuthenticated);
    }
}
