//! SNTPv4 client core
//!
//! # Overview
//!
//! This crate implements the client side of [SNTPv4](https://datatracker.ietf.org/doc/html/rfc4330):
//! wire-format serialization and deserialization of the 48-byte packet body,
//! era-safe timestamp arithmetic, Kiss-o'-Death handling, and a
//! single-threaded, cooperatively-polled request/response engine
//! ([`Context`]). It targets resource-constrained environments: no heap
//! allocation, no spawned threads, and `no_std` by default.
//!
//! # Usage
//!
//! Put this in your `Cargo.toml`:
//! ```cargo
//! [dependencies]
//! sntpc = "0.1"
//! ```
//!
//! ## Features
//!
//! - `std` (default): enables the `std::error::Error` impl for [`Error`].
//! - `log`: routes [`Context`] diagnostics through the `log` crate.
//! - `defmt`: routes [`Context`] diagnostics through `defmt` instead (for
//!   `no_std` targets where `log` is unavailable).
//!
//! # Details
//!
//! The engine is deliberately transport-agnostic: it is generic over five
//! small traits ([`DnsResolver`], [`TimeSource`], [`SetTime`],
//! [`UdpTransport`], [`AuthCodec`]) rather than depending on a concrete
//! socket or clock type. A caller wires concrete implementations (the
//! `sntpc-net-std` crate provides one for `std::net`) and drives the
//! two-call cycle itself:
//!
//! 1. [`Context::send_time_request`] serializes and sends a request.
//! 2. [`Context::receive_time_response`] polls for, validates, and applies
//!    the response, returning as soon as something terminal happens or the
//!    caller's poll budget is spent.
//!
//! Neither call blocks past its own timeout budget; there is no blocking
//! I/O and nothing is spawned. Callers loop on
//! [`Error::NoResponseReceived`] themselves.
#![cfg_attr(not(feature = "std"), no_std)]

mod context;
mod error;
mod log;
mod packet;
mod poll;
mod server;
mod timestamp;
mod traits;

pub use context::{
    ClientState, Context, NoAuth, ReceiveOutcome,
    DEFAULT_RECV_POLLING_TIMEOUT_MS, DEFAULT_SEND_RETRY_TIMEOUT_MS,
};
pub use error::{Error, Result};
pub use packet::{
    deserialize_response, serialize_request, DeserializeOutcome,
    LeapIndicator, ResponseData, PACKET_BASE_SIZE,
};
pub use poll::calculate_poll_interval;
pub use server::{ServerInfo, DEFAULT_SERVER_PORT};
pub use timestamp::{
    elapsed_ms, era_diff, NtpTimestamp, FRACTIONS_PER_MICROSECOND,
    SNTP_TIME_AT_LARGEST_UNIX_TIME_SECS, SNTP_TIME_AT_UNIX_EPOCH_SECS,
};
pub use traits::{AuthCodec, DnsResolver, SetTime, TimeSource, UdpTransport};
