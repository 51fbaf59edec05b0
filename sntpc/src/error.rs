//! Closed status taxonomy shared by the serializer and the client engine.

use core::fmt;

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// All fallible outcomes the serializer and engine can produce.
///
/// There is no `Success` variant: a successful call returns `Ok(_)`, which
/// is the idiomatic rendition of a status code whose zero value means "no
/// error".
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An invalid parameter was passed (null host list, mismatched auth
    /// pair, zero-valued tolerance/accuracy, etc).
    BadParameter,
    /// The caller's buffer is smaller than the minimum packet size.
    BufferTooSmall,
    /// DNS resolution of the current server failed.
    DnsFailure,
    /// The transport reported a hard failure (negative return, or a
    /// would-block that outlived its retry deadline).
    NetworkFailure,
    /// No byte of a response arrived before `responseTimeoutMs` elapsed,
    /// measured from the request's transmit timestamp.
    ResponseTimeout,
    /// No byte of a response has arrived yet, but the end-to-end deadline
    /// has not elapsed either; the caller may poll again.
    NoResponseReceived,
    /// The response failed validation: wrong mode, or an originate
    /// timestamp that does not echo the request's transmit timestamp.
    InvalidResponse,
    /// The response was valid but the era-adjusted clock offset could not
    /// be represented in 32 bits; `serverTime`/leap info are still valid.
    ClockOffsetOverflow,
    /// The server rejected the request with a Kiss-o'-Death `DENY`/`RSTR`
    /// code; switch servers.
    RejectedResponseChangeServer,
    /// The server rejected the request with a Kiss-o'-Death `RATE` code;
    /// retry the same server with backoff.
    RejectedResponseRetryWithBackoff,
    /// The server rejected the request with an unrecognized
    /// Kiss-o'-Death code.
    RejectedResponseOtherCode,
    /// Engine-level collapse of the three `RejectedResponse*` sub-codes.
    RejectedResponse,
    /// The server list is exhausted; re-initialize to continue.
    ChangeServer,
    /// Client-side authentication code generation failed, or the
    /// generated MAC does not fit in the remaining buffer space.
    AuthFailure,
    /// Server response authentication failed (MAC mismatch).
    ServerNotAuthenticated,
    /// The requested poll interval rounds down to less than one second.
    ZeroPollInterval,
    /// The NTP timestamp falls outside the representable UNIX time range.
    TimeNotSupported,
}

impl Error {
    /// Short machine-stable name, the idiomatic equivalent of a
    /// `*_StatusToStr` conversion function.
    pub const fn as_str(self) -> &'static str {
        match self {
            Error::BadParameter => "bad parameter",
            Error::BufferTooSmall => "buffer too small",
            Error::DnsFailure => "DNS resolution failed",
            Error::NetworkFailure => "network failure",
            Error::ResponseTimeout => "response timeout",
            Error::NoResponseReceived => "no response received",
            Error::InvalidResponse => "invalid response",
            Error::ClockOffsetOverflow => "clock offset overflow",
            Error::RejectedResponseChangeServer => {
                "server rejected request: change server"
            }
            Error::RejectedResponseRetryWithBackoff => {
                "server rejected request: retry with backoff"
            }
            Error::RejectedResponseOtherCode => {
                "server rejected request: other kiss code"
            }
            Error::RejectedResponse => "server rejected request",
            Error::ChangeServer => "server list exhausted",
            Error::AuthFailure => "authentication failure",
            Error::ServerNotAuthenticated => "server not authenticated",
            Error::ZeroPollInterval => "poll interval rounds to zero",
            Error::TimeNotSupported => "time not representable",
        }
    }

    /// Whether this status is one of the three Kiss-o'-Death sub-codes a
    /// serializer call can return directly (the engine collapses all three
    /// to [`Error::RejectedResponse`] before returning to its own caller).
    pub const fn is_kod_rejection(self) -> bool {
        matches!(
            self,
            Error::RejectedResponseChangeServer
                | Error::RejectedResponseRetryWithBackoff
                | Error::RejectedResponseOtherCode
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
