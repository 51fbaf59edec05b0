//! Wire-format serialization and deserialization of the 48-byte SNTP
//! packet body (`spec.md` §4.1).

use crate::error::{Error, Result};
use crate::timestamp::NtpTimestamp;

/// Minimum packet size on the wire; authentication data, if any, follows.
pub const PACKET_BASE_SIZE: usize = 48;

const VERSION: u8 = 4;
const CLIENT_MODE: u8 = 3;
const SERVER_MODE: u8 = 4;
const MODE_MASK: u8 = 0x07;
const VERSION_SHIFT: u8 = 3;
const LEAP_SHIFT: u8 = 6;
const KOD_STRATUM: u8 = 0;

const OFFSET_LI_VN_MODE: usize = 0;
const OFFSET_STRATUM: usize = 1;
const OFFSET_REFERENCE_ID: usize = 12;
const OFFSET_ORIGINATE_TIMESTAMP: usize = 24;
const OFFSET_RECEIVE_TIMESTAMP: usize = 32;
const OFFSET_TRANSMIT_TIMESTAMP: usize = 40;

const KOD_CODE_DENY: u32 = 0x4445_4E59;
const KOD_CODE_RSTR: u32 = 0x5253_5452;
const KOD_CODE_RATE: u32 = 0x5241_5445;

/// Leap-second warning carried in the two high bits of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeapIndicator {
    #[default]
    NoWarning,
    LastMinuteHas61,
    LastMinuteHas59,
    Unsynchronized,
}

impl LeapIndicator {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::LastMinuteHas61,
            2 => LeapIndicator::LastMinuteHas59,
            _ => LeapIndicator::Unsynchronized,
        }
    }
}

/// Parsed contents of an accepted (or rejected) response, as produced by
/// [`deserialize_response`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseData {
    /// T3, the server's transmit timestamp. Zero for a rejected response.
    pub server_time: NtpTimestamp,
    pub leap_second_type: LeapIndicator,
    /// Zero if accepted; otherwise the big-endian 4-byte Kiss-o'-Death
    /// ASCII code read from the reference-ID field.
    pub rejected_response_code: u32,
    /// Signed offset in seconds (server − client), or `i32::MAX` when the
    /// offset could not be represented (see [`Error::ClockOffsetOverflow`]).
    pub clock_offset_sec: i32,
}

impl Default for ResponseData {
    fn default() -> Self {
        Self {
            server_time: NtpTimestamp::default(),
            leap_second_type: LeapIndicator::NoWarning,
            rejected_response_code: 0,
            clock_offset_sec: 0,
        }
    }
}

/// Outcome of [`deserialize_response`], distinguishing acceptance,
/// clock-offset overflow, and the three Kiss-o'-Death rejection
/// sub-classes (`spec.md` §7's "also exposed through the serializer API").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeserializeOutcome {
    Accepted(ResponseData),
    Overflow(ResponseData),
    Rejected(Error, ResponseData),
}

/// Serializes a client request into `buffer`, embedding `current_time`
/// (after mixing `random_number`'s high bits into its low fraction bits)
/// as the transmit timestamp. `current_time` is mutated in place so the
/// caller can retain the exact value placed on the wire for the later
/// originate-timestamp echo check.
pub fn serialize_request(
    current_time: &mut NtpTimestamp,
    random_number: u32,
    buffer: &mut [u8],
) -> Result<()> {
    if buffer.len() < PACKET_BASE_SIZE {
        return Err(Error::BufferTooSmall);
    }

    buffer[..PACKET_BASE_SIZE].fill(0);
    buffer[OFFSET_LI_VN_MODE] = (VERSION << VERSION_SHIFT) | CLIENT_MODE;

    // Replay-protection mix: perturb only the low 16 bits (~15 µs) so
    // microsecond-level accuracy survives.
    current_time.fractions |= random_number >> 16;
    current_time.write_be(buffer, OFFSET_TRANSMIT_TIMESTAMP);

    Ok(())
}

/// Validates and parses a server response. `request_time` must be the
/// exact (post-mix) timestamp that was embedded by [`serialize_request`];
/// `response_rx_time` is T4, the local receive time.
pub fn deserialize_response(
    request_time: &NtpTimestamp,
    response_rx_time: &NtpTimestamp,
    buffer: &[u8],
) -> Result<DeserializeOutcome> {
    if buffer.len() < PACKET_BASE_SIZE {
        return Err(Error::BufferTooSmall);
    }

    let li_vn_mode = buffer[OFFSET_LI_VN_MODE];
    if li_vn_mode & MODE_MASK != SERVER_MODE {
        return Err(Error::InvalidResponse);
    }

    let originate =
        NtpTimestamp::read_be(buffer, OFFSET_ORIGINATE_TIMESTAMP);
    if originate != *request_time {
        return Err(Error::InvalidResponse);
    }

    let stratum = buffer[OFFSET_STRATUM];
    if stratum == KOD_STRATUM {
        let code = u32::from_be_bytes(
            buffer[OFFSET_REFERENCE_ID..OFFSET_REFERENCE_ID + 4]
                .try_into()
                .expect("4-byte slice"),
        );
        let kind = match code {
            KOD_CODE_DENY | KOD_CODE_RSTR => {
                Error::RejectedResponseChangeServer
            }
            KOD_CODE_RATE => Error::RejectedResponseRetryWithBackoff,
            _ => Error::RejectedResponseOtherCode,
        };
        let data = ResponseData {
            rejected_response_code: code,
            ..ResponseData::default()
        };
        return Ok(DeserializeOutcome::Rejected(kind, data));
    }

    let server_time =
        NtpTimestamp::read_be(buffer, OFFSET_TRANSMIT_TIMESTAMP);
    let receive_time =
        NtpTimestamp::read_be(buffer, OFFSET_RECEIVE_TIMESTAMP);
    let leap_second_type =
        LeapIndicator::from_bits(li_vn_mode >> LEAP_SHIFT);

    let (clock_offset_sec, overflow) = calculate_clock_offset(
        request_time,
        &receive_time,
        &server_time,
        response_rx_time,
    );

    let data = ResponseData {
        server_time,
        leap_second_type,
        rejected_response_code: 0,
        clock_offset_sec,
    };

    if overflow {
        Ok(DeserializeOutcome::Overflow(data))
    } else {
        Ok(DeserializeOutcome::Accepted(data))
    }
}

/// `spec.md` §4.1's clock-offset algorithm:
/// `offset = (d(T2,T1) + d(T3,T4)) / 2`, era-safe, with the sum checked
/// for `i32` representability. Returns `(offset, overflowed)`.
fn calculate_clock_offset(
    t1: &NtpTimestamp,
    t2: &NtpTimestamp,
    t3: &NtpTimestamp,
    t4: &NtpTimestamp,
) -> (i32, bool) {
    use crate::timestamp::era_diff;

    let d1 = era_diff(t2.seconds, t1.seconds);
    let d2 = era_diff(t3.seconds, t4.seconds);
    let offset = (d1 + d2) / 2;

    if offset > i64::from(i32::MAX) || offset < i64::from(i32::MIN) {
        (i32::MAX, true)
    } else {
        (offset as i32, false)
    }
}
