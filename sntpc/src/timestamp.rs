//! NTP 64-bit timestamps and era-safe arithmetic.

use crate::error::{Error, Result};

/// One NTP fraction unit is `2^-32` s; this many fractions make up one
/// microsecond.
pub const FRACTIONS_PER_MICROSECOND: u32 = 4_295;

/// NTP seconds value of the UNIX epoch (1970-01-01T00:00:00Z).
pub const SNTP_TIME_AT_UNIX_EPOCH_SECS: u32 = 2_208_988_800;

/// Largest NTP seconds value (era 1) still representable as a signed
/// 32-bit UNIX time (2038-01-19T03:14:07Z).
pub const SNTP_TIME_AT_LARGEST_UNIX_TIME_SECS: u32 = 61_505_151;

/// Width, in seconds, of one NTP era.
const ERA_WIDTH: i64 = 1i64 << 32;

/// An NTP 64-bit timestamp: seconds since the NTP epoch plus a fractional
/// part where one unit is `2^-32` s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NtpTimestamp {
    pub seconds: u32,
    pub fractions: u32,
}

impl NtpTimestamp {
    pub const fn new(seconds: u32, fractions: u32) -> Self {
        Self { seconds, fractions }
    }

    /// Reads a big-endian 8-byte NTP timestamp from `buf[offset..offset+8]`.
    pub(crate) fn read_be(buf: &[u8], offset: usize) -> Self {
        let seconds = u32::from_be_bytes(
            buf[offset..offset + 4].try_into().expect("4-byte slice"),
        );
        let fractions = u32::from_be_bytes(
            buf[offset + 4..offset + 8]
                .try_into()
                .expect("4-byte slice"),
        );
        Self { seconds, fractions }
    }

    /// Writes this timestamp big-endian into `buf[offset..offset+8]`.
    pub(crate) fn write_be(&self, buf: &mut [u8], offset: usize) {
        buf[offset..offset + 4].copy_from_slice(&self.seconds.to_be_bytes());
        buf[offset + 4..offset + 8]
            .copy_from_slice(&self.fractions.to_be_bytes());
    }

    /// Converts to UNIX time if representable (`spec.md` §4.1,
    /// `ConvertToUnixTime`).
    pub fn to_unix_time(self) -> Result<(u32, u32)> {
        let in_era0_unix_range = self.seconds >= SNTP_TIME_AT_UNIX_EPOCH_SECS;
        let in_era1_unix_range =
            self.seconds <= SNTP_TIME_AT_LARGEST_UNIX_TIME_SECS;

        if !(in_era0_unix_range || in_era1_unix_range) {
            return Err(Error::TimeNotSupported);
        }

        let unix_secs = if in_era0_unix_range {
            self.seconds - SNTP_TIME_AT_UNIX_EPOCH_SECS
        } else {
            // Era 1: seconds wrapped past 2^32 relative to the NTP epoch.
            self.seconds + (u32::MAX - SNTP_TIME_AT_UNIX_EPOCH_SECS) + 1
        };
        let unix_micros = self.fractions / FRACTIONS_PER_MICROSECOND;

        Ok((unix_secs, unix_micros))
    }
}

/// Era-adjusted signed difference `a - b`, selecting whichever of the three
/// candidate era relationships (same era, server ahead by one era, client
/// ahead by one era) yields the smallest absolute value. `spec.md` §4.1.
pub fn era_diff(a: u32, b: u32) -> i64 {
    let a = i64::from(a);
    let b = i64::from(b);
    let candidates = [a - b, a + ERA_WIDTH - b, a - (ERA_WIDTH + b)];

    let mut best = candidates[0];
    for &candidate in &candidates[1..] {
        if candidate.abs() < best.abs() {
            best = candidate;
        }
    }

    if best.abs() == ERA_WIDTH / 2 {
        // Era cannot be disambiguated at the exact halfway point; pick the
        // positive-direction boundary and accept the documented 1-second
        // inaccuracy there.
        return ERA_WIDTH / 2;
    }

    best
}

/// Elapsed time in milliseconds between an earlier and a later timestamp,
/// era-safe. Negative results (clock went backwards) are clamped to zero.
pub fn elapsed_ms(earlier: NtpTimestamp, later: NtpTimestamp) -> u64 {
    let secs_diff = era_diff(later.seconds, earlier.seconds);
    let frac_diff =
        i64::from(later.fractions) - i64::from(earlier.fractions);
    let micros_diff =
        secs_diff * 1_000_000 + frac_diff / i64::from(FRACTIONS_PER_MICROSECOND);
    let millis = micros_diff / 1_000;

    if millis < 0 {
        0
    } else {
        millis as u64
    }
}
