//! Poll-interval recommendation from a clock frequency tolerance and a
//! desired accuracy (`spec.md` §4.1, `CalculatePollInterval`).

use crate::error::{Error, Result};

/// Recommends a poll interval, in seconds, as the largest power of two not
/// exceeding `desiredAccuracyMs × 1000 / clockFreqToleranceHzPerMHz`.
///
/// Note: the worked example in `spec.md` §8 (`500 ppm, 60000 ms` ⇒ `2^18`)
/// does not reproduce under this formula (it yields `2^16`); this function
/// implements §4.1's algebraic definition literally. See `DESIGN.md`'s
/// "Open Question decisions" for the recorded reasoning.
pub fn calculate_poll_interval(
    clock_freq_tolerance_hz_per_mhz: u32,
    desired_accuracy_ms: u32,
) -> Result<u32> {
    if clock_freq_tolerance_hz_per_mhz == 0 || desired_accuracy_ms == 0 {
        return Err(Error::BadParameter);
    }

    let exact = u64::from(desired_accuracy_ms) * 1000
        / u64::from(clock_freq_tolerance_hz_per_mhz);

    if exact < 1 {
        return Err(Error::ZeroPollInterval);
    }

    let exponent = 63 - exact.leading_zeros();
    Ok(1u32 << exponent)
}
