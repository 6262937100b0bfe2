//! RFC7252 §4.8 gives two transmission parameters that govern how long we
//! wait before retransmitting an unacknowledged CON message:
//! `ACK_TIMEOUT` (2 seconds) and `ACK_RANDOM_FACTOR` (1.5).
//!
//! The initial wait is a uniformly-jittered value in
//! `[ACK_TIMEOUT, ACK_TIMEOUT * ACK_RANDOM_FACTOR]`, doubling on every
//! retransmission (§4.2 binary exponential backoff).
//!
//! All of it is evaluated in Q.6 fixed point. The jitter byte is the only
//! input wider than 8 significant bits, so intermediate products fit
//! comfortably in a `u64` and the math is exact on every target.

use crate::config::Config;
use crate::time::{shr_round_up, Tick, TICKS_PER_SECOND};

/// Fractional bits of [`Q6`]
pub const FRAC_BITS: u32 = 6;

/// Width of the random byte that jitters the initial timeout
pub const MAX_BITS: u32 = 8;

/// An unsigned fixed-point number with [`FRAC_BITS`] fractional bits.
///
/// ```
/// use bufo::retry::Q6;
///
/// assert_eq!(Q6::from_int(2), Q6(128));
/// // 1.5
/// assert_eq!(Q6(96).0, Q6::ONE.0 + Q6::ONE.0 / 2);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Q6(pub u16);

impl Q6 {
  /// 1.0
  pub const ONE: Q6 = Q6(1 << FRAC_BITS);

  /// Represent a whole number
  pub const fn from_int(n: u16) -> Q6 {
    Q6(n << FRAC_BITS)
  }
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// The jittered wait before the first retransmission of a CON message,
/// in ticks.
///
/// `random` is a fresh uniform byte; `0` maps to exactly `ACK_TIMEOUT`
/// and `255` to (within rounding) `ACK_TIMEOUT * ACK_RANDOM_FACTOR`.
///
/// Evaluated entirely in fixed point:
/// 1. scale the byte by `ACK_RANDOM_FACTOR - 1.0` and drop the byte's
///    [`MAX_BITS`] with a rounding shift,
/// 2. add `1.0` and multiply by `ACK_TIMEOUT`, dropping one factor's
///    [`FRAC_BITS`],
/// 3. convert seconds to ticks, dropping the last [`FRAC_BITS`].
pub fn initial_timeout(cfg: &Config, random: u8) -> Tick {
  let jitter = (cfg.ack_random_factor.0 - Q6::ONE.0) as u64;
  let r = shr_round_up(jitter * random as u64, MAX_BITS);
  let r = shr_round_up((r + Q6::ONE.0 as u64) * cfg.ack_timeout.0 as u64,
                       FRAC_BITS);
  shr_round_up(TICKS_PER_SECOND * r, FRAC_BITS)
}

/// The wait before the `n + 1`th retransmission: the initial timeout
/// doubled `n` times.
pub fn backoff(initial_timeout: Tick, retransmits: Attempts) -> Tick {
  initial_timeout << retransmits.0
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn initial_timeout_spans_ack_timeout_to_factor_times_ack_timeout() {
    let cfg = Config::default();

    assert_eq!(initial_timeout(&cfg, 0), 2 * TICKS_PER_SECOND);
    assert_eq!(initial_timeout(&cfg, 255), 3 * TICKS_PER_SECOND);

    for r in 0..=255u8 {
      let t = initial_timeout(&cfg, r);
      assert!(t >= 2 * TICKS_PER_SECOND, "r = {} gave {}", r, t);
      assert!(t <= 3 * TICKS_PER_SECOND, "r = {} gave {}", r, t);
    }
  }

  #[test]
  fn initial_timeout_is_monotone_in_the_jitter_byte() {
    let cfg = Config::default();
    let mut last = 0;
    for r in 0..=255u8 {
      let t = initial_timeout(&cfg, r);
      assert!(t >= last);
      last = t;
    }
  }

  #[test]
  fn backoff_doubles() {
    let init = 2 * TICKS_PER_SECOND;
    assert_eq!(backoff(init, Attempts(0)), 2000);
    assert_eq!(backoff(init, Attempts(1)), 4000);
    assert_eq!(backoff(init, Attempts(4)), 32000);
  }
}
