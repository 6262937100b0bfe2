use embedded_time::duration::Milliseconds;
use embedded_time::Instant;

/// A duration in milliseconds
pub type Millis = Milliseconds<u64>;

/// The engine's notion of "now": a monotonic count of [`TICKS_PER_SECOND`]ths
/// of a second since the clock was constructed.
///
/// All queue deltas, timeouts and backoff arithmetic are done on ticks.
pub type Tick = u64;

/// Resolution of [`Tick`]
pub const TICKS_PER_SECOND: u64 = 1000;

/// Fractional bits used when scaling the OS clock's sub-second
/// remainder to ticks
const FRAC: u32 = 10;

/// Right-shift that rounds half up instead of truncating.
///
/// This is the `SHR_FP` primitive all of the fixed-point timing math
/// ([`crate::retry`]) is built on.
pub(crate) const fn shr_round_up(val: u64, bits: u32) -> u64 {
  (val + (1 << (bits - 1))) >> bits
}

/// A clock that provides timing in `u64`s
///
/// Architecturally equivalent to [`embedded_time::Clock`],
/// pinning the tick storage type to `u64`.
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Scale an [`Instant`] to engine ticks.
///
/// Whole seconds convert exactly; the sub-second remainder goes through a
/// Q.10 fixed-point ratio so that clocks whose native rate is not a clean
/// multiple of [`TICKS_PER_SECOND`] still come out within half a tick.
///
/// `None` means the instant's duration-since-epoch did not fit the
/// millisecond scale, which on a `u64` clock takes half a billion years.
pub fn to_ticks<C: Clock>(instant: Instant<C>) -> Option<Tick> {
  let ratio = (TICKS_PER_SECOND << FRAC) / 1000;
  Millis::try_from(instant.duration_since_epoch()).ok()
                                                  .map(|Milliseconds(millis)| {
                                                    let secs = millis / 1000;
                                                    let sub = millis % 1000;
                                                    secs * TICKS_PER_SECOND
                                                    + shr_round_up(sub * ratio, FRAC)
                                                  })
}

#[cfg(test)]
mod test {
  use embedded_time::Clock as _;

  use super::*;
  use crate::test::ClockMock;

  #[test]
  fn shr_rounds_half_up() {
    assert_eq!(shr_round_up(0, 6), 0);
    assert_eq!(shr_round_up(31, 6), 0);
    assert_eq!(shr_round_up(32, 6), 1);
    assert_eq!(shr_round_up(64, 6), 1);
    assert_eq!(shr_round_up(96, 6), 2);
  }

  #[test]
  fn ticks_track_the_clock() {
    let clock = ClockMock::new();

    clock.set(0);
    assert_eq!(to_ticks(clock.try_now().unwrap()), Some(0));

    // ClockMock counts nanoseconds
    clock.set(1_500_000_000);
    assert_eq!(to_ticks(clock.try_now().unwrap()),
               Some(TICKS_PER_SECOND + TICKS_PER_SECOND / 2));

    clock.set(120_250_000_000);
    assert_eq!(to_ticks(clock.try_now().unwrap()),
               Some(120 * TICKS_PER_SECOND + 250));
  }
}
