use ::std::time::{Duration, Instant, SystemTime};

use embedded_time::rate::Fraction;

use crate::time::{Tick, TICKS_PER_SECOND};

/// Networking! woohoo!
pub mod net;

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives.
///
/// Ticks count from the moment the clock was constructed; the wall-clock
/// time of that moment is kept so ticks can be mapped back to
/// [`SystemTime`]s for humans and logs.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
  start: Instant,
  epoch: SystemTime,
}

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock; now is tick zero
  pub fn new() -> Self {
    Self { start: Instant::now(),
           epoch: SystemTime::now() }
  }

  /// The wall-clock moment an engine tick corresponds to
  pub fn to_walltime(&self, tick: Tick) -> SystemTime {
    self.epoch + Duration::from_micros(tick * (1_000_000 / TICKS_PER_SECOND))
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  // microseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let elapsed = Instant::now().duration_since(self.start);
    Ok(embedded_time::Instant::new(elapsed.as_micros() as u64))
  }
}

#[cfg(test)]
mod test {
  use embedded_time::Clock as _;

  use super::*;
  use crate::time::to_ticks;

  #[test]
  fn clock_starts_at_zero_and_advances() {
    let clock = Clock::new();
    let a = to_ticks(clock.try_now().unwrap()).unwrap();
    let b = to_ticks(clock.try_now().unwrap()).unwrap();
    assert!(a <= b);
    // freshly constructed clocks are within a second of tick zero
    assert!(a < TICKS_PER_SECOND);
  }

  #[test]
  fn walltime_tracks_ticks() {
    let clock = Clock::new();
    let later = clock.to_walltime(2 * TICKS_PER_SECOND);
    assert_eq!(later.duration_since(clock.epoch).unwrap(),
               Duration::from_secs(2));
  }
}
