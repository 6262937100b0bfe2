use crate::retry::{Attempts, Q6};

/// Transmission parameters (RFC7252 §4.8) and PDU sizing.
///
/// The defaults are the RFC's; tightening `ack_timeout` below 1 second is
/// explicitly forbidden by the RFC and will make the engine misbehave
/// around the backoff arithmetic's assumptions, so don't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Config {
  /// `ACK_TIMEOUT`: the lower bound of the initial retransmission wait,
  /// in seconds, Q.6 fixed point.
  ///
  /// Defaults to 2 seconds:
  /// ```
  /// use bufo::config::Config;
  /// use bufo::retry::Q6;
  ///
  /// assert_eq!(Config::default().ack_timeout, Q6::from_int(2));
  /// ```
  pub ack_timeout: Q6,

  /// `ACK_RANDOM_FACTOR`: the initial wait is jittered up to this
  /// multiple of `ack_timeout`. Q.6 fixed point.
  ///
  /// Defaults to 1.5:
  /// ```
  /// use bufo::config::Config;
  /// use bufo::retry::Q6;
  ///
  /// assert_eq!(Config::default().ack_random_factor, Q6(96));
  /// ```
  pub ack_random_factor: Q6,

  /// `MAX_RETRANSMIT`: how many times a CON message is retransmitted
  /// before we give up on it.
  ///
  /// Defaults to 4 attempts:
  /// ```
  /// use bufo::config::Config;
  /// use bufo::retry::Attempts;
  ///
  /// assert_eq!(Config::default().max_retransmit, Attempts(4));
  /// ```
  pub max_retransmit: Attempts,

  /// Capacity ceiling for PDUs we build ourselves (discovery responses).
  ///
  /// Defaults to 1400 bytes, large enough for any unfragmented UDP
  /// datagram we'd want to emit:
  /// ```
  /// use bufo::config::Config;
  ///
  /// assert_eq!(Config::default().max_pdu_size, 1400);
  /// ```
  pub max_pdu_size: usize,

  /// Largest Block2 size exponent we will honor; requests for bigger
  /// blocks are clamped down to this.
  ///
  /// Defaults to 6 (1024-byte blocks, the largest RFC7959 allows):
  /// ```
  /// use bufo::config::Config;
  ///
  /// assert_eq!(Config::default().max_block_szx, 6);
  /// ```
  pub max_block_szx: u8,
}

impl Default for Config {
  fn default() -> Self {
    Config { ack_timeout: Q6::from_int(2),
             ack_random_factor: Q6(96),
             max_retransmit: Attempts(4),
             max_pdu_size: 1400,
             max_block_szx: 6 }
  }
}
