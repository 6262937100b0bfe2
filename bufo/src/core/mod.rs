//! The messaging engine.
//!
//! [`Context`] owns the socket, the clock and the send queue, and exposes
//! the two halves of the RFC7252 message layer:
//!
//! - **outbound**: [`Context::send`], [`Context::send_confirmed`] and the
//!   retransmission loop that [`Context::poll`] drives
//! - **inbound**: parsing, ACK/RST correlation and request/response
//!   routing, also driven by [`Context::poll`]
//!
//! The resource layer is not owned; every `poll` borrows a
//! [`Registry`](crate::resource::Registry) for the duration of the call.

mod error;
mod inbound;
mod outbound;

pub use error::Error;
pub use inbound::{no_response_verdict, Verdict};
pub use outbound::error_reply;

use ::core::fmt;

use no_std_net::SocketAddr;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std_alloc::boxed::Box;
use std_alloc::vec::Vec;
use toad_msg::alloc::Message;
use toad_msg::{Id, OptNumber, Token};

use crate::config::Config;
use crate::net::{Addrd, Socket};
use crate::queue::SendQueue;
use crate::resource::{Registry, UriKey};
use crate::tid::Tid;
use crate::time::{self, Clock, Tick};

/// Invoked when a response arrives for a request we sent confirmably.
///
/// Arguments are the original request (if it was still queued), the
/// response as it arrived, and the transaction id that correlated them.
pub type ResponseHandler = Box<dyn FnMut(Option<&Message>, Addrd<&Message>, Tid)>;

/// The engine. One per socket.
pub struct Context<S, C> {
  pub(crate) config: Config,
  pub(crate) sock: S,
  pub(crate) clock: C,
  pub(crate) queue: SendQueue,
  pub(crate) rng: ChaCha8Rng,
  next_id: u16,
  known_critical: Vec<OptNumber>,
  pub(crate) wkc_key: UriKey,
  pub(crate) on_response: Option<ResponseHandler>,
  recv_buf: Vec<u8>,
}

impl<S: fmt::Debug, C: fmt::Debug> fmt::Debug for Context<S, C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Context")
     .field("config", &self.config)
     .field("sock", &self.sock)
     .field("clock", &self.clock)
     .field("queue", &self.queue)
     .field("next_id", &self.next_id)
     .field("known_critical", &self.known_critical)
     .field("on_response", &self.on_response.as_ref().map(|_| ".."))
     .finish()
  }
}

impl<S: Socket, C: Clock> Context<S, C> {
  /// Create an engine around a bound socket and a started clock.
  ///
  /// The message-id counter and retransmission jitter are seeded from the
  /// clock so that a rebooted endpoint does not replay the id sequence it
  /// used before the reboot (RFC7252 §4.4).
  pub fn new(config: Config, sock: S, clock: C) -> Result<Self, Error<S::Error>> {
    let now = clock.try_now().map_err(|_| Error::Clock)?;
    let now = time::to_ticks(now).ok_or(Error::Clock)?;

    let mut rng = ChaCha8Rng::seed_from_u64(now);
    let next_id = rng.gen();

    Ok(Self { config,
              sock,
              clock,
              queue: SendQueue::new(),
              rng,
              next_id,
              known_critical: Vec::new(),
              wkc_key: UriKey::well_known_core(),
              on_response: None,
              recv_buf: Vec::new() })
  }

  /// The current time in engine ticks
  pub fn try_now(&self) -> Result<Tick, Error<S::Error>> {
    self.clock
        .try_now()
        .map_err(|_| Error::Clock)
        .and_then(|instant| time::to_ticks(instant).ok_or(Error::Clock))
  }

  /// The next fresh message id.
  ///
  /// Ids are handed out sequentially from a random starting point and
  /// wrap; within one MAX_TRANSMIT_SPAN the sequence cannot collide.
  pub fn next_message_id(&mut self) -> Id {
    let id = self.next_id;
    self.next_id = self.next_id.wrapping_add(1);
    Id(id)
  }

  /// Teach the engine a critical option number (an extension it should
  /// not reject inbound messages for)
  pub fn register_critical(&mut self, n: OptNumber) {
    if !self.known_critical.contains(&n) {
      self.known_critical.push(n);
    }
  }

  pub(crate) fn understands_critical(&self, n: OptNumber) -> bool {
    crate::option::builtin_critical(n) || self.known_critical.contains(&n)
  }

  /// Install the callback invoked when responses to our own confirmable
  /// requests arrive
  pub fn on_response(&mut self, f: impl FnMut(Option<&Message>, Addrd<&Message>, Tid) + 'static) {
    self.on_response = Some(Box::new(f));
  }

  /// The address of the interface the engine sends and receives on
  pub fn local_addr(&self) -> SocketAddr {
    self.sock.local_addr()
  }

  /// Do one round of work: fire every retransmission that has come due,
  /// then receive and dispatch at most one inbound datagram.
  ///
  /// Call this in a loop, sleeping [`Context::next_timeout`] between
  /// iterations.
  pub fn poll<R: Registry>(&mut self, reg: &mut R) -> Result<(), Error<S::Error>> {
    let now = self.try_now()?;
    self.retransmit_due(reg, now)?;

    let mut buf = ::core::mem::take(&mut self.recv_buf);
    buf.resize(self.config.max_pdu_size, 0);

    let polled = self.sock.poll(&mut buf).map_err(Error::Sock);
    let result = match polled {
      | Err(e) => Err(e),
      | Ok(None) => Ok(()),
      | Ok(Some(Addrd(n, addr))) => self.dispatch(reg, Addrd(&buf[..n], addr)),
    };

    self.recv_buf = buf;
    result
  }

  /// Drop every queued confirmable message to `dst` carrying `token`,
  /// returning how many were cancelled.
  ///
  /// Useful for abandoning an exchange (e.g. an observation being torn
  /// down) without waiting for the peer to acknowledge or reset.
  pub fn cancel_all_messages(&mut self, dst: SocketAddr, token: Token) -> usize {
    self.queue.remove_matching(dst, token)
  }

  /// Ticks until the next queued retransmission fires, or `None` when
  /// nothing is in flight
  pub fn next_timeout(&self, now: Tick) -> Option<Tick> {
    self.queue.next_timeout(now)
  }

  /// `true` when no confirmable messages await acknowledgement, i.e.
  /// shutting down now abandons nothing
  pub fn can_exit(&self) -> bool {
    self.queue.is_empty()
  }
}
