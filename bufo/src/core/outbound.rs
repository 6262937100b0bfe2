use no_std_net::SocketAddr;
use rand::Rng;
use std_alloc::vec::Vec;
use toad_msg::alloc::Message;
use toad_msg::{Code, Token, TryIntoBytes, Type};

use super::{Context, Error};
use crate::logging::msg_summary;
use crate::multicast::is_multicast;
use crate::net::{Addrd, Socket};
use crate::queue::Sent;
use crate::resource::Registry;
use crate::retry::{self, Attempts};
use crate::tid::Tid;
use crate::time::{Clock, Tick};

/// Build the error response RFC7252 §5.9.2/§5.9.3 calls for: `code`
/// with the request's id and token, acknowledging in-band when the
/// request was confirmable.
///
/// Error responses carry no payload; diagnostic text is the business of
/// layers that know what went wrong.
pub fn error_reply(req: &Message, code: Code) -> Message {
  let ty = match req.ty {
    | Type::Con => Type::Ack,
    | _ => Type::Non,
  };
  Message::new(ty, code, req.id, req.token)
}

impl<S: Socket, C: Clock> Context<S, C> {
  /// Serialize and transmit a message, fire-and-forget.
  ///
  /// `local` is the interface the message leaves from; error-class
  /// messages are never sent from a multicast interface (RFC7252 §8.2)
  /// and yield `Ok(None)`.
  pub fn send(&mut self,
              local: SocketAddr,
              msg: Addrd<&Message>)
              -> Result<Option<Tid>, Error<S::Error>> {
    if msg.data().code.class > 2 && is_multicast(&local) {
      log::debug!(target: "bufo", "suppressed {} -> {} (multicast interface)",
                  msg_summary(msg.data()),
                  msg.addr());
      return Ok(None);
    }

    let tid = Tid::of(msg.addr(), msg.data().id);
    let bytes = (*msg.data()).clone()
                             .try_into_bytes::<Vec<u8>>()
                             .map_err(Error::ToBytes)?;

    self.transmit(Addrd(&bytes, msg.addr()))?;
    log::trace!(target: "bufo", "sent {} -> {}", msg_summary(msg.data()), msg.addr());

    Ok(Some(tid))
  }

  /// Send a confirmable message and queue it for retransmission until the
  /// peer acknowledges (or resets, or [`Config::max_retransmit`] attempts
  /// are exhausted).
  ///
  /// The initial timeout is `ACK_TIMEOUT * (1..ACK_RANDOM_FACTOR)`,
  /// jittered per message.
  ///
  /// [`Config::max_retransmit`]: crate::config::Config::max_retransmit
  pub fn send_confirmed(&mut self,
                        local: SocketAddr,
                        msg: Addrd<Message>)
                        -> Result<Option<Tid>, Error<S::Error>> {
    let tid = match self.send(local, msg.as_ref())? {
      | Some(tid) => tid,
      | None => return Ok(None),
    };

    let now = self.try_now()?;
    let random = self.rng.gen::<u8>();
    let timeout = retry::initial_timeout(&self.config, random);

    self.queue.schedule(now,
                        timeout,
                        Sent { tid,
                               t: 0,
                               timeout,
                               retransmits: Attempts(0),
                               local,
                               msg });

    Ok(Some(tid))
  }

  /// Send a reply the way its type asks to be sent: confirmable replies
  /// are tracked and retransmitted, everything else is fire-and-forget.
  pub fn send_reply(&mut self,
                    local: SocketAddr,
                    msg: Addrd<Message>)
                    -> Result<Option<Tid>, Error<S::Error>> {
    match msg.data().ty {
      | Type::Con => self.send_confirmed(local, msg),
      | _ => self.send(local, msg.as_ref()),
    }
  }

  /// Acknowledge `rcvd` with an empty ACK (a separate-response promise).
  ///
  /// Does nothing unless `rcvd` is confirmable.
  pub fn send_ack(&mut self, rcvd: Addrd<&Message>) -> Result<(), Error<S::Error>> {
    match rcvd.data().ty {
      | Type::Con => self.send_empty(rcvd, Type::Ack),
      | _ => Ok(()),
    }
  }

  /// Reject `rcvd` with a Reset
  pub fn send_rst(&mut self, rcvd: Addrd<&Message>) -> Result<(), Error<S::Error>> {
    self.send_empty(rcvd, Type::Reset)
  }

  /// An empty message (§4.3) mirrors the id of what it acknowledges or
  /// rejects and carries nothing else, not even a token.
  fn send_empty(&mut self, rcvd: Addrd<&Message>, ty: Type) -> Result<(), Error<S::Error>> {
    let empty = Message::new(ty,
                             crate::code::EMPTY,
                             rcvd.data().id,
                             Token(Default::default()));
    self.send(self.sock.local_addr(), Addrd(&empty, rcvd.addr()))
        .map(|_| ())
  }

  /// Retransmit one overdue message, or give up on it.
  fn retransmit<R: Registry>(&mut self,
                             reg: &mut R,
                             now: Tick,
                             mut node: Sent)
                             -> Result<(), Error<S::Error>> {
    if node.retransmits.0 < self.config.max_retransmit.0 {
      node.retransmits.0 += 1;
      let delay = retry::backoff(node.timeout, node.retransmits);

      log::debug!(target: "bufo", "retransmit {:?} of {} -> {} (next in {} ticks)",
                  node.retransmits,
                  msg_summary(node.msg.data()),
                  node.msg.addr(),
                  delay);

      let bytes = node.msg
                      .data()
                      .clone()
                      .try_into_bytes::<Vec<u8>>()
                      .map_err(Error::ToBytes)?;
      let dst = node.msg.addr();

      self.queue.schedule(now, delay, node);
      return self.transmit(Addrd(&bytes, dst));
    }

    log::warn!(target: "bufo", "giving up on {} -> {} after {:?} retransmissions",
               msg_summary(node.msg.data()),
               node.msg.addr(),
               node.retransmits);

    // an abandoned response is a notification whose observer is gone
    if node.msg.data().code.class >= 2 {
      reg.handle_failed_notify(node.msg.addr(), node.token());
    }

    Ok(())
  }

  /// Fire every retransmission whose deadline `now` has passed
  pub(crate) fn retransmit_due<R: Registry>(&mut self,
                                            reg: &mut R,
                                            now: Tick)
                                            -> Result<(), Error<S::Error>> {
    let due = self.queue.adjust_basetime(now);
    for _ in 0..due {
      match self.queue.pop() {
        | Some(node) => self.retransmit(reg, now, node)?,
        | None => break,
      }
    }
    Ok(())
  }

  fn transmit(&self, bytes: Addrd<&[u8]>) -> Result<(), Error<S::Error>> {
    nb::block!(self.sock.send(bytes)).map_err(Error::Sock)
  }
}
