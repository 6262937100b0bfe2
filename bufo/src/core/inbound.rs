use toad_msg::alloc::Message;
use toad_msg::{Code, CodeKind, Token, TryFromBytes, Type};

use super::{Context, Error};
use crate::logging::msg_summary;
use crate::multicast::is_multicast;
use crate::net::{Addrd, Socket};
use crate::option::{self, known};
use crate::queue::Sent;
use crate::resource::{Registry, UriKey};
use crate::tid::Tid;
use crate::time::Clock;

/// Should a response be put on the wire?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  /// Nothing asked us not to
  Send,
  /// The request's No-Response option ([RFC7967](https://datatracker.ietf.org/doc/html/rfc7967))
  /// declared disinterest in this response class
  Suppress,
}

/// Apply the request's No-Response option to a response `code`.
///
/// Empty codes are never suppressed; an empty ACK is transport, not a
/// response.
pub fn no_response_verdict(req: &Message, code: Code) -> Verdict {
  if code.class == 0 {
    return Verdict::Send;
  }

  match option::first_value(req, known::NO_RESPONSE) {
    | None => Verdict::Send,
    | Some(bytes) => {
      let bits = option::decode_u32(bytes);
      match (1u32 << (code.class - 1)) & bits {
        | 0 => Verdict::Send,
        | _ => Verdict::Suppress,
      }
    },
  }
}

impl<S: Socket, C: Clock> Context<S, C> {
  /// Parse one datagram and route it through the RFC7252 §4.2/§4.3
  /// message-layer state machine.
  ///
  /// Unparseable datagrams and unknown versions are logged and dropped.
  pub(crate) fn dispatch<R: Registry>(&mut self,
                                      reg: &mut R,
                                      dgram: Addrd<&[u8]>)
                                      -> Result<(), Error<S::Error>> {
    let msg = match Message::try_from_bytes(dgram.data()) {
      | Ok(msg) => msg,
      | Err(e) => {
        log::info!(target: "bufo", "dropping malformed datagram from {}: {:?}", dgram.addr(), e);
        return Ok(());
      },
    };

    if msg.ver.0 != 1 {
      log::info!(target: "bufo", "dropping version {} datagram from {}", msg.ver.0, dgram.addr());
      return Ok(());
    }

    log::trace!(target: "bufo", "recvd {} <- {}", msg_summary(&msg), dgram.addr());

    let msg = Addrd(msg, dgram.addr());
    let tid = Tid::of(msg.addr(), msg.data().id);

    let mut acked: Option<Sent> = None;
    match msg.data().ty {
      | Type::Ack => {
        acked = self.queue.remove(tid);

        // an empty ACK is a bare receipt (or a separate-response
        // promise); there is nothing to route
        if msg.data().code == crate::code::EMPTY {
          return Ok(());
        }

        if let Some(sent) = &acked {
          if sent.msg.data().code.class >= 2 {
            reg.touch_observer(msg.addr(), sent.token());
          }
        }
      },
      | Type::Reset => {
        log::warn!(target: "bufo", "got RST <- {}", msg.addr());
        if let Some(sent) = self.queue.remove(tid) {
          reg.remove_observers(msg.addr(), sent.token());
          self.queue.remove_matching(msg.addr(), sent.token());
        }
        return Ok(());
      },
      | Type::Con | Type::Non => {
        if let Some(rejection) = self.check_critical(msg.as_ref()) {
          if let Some(rejection) = rejection {
            self.send(self.sock.local_addr(), Addrd(&rejection, msg.addr()))?;
          }
          return Ok(());
        }
      },
    }

    match msg.data().code.kind() {
      | CodeKind::Request => self.handle_request(reg, msg.as_ref()),
      | CodeKind::Response if msg.data().code.class >= 2 => {
        self.handle_response(msg.as_ref(), tid, acked)
      },
      // an empty CON is a ping, an empty NON is invalid, and the 1.xx
      // class is reserved; all get Reset (§4.2/§4.3) unless we are a
      // multicast listener
      | CodeKind::Empty | CodeKind::Response => match msg.data().ty {
        | Type::Con | Type::Non if !is_multicast(&self.sock.local_addr()) => {
          self.send_rst(msg.as_ref())
        },
        | _ => Ok(()),
      },
    }
  }

  /// Reject messages carrying critical options nobody here understands.
  ///
  /// `None` means the message is acceptable. `Some(None)` means drop it
  /// silently (it was non-confirmable); `Some(Some(msg))` is the 4.02
  /// response to send, echoing the offending options (§5.4.1).
  fn check_critical(&self, msg: Addrd<&Message>) -> Option<Option<Message>> {
    let mut unknown = msg.data()
                         .opts
                         .iter()
                         .filter(|(n, _)| {
                           option::is_critical(**n) && !self.understands_critical(**n)
                         })
                         .peekable();

    unknown.peek()?;

    match msg.data().ty {
      | Type::Con => {
        let mut reply = super::error_reply(msg.data(), crate::code::BAD_OPTION);
        unknown.for_each(|(n, vs)| {
                 reply.opts.insert(*n, vs.clone());
               });
        Some(Some(reply))
      },
      | _ => {
        log::info!(target: "bufo", "silently dropping {} <- {} (unknown critical option)",
                   msg_summary(msg.data()),
                   msg.addr());
        Some(None)
      },
    }
  }

  fn handle_request<R: Registry>(&mut self,
                                 reg: &mut R,
                                 req: Addrd<&Message>)
                                 -> Result<(), Error<S::Error>> {
    let local = self.sock.local_addr();
    let method = req.data().code;
    let key = UriKey::of_request(req.data());

    let (found, handles, observable) = match reg.resource(key) {
      | None => (false, false, false),
      | Some(r) => (true, r.handles(method), r.observable()),
    };

    let reply = match (found, handles) {
      | (_, false) if key == self.wkc_key && method == crate::code::GET => {
        crate::discovery::well_known_response(&self.config, reg, req)
      },
      | (_, false) if key == self.wkc_key => {
        super::error_reply(req.data(), crate::code::METHOD_NOT_ALLOWED)
      },
      | (false, _) => super::error_reply(req.data(), crate::code::NOT_FOUND),
      | (true, false) => super::error_reply(req.data(), crate::code::METHOD_NOT_ALLOWED),
      | (true, true) => {
        let observe = option::first_value(req.data(), known::OBSERVE).map(option::decode_u32);

        if observable {
          match observe {
            | Some(action) if action & 1 == 0 => {
              if reg.add_observer(key, local, req.addr(), req.data().token) {
                reg.touch_observer(req.addr(), req.data().token);
              }
            },
            | Some(_) => reg.delete_observer(key, req.addr(), req.data().token),
            | None => (),
          }
        }

        let ty = match req.data().ty {
          | Type::Con => Type::Ack,
          | _ => Type::Non,
        };
        let mut reply = Message::new(ty, crate::code::EMPTY, req.data().id, req.data().token);

        match reg.resource(key) {
          | Some(r) => r.handle(method, req, &mut reply),
          | None => (),
        }

        // the handler refused the observation after all
        if observe.is_some() && reply.code.class > 2 {
          reg.delete_observer(key, req.addr(), req.data().token);
        }

        reply
      },
    };

    let mut reply = reply;
    if reply.ty == Type::Ack && reply.code == crate::code::EMPTY {
      reply.token = Token(Default::default());
    }

    // a handler that declined to answer a NON request answers nothing;
    // there is no empty-NON message to send (§4.3)
    if reply.ty == Type::Non && reply.code == crate::code::EMPTY {
      log::debug!(target: "bufo", "no reply to NON {} <- {}",
                  msg_summary(req.data()),
                  req.addr());
      return Ok(());
    }

    match no_response_verdict(req.data(), reply.code) {
      | Verdict::Suppress => {
        log::debug!(target: "bufo", "suppressed {} -> {} (No-Response)",
                    msg_summary(&reply),
                    req.addr());
        Ok(())
      },
      | Verdict::Send => {
        // error replies to multicast requests would make every member of
        // the group answer at once
        if reply.ty == Type::Non && reply.code.class >= 4 && is_multicast(&local) {
          return Ok(());
        }
        self.send_reply(local, Addrd(reply, req.addr())).map(|_| ())
      },
    }
  }

  fn handle_response(&mut self,
                     resp: Addrd<&Message>,
                     tid: Tid,
                     acked: Option<Sent>)
                     -> Result<(), Error<S::Error>> {
    // whatever request this answers, it no longer needs retransmitting
    self.queue.remove_matching(resp.addr(), resp.data().token);

    match self.on_response.take() {
      | Some(mut f) => {
        self.send_ack(resp)?;
        f(acked.as_ref().map(|sent| sent.msg.data()), resp, tid);
        self.on_response = Some(f);
        Ok(())
      },
      | None => match resp.data().ty {
        | Type::Con => self.send_rst(resp),
        | _ => Ok(()),
      },
    }
  }
}
