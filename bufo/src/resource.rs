//! The engine's view of the resource layer.
//!
//! Resources, their representations and their observer lists live above
//! the messaging engine; dispatch only needs to ask "is there something
//! at this path, will it take this method, run it" plus a handful of
//! observer-lifecycle notifications, and that's exactly the surface
//! [`Registry`] exposes.

use ::core::hash::{Hash, Hasher};

use no_std_net::SocketAddr;
use toad_hash::Blake2Hasher;
use toad_msg::alloc::Message;
use toad_msg::{Code, Token};

use crate::net::Addrd;
use crate::option::known;

/// Identifies a resource by a hash over its Uri-Path segments.
///
/// Both sides of the [`Registry`] seam derive keys the same way, so the
/// engine never needs to see or store path strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UriKey(u64);

impl UriKey {
  /// Hash a sequence of path segments (no dots, no slashes; the segments
  /// exactly as they appear in Uri-Path options)
  pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a [u8]>) -> Self {
    let mut h = Blake2Hasher::new();
    segments.into_iter().for_each(|s| s.hash(&mut h));
    UriKey(h.finish())
  }

  /// The key of a request: hash of its Uri-Path options in order
  pub fn of_request(req: &Message) -> Self {
    Self::from_segments(req.opts
                           .get(&known::URI_PATH)
                           .into_iter()
                           .flatten()
                           .map(|v| v.0.as_slice()))
  }

  /// `/.well-known/core`, the discovery path every CoAP server answers on
  pub fn well_known_core() -> Self {
    Self::from_segments([b".well-known" as &[u8], b"core"])
  }
}

/// One thing living at a path
pub trait Resource {
  /// May Observe relationships be established with this resource?
  fn observable(&self) -> bool {
    false
  }

  /// Does this resource implement `method`?
  ///
  /// Saying no here is what turns into a 4.05 on the wire.
  fn handles(&self, method: Code) -> bool;

  /// Run the handler for `method`.
  ///
  /// `reply` arrives pre-built: correct type, the request's id and token,
  /// and the empty code. The handler fills in code, options and payload
  /// as it sees fit; a reply left untouched goes out as a bare
  /// acknowledgement.
  fn handle(&mut self, method: Code, req: Addrd<&Message>, reply: &mut Message);
}

/// Result of one [`Registry::print_link_format`] rendering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSlice {
  /// Length of the whole filtered document, regardless of `buf`
  pub total: usize,
  /// Bytes actually written into the caller's buffer
  pub written: usize,
}

/// The link-format enumerator failed to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFormatError;

/// What the engine consumes from the resource layer.
///
/// The observer methods have empty defaults so registries that don't do
/// Observe don't have to mention it.
pub trait Registry {
  /// Resolve `key` to a resource, if anything lives there
  fn resource(&mut self, key: UriKey) -> Option<&mut dyn Resource>;

  /// Render the link-format discovery document, filtered by the raw
  /// Uri-Query `query` if one was given.
  ///
  /// Writes the document's bytes starting at `offset` into `buf`
  /// (however many fit) and reports the total filtered length; a
  /// zero-capacity `buf` turns this into a pure length probe.
  fn print_link_format(&self,
                       query: Option<&[u8]>,
                       offset: usize,
                       buf: &mut [u8])
                       -> Result<LinkSlice, LinkFormatError>;

  /// `peer` asked to observe the resource at `key` with `token`.
  ///
  /// `false` means the relationship could not be stored and the engine
  /// won't act as though it exists.
  fn add_observer(&mut self,
                  _key: UriKey,
                  _local: SocketAddr,
                  _peer: SocketAddr,
                  _token: Token)
                  -> bool {
    false
  }

  /// `peer` asked to stop observing `key` (or its observation went bad)
  fn delete_observer(&mut self, _key: UriKey, _peer: SocketAddr, _token: Token) {}

  /// Tear down every relationship `peer` established with `token`,
  /// whatever resource it's on. This is RST cleanup.
  fn remove_observers(&mut self, _peer: SocketAddr, _token: Token) {}

  /// An ACK for a notification arrived; the observer is alive
  fn touch_observer(&mut self, _peer: SocketAddr, _token: Token) {}

  /// A confirmable notification was retransmitted to exhaustion;
  /// the observer is probably gone
  fn handle_failed_notify(&mut self, _peer: SocketAddr, _token: Token) {}
}

#[cfg(test)]
mod test {
  use super::*;
  use toad_msg::{Id, OptValue, Type};

  #[test]
  fn request_key_matches_segment_key() {
    let mut req = Message::new(Type::Con,
                               Code::new(0, 1),
                               Id(1),
                               Token(Default::default()));
    req.opts.insert(known::URI_PATH,
                    vec![OptValue(b"sensors".to_vec()), OptValue(b"temp".to_vec())]);

    assert_eq!(UriKey::of_request(&req),
               UriKey::from_segments([b"sensors" as &[u8], b"temp"]));
    assert_ne!(UriKey::of_request(&req),
               UriKey::from_segments([b"temp" as &[u8], b"sensors"]));
  }

  #[test]
  fn pathless_request_hashes_to_the_empty_key() {
    let req = Message::new(Type::Con,
                           Code::new(0, 1),
                           Id(1),
                           Token(Default::default()));
    assert_eq!(UriKey::of_request(&req),
               UriKey::from_segments(::core::iter::empty::<&[u8]>()));
  }
}
