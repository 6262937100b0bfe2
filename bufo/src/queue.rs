//! The send queue holds every confirmable message that has been sent but
//! not yet acknowledged, ordered by retransmission deadline.
//!
//! Deadlines are stored as deltas: each node's `t` is the number of ticks
//! between its predecessor's deadline and its own, and the head's `t` is
//! relative to the queue's `basetime`. The engine only ever touches the
//! head, so "when does the next retransmission fire" is `basetime + head.t`
//! regardless of how many messages are in flight, and sliding the whole
//! queue through time is a single addition.

use no_std_net::SocketAddr;
use std_alloc::collections::VecDeque;
use toad_msg::alloc::Message;
use toad_msg::Token;

use crate::net::Addrd;
use crate::retry::Attempts;
use crate::tid::Tid;
use crate::time::Tick;

/// A confirmable message awaiting acknowledgement
#[derive(Debug, Clone)]
pub struct Sent {
  /// Transaction id ([`Tid::of`] the destination and message id)
  pub tid: Tid,
  /// Ticks between the predecessor's deadline and this node's.
  ///
  /// Maintained by [`SendQueue`]; meaningless outside it.
  pub t: Tick,
  /// The jittered initial timeout this message was first scheduled with;
  /// backoff doubles this, it never changes.
  pub timeout: Tick,
  /// How many retransmissions have already happened
  pub retransmits: Attempts,
  /// The interface the message was sent from
  pub local: SocketAddr,
  /// The message and its destination
  pub msg: Addrd<Message>,
}

impl Sent {
  /// The queued message's token
  pub fn token(&self) -> Token {
    self.msg.data().token
  }
}

/// Ordered collection of [`Sent`] nodes. See the module docs.
#[derive(Debug, Default)]
pub struct SendQueue {
  nodes: VecDeque<Sent>,
  basetime: Tick,
}

impl SendQueue {
  /// An empty queue with basetime zero
  pub fn new() -> Self {
    Default::default()
  }

  /// Are any messages awaiting acknowledgement?
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Number of messages awaiting acknowledgement
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// The tick the head's `t` is relative to
  pub fn basetime(&self) -> Tick {
    self.basetime
  }

  /// Slide the queue's time origin forward to `now`, preserving every
  /// node's absolute deadline.
  ///
  /// Nodes whose deadline `now` has consumed are clamped to a zero delta
  /// and counted; the count is returned so the caller knows how many
  /// [`SendQueue::pop`]s are due. Calling twice with the same `now` is a
  /// no-op the second time.
  pub fn adjust_basetime(&mut self, now: Tick) -> usize {
    if now <= self.basetime {
      return 0;
    }

    let mut delta = now - self.basetime;
    self.basetime = now;

    let mut elapsed = 0;
    for node in self.nodes.iter_mut() {
      if node.t <= delta {
        delta -= node.t;
        node.t = 0;
        elapsed += 1;
      } else {
        node.t -= delta;
        break;
      }
    }

    elapsed
  }

  /// Schedule `node` to fire `delay` ticks after `now`.
  ///
  /// An empty queue re-bases itself to `now` first, so a long idle period
  /// costs nothing.
  pub fn schedule(&mut self, now: Tick, delay: Tick, mut node: Sent) {
    if self.nodes.is_empty() {
      self.basetime = now;
      node.t = delay;
      self.nodes.push_back(node);
      return;
    }

    node.t = now.saturating_sub(self.basetime) + delay;
    self.insert(node);
  }

  /// Insert a node whose `t` is relative to `basetime`, rewriting deltas
  /// on the way in. Ties go after existing nodes.
  fn insert(&mut self, mut node: Sent) {
    let mut ix = 0;
    for existing in self.nodes.iter_mut() {
      if node.t < existing.t {
        existing.t -= node.t;
        break;
      }
      node.t -= existing.t;
      ix += 1;
    }
    self.nodes.insert(ix, node);
  }

  /// The node that fires soonest
  pub fn peek(&self) -> Option<&Sent> {
    self.nodes.front()
  }

  /// Detach the node that fires soonest; its remaining delta folds into
  /// the new head so everyone else's deadline stays put.
  pub fn pop(&mut self) -> Option<Sent> {
    let node = self.nodes.pop_front()?;
    if let Some(head) = self.nodes.front_mut() {
      head.t += node.t;
    }
    Some(node)
  }

  /// Detach the first node matching `tid`, folding its delta into its
  /// successor.
  pub fn remove(&mut self, tid: Tid) -> Option<Sent> {
    let ix = self.nodes.iter().position(|n| n.tid == tid)?;
    let node = self.nodes.remove(ix)?;
    if let Some(successor) = self.nodes.get_mut(ix) {
      successor.t += node.t;
    }
    Some(node)
  }

  /// Drop every queued message addressed to `peer` that carries `token`,
  /// returning how many were dropped.
  ///
  /// This is how a RST (or an arriving response) stops retransmission of
  /// everything related to a request.
  pub fn remove_matching(&mut self, peer: SocketAddr, token: Token) -> usize {
    let mut count = 0;
    while let Some(ix) = self.nodes
                             .iter()
                             .position(|n| {
                               n.msg.addr() == peer && n.token() == token
                             })
    {
      if let Some(node) = self.nodes.remove(ix) {
        if let Some(successor) = self.nodes.get_mut(ix) {
          successor.t += node.t;
        }
        count += 1;
      }
    }
    count
  }

  /// Ticks from `now` until the next node fires (zero when overdue)
  pub fn next_timeout(&self, now: Tick) -> Option<Tick> {
    self.peek()
        .map(|head| (self.basetime + head.t).saturating_sub(now))
  }
}

#[cfg(test)]
mod test {
  use toad_msg::{Code, Id, Token, Type};

  use super::*;
  use crate::test::addr;

  fn node(id: u16, token: &[u8]) -> Sent {
    let msg = Message::new(Type::Con,
                           Code::new(0, 1),
                           Id(id),
                           Token(token.iter().copied().collect()));
    Sent { tid: Tid::of(addr(5683), Id(id)),
           t: 0,
           timeout: 2000,
           retransmits: Attempts(0),
           local: addr(5683),
           msg: Addrd(msg, addr(5683)) }
  }

  fn deltas(q: &SendQueue) -> std_alloc::vec::Vec<Tick> {
    q.nodes.iter().map(|n| n.t).collect()
  }

  #[test]
  fn schedule_orders_by_deadline_and_stores_deltas() {
    let mut q = SendQueue::new();
    q.schedule(0, 500, node(1, b"a"));
    q.schedule(0, 250, node(2, b"b"));
    q.schedule(0, 750, node(3, b"c"));

    assert_eq!(deltas(&q), vec![250, 250, 250]);
    assert_eq!(q.next_timeout(0), Some(250));
    assert_eq!(q.pop().unwrap().tid, Tid::of(addr(5683), Id(2)));
    assert_eq!(q.pop().unwrap().tid, Tid::of(addr(5683), Id(1)));
    assert_eq!(q.pop().unwrap().tid, Tid::of(addr(5683), Id(3)));
  }

  #[test]
  fn schedule_on_nonempty_queue_is_relative_to_basetime() {
    let mut q = SendQueue::new();
    q.schedule(100, 500, node(1, b"a")); // due at 600, basetime 100
    q.schedule(200, 100, node(2, b"b")); // due at 300

    assert_eq!(q.basetime(), 100);
    assert_eq!(deltas(&q), vec![200, 300]);
    assert_eq!(q.next_timeout(200), Some(100));
  }

  #[test]
  fn pop_folds_remaining_delta_into_new_head() {
    let mut q = SendQueue::new();
    q.schedule(0, 250, node(1, b"a"));
    q.schedule(0, 500, node(2, b"b"));

    let popped = q.pop().unwrap();
    assert_eq!(popped.t, 250);
    // head now carries the full 500 relative to basetime
    assert_eq!(deltas(&q), vec![500]);
  }

  #[test]
  fn adjust_basetime_counts_and_clamps_elapsed_nodes() {
    let mut q = SendQueue::new();
    q.schedule(0, 250, node(1, b"a"));
    q.schedule(0, 500, node(2, b"b"));
    q.schedule(0, 1000, node(3, b"c"));

    assert_eq!(q.adjust_basetime(600), 2);
    assert_eq!(q.basetime(), 600);
    // survivor still fires at the absolute tick 1000
    assert_eq!(deltas(&q), vec![0, 0, 400]);
    assert_eq!(q.next_timeout(600), Some(0));

    // idempotent
    assert_eq!(q.adjust_basetime(600), 0);
    assert_eq!(deltas(&q), vec![0, 0, 400]);
  }

  #[test]
  fn remove_rebases_successor() {
    let mut q = SendQueue::new();
    q.schedule(0, 250, node(1, b"a"));
    q.schedule(0, 500, node(2, b"b"));
    q.schedule(0, 750, node(3, b"c"));

    let removed = q.remove(Tid::of(addr(5683), Id(2))).unwrap();
    assert_eq!(removed.msg.data().id, Id(2));
    // node 3's absolute deadline (750) survives node 2's removal
    assert_eq!(deltas(&q), vec![250, 500]);

    assert!(q.remove(Tid::of(addr(5683), Id(2))).is_none());
  }

  #[test]
  fn remove_matching_drops_all_for_peer_and_token() {
    let mut q = SendQueue::new();
    q.schedule(0, 250, node(1, b"tok"));
    q.schedule(0, 500, node(2, b"other"));
    q.schedule(0, 750, node(3, b"tok"));

    let dropped = q.remove_matching(addr(5683), Token(b"tok".iter().copied().collect()));
    assert_eq!(dropped, 2);
    assert_eq!(q.len(), 1);
    assert_eq!(q.peek().unwrap().msg.data().id, Id(2));
    assert_eq!(deltas(&q), vec![500]);
  }
}
