use ::core::hash::{Hash, Hasher};

use no_std_net::SocketAddr;
use toad_hash::Blake2Hasher;
use toad_msg::Id;

/// Correlates inbound ACKs and RSTs with queued confirmable messages.
///
/// RFC7252 matches an ACK to the CON it acknowledges by message id and
/// source; a `Tid` is a hash of both so the send queue can be searched
/// (and deleted from) with a single comparison per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tid(u64);

impl Tid {
  /// The transaction id of a message with id `id` exchanged with `peer`.
  ///
  /// Outbound messages hash their destination; inbound ACKs/RSTs hash
  /// their source. The two meet in the middle.
  pub fn of(peer: SocketAddr, id: Id) -> Self {
    let mut h = Blake2Hasher::new();
    peer.port().hash(&mut h);
    match peer.ip() {
      | no_std_net::IpAddr::V4(ip) => ip.octets().hash(&mut h),
      | no_std_net::IpAddr::V6(ip) => ip.octets().hash(&mut h),
    }
    id.0.hash(&mut h);
    Tid(h.finish())
  }
}
