//! `bufo` is the reliable-messaging core of a Rust CoAP stack:
//! it owns everything [RFC7252](https://datatracker.ietf.org/doc/html/rfc7252)
//! says about getting a message to the other side _and knowing it got there_.
//!
//! ## What lives here
//! - **Retransmission**: confirmable messages are tracked in a send queue
//!   and retransmitted with binary exponential backoff until acknowledged,
//!   reset, or given up on.
//! - **Dispatch**: inbound datagrams are parsed, correlated with queued
//!   messages by transaction id, and routed to request/response handling.
//! - **Discovery**: `GET /.well-known/core` is answered from an external
//!   link-format enumerator, with automatic
//!   [Block2](https://datatracker.ietf.org/doc/html/rfc7959) segmentation.
//!
//! ## What doesn't
//! Resource state, observe notification scheduling and deduplication of
//! retried requests belong to the layers above and below; `bufo` talks to
//! them through the [`resource::Registry`] trait and the [`net::Socket`]
//! trait.
//!
//! ## Timing
//! All protocol timing is integer tick arithmetic at
//! [`time::TICKS_PER_SECOND`]; the RFC7252 §4.8 transmission parameters are
//! evaluated in Q.6 fixed point exactly as the RFC's worked examples do.
//! There is no floating point anywhere on the timeout path.

// x-release-please-version
#![doc(html_root_url = "https://docs.rs/bufo/0.1.0")]
// x-release-please-end
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]
// -
// features
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;


pub(crate) mod logging;

/// response & method codes
pub mod code;

/// configuring transmission parameters
pub mod config;

/// low-level coap behavior
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub mod core;

/// `GET /.well-known/core` discovery responses
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub mod discovery;

/// network abstractions
pub mod net;

/// CoAP options: numbers, criticality, value codecs
pub mod option;

/// the send queue driving retransmission
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub mod queue;

/// resources, observers and link-format enumeration
pub mod resource;

/// RFC7252 §4.8 retransmission timing
pub mod retry;

/// transaction ids
pub mod tid;

/// time abstractions
pub mod time;

/// `std`-only bufo stuff
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod std;

/// Helper constants and functions for creating multicast addresses
pub mod multicast {
  use no_std_net::{Ipv4Addr, SocketAddr, SocketAddrV4};

  /// IPv4 "All CoAP devices" multicast address.
  ///
  /// If using multicast to discover devices, it's recommended
  /// that you use this address with a port specific to your application.
  pub const ALL_COAP_DEVICES_IP: Ipv4Addr = Ipv4Addr::new(224, 0, 1, 187);

  /// Create a SocketAddr (IP + port) with the [`ALL_COAP_DEVICES_IP`] address
  pub const fn all_coap_devices(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(ALL_COAP_DEVICES_IP, port))
  }

  /// Is this address one we would have joined as a multicast group?
  pub fn is_multicast(addr: &SocketAddr) -> bool {
    match addr.ip() {
      | no_std_net::IpAddr::V4(ip) => ip.is_multicast(),
      | no_std_net::IpAddr::V6(ip) => ip.is_multicast(),
    }
  }
}
