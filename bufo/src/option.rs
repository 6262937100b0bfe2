//! Option numbers the engine cares about, the critical-option rules from
//! RFC7252 §5.4.1, and the minimal-length unsigned value encoding options
//! use on the wire (§3.2).

use tinyvec::ArrayVec;
use toad_msg::alloc::Message;
use toad_msg::OptNumber;

macro_rules! opt {
  (rfc7252($section:literal) $name:ident = $num:literal) => {
    #[doc = ::toad_macros::rfc_7252_doc!($section)]
    pub const $name: OptNumber = OptNumber($num);
  };
  (#[doc = $doc:expr] $name:ident = $num:literal) => {
    #[doc = $doc]
    pub const $name: OptNumber = OptNumber($num);
  };
}

/// The option numbers of RFC7252 §5.10 and friends
pub mod known {
  use toad_msg::OptNumber;

  opt!(rfc7252("5.10.8.1") IF_MATCH = 1);
  opt!(rfc7252("5.10.1") URI_HOST = 3);
  opt!(#[doc = concat!(
          ::toad_macros::rfc_7252_doc!("5.10.6"),
          "\n<details><summary>ETag as a Request Option</summary>\n\n",
          ::toad_macros::rfc_7252_doc!("5.10.6.2"),
          "\n</details><details><summary>ETag as a Response Option</summary>\n\n",
          ::toad_macros::rfc_7252_doc!("5.10.6.1"),
          "</details>"
        )]
       ETAG = 4);
  opt!(rfc7252("5.10.8.2") IF_NONE_MATCH = 5);
  opt!(#[doc = "Observe registration / deregistration ([RFC7641](https://datatracker.ietf.org/doc/html/rfc7641))"]
       OBSERVE = 6);
  opt!(#[doc = "See [`URI_HOST`]"] URI_PORT = 7);
  opt!(rfc7252("5.10.7") LOCATION_PATH = 8);
  opt!(#[doc = "See [`URI_HOST`]"] URI_PATH = 11);
  opt!(rfc7252("5.10.3") CONTENT_FORMAT = 12);
  opt!(rfc7252("5.10.5") MAX_AGE = 14);
  opt!(#[doc = "See [`URI_HOST`]"] URI_QUERY = 15);
  opt!(rfc7252("5.10.4") ACCEPT = 17);
  opt!(#[doc = "See [`LOCATION_PATH`]"] LOCATION_QUERY = 20);
  opt!(#[doc = "Block2: response payload segmentation ([RFC7959 §2.2](https://datatracker.ietf.org/doc/html/rfc7959#section-2.2))"]
       BLOCK2 = 23);
  opt!(#[doc = "Block1: request payload segmentation ([RFC7959 §2.2](https://datatracker.ietf.org/doc/html/rfc7959#section-2.2))"]
       BLOCK1 = 27);
  opt!(#[doc = "Size2 ([RFC7959 §4](https://datatracker.ietf.org/doc/html/rfc7959#section-4))"]
       SIZE2 = 28);
  opt!(rfc7252("5.10.2") PROXY_URI = 35);
  opt!(#[doc = "See [`PROXY_URI`]"] PROXY_SCHEME = 39);
  opt!(rfc7252("5.10.9") SIZE1 = 60);
  opt!(#[doc = "No-Response: the client's disinterest in response classes ([RFC7967](https://datatracker.ietf.org/doc/html/rfc7967))"]
       NO_RESPONSE = 258);
}

/// The `application/link-format` Content-Format value
pub const LINK_FORMAT: u16 = 40;

/// Critical options must be understood or the message rejected;
/// elective options may be skipped over. The registry made this cheap to
/// test for: critical numbers are odd.
pub fn is_critical(n: OptNumber) -> bool {
  n.0 & 1 == 1
}

/// Critical options the engine itself knows how to act on (or safely
/// deliver to a handler), before consulting the context's registered
/// extension numbers.
pub fn builtin_critical(n: OptNumber) -> bool {
  matches!(n.0, 1 | 3 | 5 | 7 | 11 | 15 | 17 | 23 | 27 | 35)
}

/// Encode an unsigned option value in the fewest bytes that hold it.
///
/// Zero encodes as the empty string, per §3.2.
pub fn encode_u32(val: u32) -> ArrayVec<[u8; 4]> {
  val.to_be_bytes()
     .into_iter()
     .skip_while(|b| *b == 0)
     .collect()
}

/// Decode a big-endian unsigned option value
pub fn decode_u32(bytes: &[u8]) -> u32 {
  bytes.iter()
       .take(4)
       .fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

/// Borrow the first value of option `n`, if the message carries one
pub fn first_value(msg: &Message, n: OptNumber) -> Option<&[u8]> {
  msg.opts
     .get(&n)
     .and_then(|vs| vs.first())
     .map(|v| v.0.as_slice())
}

/// An RFC7959 block descriptor: which block, how big, and whether more
/// follow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  /// Block number (the `offset()`th byte onward)
  pub num: u32,
  /// More blocks follow this one
  pub more: bool,
  /// Size exponent; blocks hold `2^(szx + 4)` bytes
  pub szx: u8,
}

impl Block {
  /// Read a descriptor out of a Block1/Block2 option value
  pub fn from_value(bytes: &[u8]) -> Block {
    let raw = decode_u32(bytes);
    Block { num: raw >> 4,
            more: raw & 0b1000 != 0,
            szx: (raw & 0b0111) as u8 }
  }

  /// The descriptor's wire form
  pub fn value(&self) -> ArrayVec<[u8; 4]> {
    encode_u32((self.num << 4) | ((self.more as u32) << 3) | self.szx as u32)
  }

  /// Bytes per block
  pub fn size(&self) -> usize {
    1 << (self.szx + 4)
  }

  /// Byte offset where this block starts
  pub fn offset(&self) -> usize {
    (self.num as usize) << (self.szx + 4)
  }
}
