//! `GET /.well-known/core` (RFC7252 §7.2).
//!
//! The link-format document itself belongs to the resource layer; this
//! module turns one [`Registry::print_link_format`] enumerator into a
//! complete response, introducing
//! [Block2](https://datatracker.ietf.org/doc/html/rfc7959) segmentation
//! whenever the document outgrows the PDU.

use std_alloc::vec;
use toad_msg::alloc::Message;
use toad_msg::{Code, Payload, Type};

use crate::config::Config;
use crate::net::Addrd;
use crate::option::{self, known, Block};
use crate::resource::Registry;

// worst-case wire cost of the Block2 option (1 header + 3 value bytes)
// and of the payload marker
const BLOCK2_COST: usize = 4;
const MARKER_COST: usize = 1;

/// Build the response to a discovery GET.
///
/// The reply mirrors the request's confirmability (`Con` → `Ack`,
/// `Non` → `Non`) and reuses its id and token. Failures never escape:
/// anything going wrong mid-build rewinds to a bare 5.03 carrying only
/// the token.
pub fn well_known_response<R: Registry>(cfg: &Config,
                                        reg: &R,
                                        req: Addrd<&Message>)
                                        -> Message {
  let ty = match req.data().ty {
    | Type::Con => Type::Ack,
    | _ => Type::Non,
  };
  let bare =
    |code: Code| Message::new(ty, code, req.data().id, req.data().token);

  let query = option::first_value(req.data(), known::URI_QUERY);

  // length probe: zero-capacity render learns the filtered total
  let total = match reg.print_link_format(query, 0, &mut []) {
    | Err(_) => {
      log::error!(target: "bufo", "link-format enumerator failed");
      return bare(crate::code::SERVICE_UNAVAILABLE);
    },
    | Ok(slice) if slice.total == 0 => return bare(crate::code::BAD_REQUEST),
    | Ok(slice) => slice.total,
  };

  let requested = option::first_value(req.data(), known::BLOCK2).map(Block::from_value);

  let mut block = match requested {
    | Some(b) if b.szx == 7 => return bare(crate::code::BAD_REQUEST),
    | Some(b) if b.szx > cfg.max_block_szx => {
      // clamp the block size down, keeping the byte offset the peer
      // asked for
      let offset = b.offset();
      let szx = cfg.max_block_szx;
      Block { num: (offset >> (szx + 4)) as u32,
              more: false,
              szx }
    },
    | Some(b) => Block { more: false, ..b },
    | None => Block { num: 0,
                      more: false,
                      szx: cfg.max_block_szx },
  };

  let mut used = 4 + req.data().token.0.len();
  if cfg.max_pdu_size <= used + 3 {
    // not even room for one option
    return bare(crate::code::SERVICE_UNAVAILABLE);
  }
  used += 2; // Content-Format 40

  let need_block = requested.is_some() || used + MARKER_COST + total > cfg.max_pdu_size;

  let (offset, len) = match need_block {
    | false => (0, total),
    | true => {
      while used + BLOCK2_COST + MARKER_COST + block.size() > cfg.max_pdu_size {
        if block.szx == 0 {
          return bare(crate::code::SERVICE_UNAVAILABLE);
        }
        block.szx -= 1;
        block.num <<= 1;
      }

      let offset = block.offset();
      if offset >= total {
        return bare(crate::code::SERVICE_UNAVAILABLE);
      }

      block.more = offset + block.size() < total;
      (offset, block.size().min(total - offset))
    },
  };

  let mut buf = vec![0u8; len];
  let written = match reg.print_link_format(query, offset, &mut buf) {
    | Err(_) => return bare(crate::code::SERVICE_UNAVAILABLE),
    | Ok(slice) => slice.written,
  };
  buf.truncate(written);

  let mut reply = bare(crate::code::CONTENT);
  reply.opts.insert(known::CONTENT_FORMAT,
                    vec![toad_msg::OptValue(vec![option::LINK_FORMAT as u8])]);
  if need_block {
    reply.opts.insert(known::BLOCK2,
                      vec![toad_msg::OptValue(block.value().to_vec())]);
  }
  reply.payload = Payload(buf);
  reply
}

#[cfg(test)]
mod test {
  use toad_msg::{Id, Token};

  use super::*;
  use crate::test::{msg, peer, TestRegistry};

  fn get_wkc(ty: Type, id: u16, token: &[u8]) -> Message {
    let mut req = msg(ty, crate::code::GET, id, token);
    req.opts.insert(known::URI_PATH,
                    vec![toad_msg::OptValue(b".well-known".to_vec()),
                         toad_msg::OptValue(b"core".to_vec())]);
    req
  }

  fn doc(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
  }

  fn parse_block2(reply: &Message) -> Block {
    Block::from_value(option::first_value(reply, known::BLOCK2).unwrap())
  }

  #[test]
  fn small_document_fits_in_one_reply() {
    let mut reg = TestRegistry::new();
    reg.link_doc = b"</sensors/temp>;rt=\"temperature\"".to_vec();

    let req = get_wkc(Type::Con, 1, b"t");
    let reply = well_known_response(&Config::default(), &reg, Addrd(&req, peer(2, 1111)));

    assert_eq!(reply.ty, Type::Ack);
    assert_eq!(reply.id, Id(1));
    assert_eq!(reply.code, crate::code::CONTENT);
    assert_eq!(option::first_value(&reply, known::CONTENT_FORMAT),
               Some(&[40u8] as &[u8]));
    assert_eq!(option::first_value(&reply, known::BLOCK2), None);
    assert_eq!(reply.payload.0, reg.link_doc);
  }

  #[test]
  fn non_request_gets_non_reply_with_the_same_id() {
    let mut reg = TestRegistry::new();
    reg.link_doc = b"</a>".to_vec();

    let req = get_wkc(Type::Non, 77, b"t");
    let reply = well_known_response(&Config::default(), &reg, Addrd(&req, peer(2, 1111)));

    assert_eq!(reply.ty, Type::Non);
    assert_eq!(reply.id, Id(77));
  }

  #[test]
  fn oversized_document_is_segmented_and_reassembles() {
    let mut reg = TestRegistry::new();
    reg.link_doc = doc(1200);

    let cfg = Config { max_pdu_size: 1024,
                       ..Default::default() };

    // the 1024-byte block does not fit a 1024-byte PDU; 512 does
    let req = get_wkc(Type::Con, 1, b"t");
    let reply = well_known_response(&cfg, &reg, Addrd(&req, peer(2, 1111)));
    let block = parse_block2(&reply);
    assert_eq!((block.num, block.szx, block.more), (0, 5, true));
    assert_eq!(reply.payload.0.len(), 512);

    let mut reassembled = reply.payload.0.clone();

    for num in 1.. {
      let mut req = get_wkc(Type::Con, 1 + num as u16, b"t");
      req.opts.insert(known::BLOCK2,
                      vec![toad_msg::OptValue(Block { num,
                                                      more: false,
                                                      szx: 5 }.value()
                                                              .to_vec())]);
      let reply = well_known_response(&cfg, &reg, Addrd(&req, peer(2, 1111)));
      assert_eq!(reply.code, crate::code::CONTENT);
      reassembled.extend_from_slice(&reply.payload.0);
      if !parse_block2(&reply).more {
        break;
      }
    }

    assert_eq!(reassembled, reg.link_doc);
  }

  #[test]
  fn empty_document_is_a_bad_request() {
    let reg = TestRegistry::new();
    let req = get_wkc(Type::Con, 1, b"t");
    let reply = well_known_response(&Config::default(), &reg, Addrd(&req, peer(2, 1111)));
    assert_eq!(reply.code, crate::code::BAD_REQUEST);
    assert!(reply.payload.0.is_empty());
  }

  #[test]
  fn reserved_szx_is_a_bad_request() {
    let mut reg = TestRegistry::new();
    reg.link_doc = doc(100);

    let mut req = get_wkc(Type::Con, 1, b"t");
    req.opts.insert(known::BLOCK2,
                    vec![toad_msg::OptValue(vec![0x07])]);
    let reply = well_known_response(&Config::default(), &reg, Addrd(&req, peer(2, 1111)));
    assert_eq!(reply.code, crate::code::BAD_REQUEST);
  }

  #[test]
  fn requested_szx_above_the_maximum_is_clamped_offset_preserving() {
    let mut reg = TestRegistry::new();
    reg.link_doc = doc(2000);

    let cfg = Config { max_block_szx: 4,
                       ..Default::default() };

    // num 1 at szx 6 = offset 1024; at szx 4 that's num 4
    let mut req = get_wkc(Type::Con, 1, b"t");
    req.opts.insert(known::BLOCK2,
                    vec![toad_msg::OptValue(Block { num: 1,
                                                    more: false,
                                                    szx: 6 }.value()
                                                            .to_vec())]);
    let reply = well_known_response(&cfg, &reg, Addrd(&req, peer(2, 1111)));
    let block = parse_block2(&reply);
    assert_eq!((block.num, block.szx), (4, 4));
    assert_eq!(reply.payload.0, reg.link_doc[1024..1024 + 256].to_vec());
  }

  #[test]
  fn offset_past_the_document_is_service_unavailable() {
    let mut reg = TestRegistry::new();
    reg.link_doc = doc(100);

    let mut req = get_wkc(Type::Con, 1, b"t");
    req.opts.insert(known::BLOCK2,
                    vec![toad_msg::OptValue(Block { num: 50,
                                                    more: false,
                                                    szx: 6 }.value()
                                                            .to_vec())]);
    let reply = well_known_response(&Config::default(), &reg, Addrd(&req, peer(2, 1111)));
    assert_eq!(reply.code, crate::code::SERVICE_UNAVAILABLE);
  }

  #[test]
  fn enumerator_failure_rewinds_to_a_bare_5_03() {
    let mut reg = TestRegistry::new();
    reg.link_err = true;

    let req = get_wkc(Type::Con, 9, b"tok");
    let reply = well_known_response(&Config::default(), &reg, Addrd(&req, peer(2, 1111)));

    assert_eq!(reply.code, crate::code::SERVICE_UNAVAILABLE);
    assert_eq!(reply.token, Token(b"tok".iter().copied().collect()));
    assert!(reply.opts.is_empty());
    assert!(reply.payload.0.is_empty());
  }

  #[test]
  fn query_filter_reaches_the_enumerator() {
    let mut reg = TestRegistry::new();
    reg.link_doc = b"</a>;rt=\"x\"".to_vec();

    let mut req = get_wkc(Type::Con, 1, b"t");
    req.opts.insert(known::URI_QUERY,
                    vec![toad_msg::OptValue(b"rt=x".to_vec())]);
    well_known_response(&Config::default(), &reg, Addrd(&req, peer(2, 1111)));

    assert_eq!(reg.queries.lock().unwrap().first().unwrap(),
               &Some(b"rt=x".to_vec()));
  }
}
