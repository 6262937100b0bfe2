//! A minimal CoAP server: one resource at `/hello`, discoverable via
//! `GET /.well-known/core`.
//!
//! Try it with any CoAP client, e.g.:
//! ```sh
//! coap-client -m get coap://localhost/hello
//! coap-client -m get coap://localhost/.well-known/core
//! ```

use std::net::UdpSocket;
use std::time::Duration;

use bufo::config::Config;
use bufo::core::Context;
use bufo::net::{Addrd, Socket};
use bufo::resource::{LinkFormatError, LinkSlice, Registry, Resource, UriKey};
use toad_msg::alloc::Message;
use toad_msg::{Code, Payload};

const LINK_DOC: &[u8] = b"</hello>;ct=0";

struct Hello;

impl Resource for Hello {
  fn handles(&self, method: Code) -> bool {
    method == bufo::code::GET
  }

  fn handle(&mut self, _: Code, req: Addrd<&Message>, reply: &mut Message) {
    log::info!("saying hello to {}", req.addr());
    reply.code = bufo::code::CONTENT;
    reply.payload = Payload(b"hi there!".to_vec());
  }
}

struct Resources {
  hello_key: UriKey,
  hello: Hello,
}

impl Registry for Resources {
  fn resource(&mut self, key: UriKey) -> Option<&mut dyn Resource> {
    match key == self.hello_key {
      | true => Some(&mut self.hello),
      | false => None,
    }
  }

  fn print_link_format(&self,
                       _query: Option<&[u8]>,
                       offset: usize,
                       buf: &mut [u8])
                       -> Result<LinkSlice, LinkFormatError> {
    let tail = LINK_DOC.get(offset..).unwrap_or(&[]);
    let written = tail.len().min(buf.len());
    buf[..written].copy_from_slice(&tail[..written]);
    Ok(LinkSlice { total: LINK_DOC.len(),
                   written })
  }
}

fn main() {
  simple_logger::init_with_level(log::Level::Debug).unwrap();

  let bind = no_std_net::SocketAddr::V4(no_std_net::SocketAddrV4::new(
    no_std_net::Ipv4Addr::new(0, 0, 0, 0), 5683));
  let sock = <UdpSocket as Socket>::bind(bind).unwrap();

  let mut ctx = Context::new(Config::default(), sock, bufo::std::Clock::new()).unwrap();
  let mut reg = Resources { hello_key: UriKey::from_segments([b"hello" as &[u8]]),
                            hello: Hello };

  log::info!("listening on {}", ctx.local_addr());

  loop {
    ctx.poll(&mut reg).unwrap();

    let now = ctx.try_now().unwrap();
    let sleep = ctx.next_timeout(now).unwrap_or(50).min(50);
    std::thread::sleep(Duration::from_millis(sleep));
  }
}
