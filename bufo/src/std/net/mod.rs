use ::std::io;
use ::std::net::UdpSocket;

use crate::net::{Addrd, Socket};

mod convert;

impl Socket for UdpSocket {
  type Error = io::Error;

  fn local_addr(&self) -> no_std_net::SocketAddr {
    // a bound socket always has a local address
    convert::to_no_std(UdpSocket::local_addr(self).unwrap())
  }

  fn bind_raw<A: no_std_net::ToSocketAddrs>(addr: A) -> Result<Self, Self::Error> {
    let addrs = addr.to_socket_addrs()
                    .unwrap()
                    .map(convert::to_std)
                    .collect::<Vec<_>>();

    UdpSocket::bind(addrs.as_slice()).map(|sock| {
                                       sock.set_nonblocking(true).unwrap();
                                       sock
                                     })
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.set_nonblocking(true)
        .and_then(|_| self.send_to(msg.data(), convert::to_std(msg.addr())))
        .map(|_| ())
        .map_err(convert::io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.set_nonblocking(true).map_err(convert::io_to_nb)?;
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, convert::to_no_std(addr)))
        .map_err(convert::io_to_nb)
  }

  fn peek(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.peek_from(buffer)
        .map(|(n, addr)| Addrd(n, convert::to_no_std(addr)))
        .map_err(convert::io_to_nb)
  }

  fn join_multicast(&self, addr: no_std_net::IpAddr) -> Result<(), Self::Error> {
    match convert::ip_to_std(addr) {
      | ::std::net::IpAddr::V4(v4) => {
        self.join_multicast_v4(&v4, &::std::net::Ipv4Addr::UNSPECIFIED)
      },
      | ::std::net::IpAddr::V6(v6) => self.join_multicast_v6(&v6, 0),
    }
  }
}
