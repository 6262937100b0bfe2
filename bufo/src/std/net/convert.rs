//! [`no_std_net`] and [`std::net`] describe the same wire-level
//! addresses with identical but distinct types; these shims copy
//! between them field by field.

use ::std::io;

pub(crate) fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

pub(crate) fn ip_to_std(ip: no_std_net::IpAddr) -> ::std::net::IpAddr {
  match ip {
    | no_std_net::IpAddr::V4(v4) => ::std::net::IpAddr::V4(v4.octets().into()),
    | no_std_net::IpAddr::V6(v6) => ::std::net::IpAddr::V6(v6.octets().into()),
  }
}

pub(crate) fn to_std(addr: no_std_net::SocketAddr) -> ::std::net::SocketAddr {
  ::std::net::SocketAddr::new(ip_to_std(addr.ip()), addr.port())
}

pub(crate) fn to_no_std(addr: ::std::net::SocketAddr) -> no_std_net::SocketAddr {
  match addr {
    | ::std::net::SocketAddr::V4(v4) => {
      let [a, b, c, d] = v4.ip().octets();
      no_std_net::SocketAddr::V4(no_std_net::SocketAddrV4::new(no_std_net::Ipv4Addr::new(a, b, c, d),
                                                               v4.port()))
    },
    | ::std::net::SocketAddr::V6(v6) => {
      let [a, b, c, d, e, f, g, h] = v6.ip().segments();
      no_std_net::SocketAddr::V6(no_std_net::SocketAddrV6::new(no_std_net::Ipv6Addr::new(a, b, c, d,
                                                                                         e, f, g, h),
                                                               v6.port(),
                                                               v6.flowinfo(),
                                                               v6.scope_id()))
    },
  }
}
