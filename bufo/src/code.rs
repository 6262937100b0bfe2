//! The subset of message codes the engine itself makes decisions with.
//!
//! Requests and responses the engine merely forwards keep whatever code
//! they came with; these constants are the ones dispatch and the error
//! paths construct or compare against.

pub use toad_msg::Code;

macro_rules! code {
  (rfc7252($section:literal) $name:ident = $c:literal*$d:literal) => {
    #[doc = ::toad_macros::rfc_7252_doc!($section)]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
  (#[doc = $doc:expr] $name:ident = $c:literal*$d:literal) => {
    #[doc = $doc]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
}

// methods
code!(rfc7252("5.8.1") GET    = 0*01);
code!(rfc7252("5.8.2") POST   = 0*02);
code!(rfc7252("5.8.3") PUT    = 0*03);
code!(rfc7252("5.8.4") DELETE = 0*04);

// 2.xx
code!(rfc7252("5.9.1.5") CONTENT = 2*05);

// 4.xx
code!(rfc7252("5.9.2.1") BAD_REQUEST        = 4*00);
code!(rfc7252("5.9.2.3") BAD_OPTION         = 4*02);
code!(rfc7252("5.9.2.5") NOT_FOUND          = 4*04);
code!(rfc7252("5.9.2.6") METHOD_NOT_ALLOWED = 4*05);

// 5.xx
code!(rfc7252("5.9.3.4") SERVICE_UNAVAILABLE = 5*03);

/// The all-zero code carried by empty messages (ACKs, RSTs, pings)
pub const EMPTY: Code = Code::new(0, 0);
