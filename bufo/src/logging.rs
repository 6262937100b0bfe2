use ::core::fmt::{self, Write};

use tinyvec::ArrayVec;
use toad_msg::alloc::Message;

/// A fixed-capacity one-line description of a message; overflow is
/// silently truncated rather than allocated for.
pub(crate) struct Summary(ArrayVec<[u8; 64]>);

impl Summary {
  pub(crate) fn as_str(&self) -> &str {
    ::core::str::from_utf8(self.0.as_slice()).unwrap_or("")
  }
}

impl fmt::Display for Summary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Write for Summary {
  fn write_str(&mut self, s: &str) -> fmt::Result {
    s.bytes().for_each(|b| {
               if self.0.len() < self.0.capacity() {
                 self.0.push(b);
               }
             });
    Ok(())
  }
}

pub(crate) fn msg_summary(msg: &Message) -> Summary {
  let mut buf = Summary(Default::default());
  write!(buf,
         "{:?}: {:?} {}.{:02} with {} byte payload",
         msg.code.kind(),
         msg.ty,
         msg.code.class,
         msg.code.detail,
         msg.payload.0.len()).ok();
  buf
}

#[cfg(test)]
mod test {
  use toad_msg::{Code, Id, Token, Type};

  use super::*;

  #[test]
  fn summary_is_terse_and_never_panics_on_overflow() {
    let mut msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token(Default::default()));
    msg.payload.0 = ::std_alloc::vec![0u8; 1024];

    let s = msg_summary(&msg);
    assert!(s.as_str().contains("Con"));
    assert!(s.as_str().len() <= 64);
  }
}
