use toad_msg::to_bytes::MessageToBytesError;

/// An error encounterable from within [`Context`](crate::core::Context)
///
/// Malformed inbound datagrams are not errors; they are logged and
/// dropped, per RFC7252 §4.2.
#[derive(Debug)]
pub enum Error<SockError> {
  /// Some socket operation failed
  Sock(SockError),
  /// Serializing a message to bytes failed
  ToBytes(MessageToBytesError),
  /// The clock failed to provide timing.
  ///
  /// See [`embedded_time::clock::Error`]
  Clock,
}
