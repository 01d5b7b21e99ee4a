//! Error types returned from mailbox and timer operations.
//!
//! All errors here are recoverable and surfaced synchronously to the
//! caller of the failing operation. Nothing in this crate panics on a
//! library path; a crashed task cannot corrupt another mailbox.

use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Message;

// -----------------------------------------------------------------------------
// Send Error
// -----------------------------------------------------------------------------

/// Error returned by [`Mailbox::send`].
///
/// The undelivered message is carried back to the sender in both
/// variants and can be recovered with [`into_message()`].
///
/// [`Mailbox::send`]: crate::mailbox::Mailbox::send
/// [`into_message()`]: Self::into_message
#[derive(Debug)]
#[non_exhaustive]
pub enum SendError {
  /// The mailbox has been closed.
  Closed(Message),
  /// The mailbox is bounded and at capacity.
  Full(Message),
}

impl SendError {
  /// Consumes the error and returns the undelivered message.
  #[inline]
  pub fn into_message(self) -> Message {
    match self {
      Self::Closed(message) => message,
      Self::Full(message) => message,
    }
  }
}

impl Display for SendError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Closed(_) => f.write_str("sending on a closed mailbox"),
      Self::Full(_) => f.write_str("sending on a full mailbox"),
    }
  }
}

impl Error for SendError {}

// -----------------------------------------------------------------------------
// Receive Error
// -----------------------------------------------------------------------------

/// Error returned by blocking receive operations.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReceiveError {
  /// The receive deadline expired before any clause matched.
  TimedOut,
  /// The suspended waiter was cancelled externally.
  Cancelled,
  /// The mailbox was closed and no pending message matched.
  Closed,
}

impl Display for ReceiveError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::TimedOut => f.write_str("receive timed out"),
      Self::Cancelled => f.write_str("receive cancelled"),
      Self::Closed => f.write_str("receiving on a closed mailbox"),
    }
  }
}

impl Error for ReceiveError {}

// -----------------------------------------------------------------------------
// Timer Error
// -----------------------------------------------------------------------------

/// Error returned by [`TimerHandle`] operations.
///
/// Calling [`reset()`] or [`cancel()`] on a timer that already reached
/// a terminal state is a caller programming error and is surfaced as a
/// hard error rather than silently ignored.
///
/// [`TimerHandle`]: crate::timer::TimerHandle
/// [`reset()`]: crate::timer::TimerHandle::reset
/// [`cancel()`]: crate::timer::TimerHandle::cancel
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimerError {
  /// The timer already fired and delivered its message.
  AlreadyFired,
  /// The timer was already cancelled.
  AlreadyCancelled,
  /// The owning timer wheel has been shut down.
  WheelClosed,
}

impl Display for TimerError {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::AlreadyFired => f.write_str("timer already fired"),
      Self::AlreadyCancelled => f.write_str("timer already cancelled"),
      Self::WheelClosed => f.write_str("timer wheel has been shut down"),
    }
  }
}

impl Error for TimerError {}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Message;
  use crate::error::ReceiveError;
  use crate::error::SendError;
  use crate::error::TimerError;

  #[test]
  fn test_send_error_into_message() {
    let error: SendError = SendError::Closed(Message::value(42_i32));
    let inner: Message = error.into_message();

    assert_eq!(inner.parts().len(), 1);
    assert_eq!(inner.parts()[0].downcast_ref::<i32>(), Some(&42));
  }

  #[test]
  fn test_display() {
    assert_eq!(
      format!("{}", SendError::Closed(Message::value(0_u8))),
      "sending on a closed mailbox",
    );
    assert_eq!(format!("{}", ReceiveError::TimedOut), "receive timed out");
    assert_eq!(format!("{}", TimerError::AlreadyFired), "timer already fired");
  }
}
