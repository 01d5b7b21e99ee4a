//! Immutable tagged message values stored in a mailbox.

use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Item;
use crate::core::Term;

// -----------------------------------------------------------------------------
// Message
// -----------------------------------------------------------------------------

/// An immutable message: a non-empty tuple of [`Term`]s.
///
/// A message with a single part is a plain value. A message with two or
/// more parts is a tagged tuple: the first part is the tag, the rest is
/// the payload. Ownership transfers to the mailbox on send and to the
/// receiver on a successful match; messages are never mutated in place.
///
/// # Examples
///
/// ```
/// use postbox::core::Message;
///
/// let plain = Message::value(42_i32);
/// assert_eq!(plain.tag(), None);
///
/// let tagged = Message::tagged("reload", 5_u64);
/// assert!(tagged.tag().is_some());
/// assert_eq!(tagged.arity(), 1);
/// ```
#[derive(Clone, PartialEq)]
#[repr(transparent)]
pub struct Message {
  parts: Vec<Term>,
}

impl Message {
  /// Creates a plain single-part message.
  #[inline]
  pub fn value<T>(value: T) -> Self
  where
    T: Item,
  {
    Self {
      parts: vec![Term::new(value)],
    }
  }

  /// Creates a tagged two-part message.
  #[inline]
  pub fn tagged<T, U>(tag: T, payload: U) -> Self
  where
    T: Item,
    U: Item,
  {
    Self {
      parts: vec![Term::new(tag), Term::new(payload)],
    }
  }

  /// Creates a message from pre-built parts.
  ///
  /// Returns [`None`] if `parts` is empty; a message always carries at
  /// least one term.
  #[inline]
  pub fn from_parts(parts: Vec<Term>) -> Option<Self> {
    if parts.is_empty() {
      None
    } else {
      Some(Self { parts })
    }
  }

  /// Returns the number of parts in the message.
  #[inline]
  pub fn len(&self) -> usize {
    self.parts.len()
  }

  /// Returns all parts of the message in order.
  #[inline]
  pub fn parts(&self) -> &[Term] {
    &self.parts
  }

  /// Converts the message into its parts.
  #[inline]
  pub fn into_parts(self) -> Vec<Term> {
    self.parts
  }

  /// Returns the single part of a plain message.
  ///
  /// Returns [`None`] for tagged messages.
  #[inline]
  pub fn as_value(&self) -> Option<&Term> {
    if self.parts.len() == 1 {
      self.parts.first()
    } else {
      None
    }
  }

  /// Returns the tag of a tagged message.
  ///
  /// Returns [`None`] for plain single-part messages.
  #[inline]
  pub fn tag(&self) -> Option<&Term> {
    if self.parts.len() >= 2 {
      self.parts.first()
    } else {
      None
    }
  }

  /// Returns the payload parts following the tag.
  ///
  /// Returns an empty slice for plain single-part messages.
  #[inline]
  pub fn payload(&self) -> &[Term] {
    if self.parts.len() >= 2 {
      &self.parts[1..]
    } else {
      &[]
    }
  }

  /// Returns the payload arity of a tagged message, or zero.
  #[inline]
  pub fn arity(&self) -> usize {
    self.payload().len()
  }
}

impl Debug for Message {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("Message")?;
    f.debug_list().entries(self.parts.iter()).finish()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Message;
  use crate::core::Term;

  #[test]
  fn test_plain_value() {
    let message: Message = Message::value(5_i32);

    assert_eq!(message.len(), 1);
    assert_eq!(message.tag(), None);
    assert_eq!(message.arity(), 0);
    assert_eq!(message.as_value(), Some(&Term::new(5_i32)));
  }

  #[test]
  fn test_tagged() {
    let message: Message = Message::tagged("sum", (5_i32, 2_i32));

    assert_eq!(message.len(), 2);
    assert_eq!(message.tag(), Some(&Term::new("sum")));
    assert_eq!(message.arity(), 1);
    assert_eq!(message.as_value(), None);
    assert_eq!(message.payload(), &[Term::new((5_i32, 2_i32))]);
  }

  #[test]
  fn test_from_parts() {
    assert!(Message::from_parts(Vec::new()).is_none());

    let parts: Vec<Term> = vec![Term::new("a"), Term::new(1_u8), Term::new(2_u8)];
    let message: Message = Message::from_parts(parts).unwrap();

    assert_eq!(message.len(), 3);
    assert_eq!(message.arity(), 2);
  }
}
