//! Structural predicates tested against pending messages during receive.
//!
//! A [`Pattern`] is one receive clause: a structural test applied to a
//! whole [`Message`]. Clauses are polymorphic over type checks, exact
//! value equality, tagged-shape checks, and element-wise composition.
//! A successful test produces the captured decomposition that receive
//! binds into a [`Match`].
//!
//! # Capture Rules
//!
//! - [`Pattern::any`] and [`Pattern::value`] act as exact clauses and
//!   capture nothing.
//! - [`Pattern::of`] acts as a placeholder and captures the matched term.
//! - [`Pattern::shape`] captures the payload parts following the tag.
//! - [`Pattern::tuple`] captures the union of its element captures in
//!   part order, recursing into parts that hold a `Vec<Term>`.
//!
//! Value equality is type-strict: a clause built from `"reload"` (a
//! `&str`) will not match a message sent with `String::from("reload")`.
//! Structural recursion stops at `Vec<Term>` parts; any other payload
//! type is matched as one opaque value by type or equality.

use std::any::TypeId;
use std::any::type_name;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Item;
use crate::core::Message;
use crate::core::Term;

// -----------------------------------------------------------------------------
// Type Check
// -----------------------------------------------------------------------------

/// Runtime type test used by placeholder clauses.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TypeCheck {
  id: TypeId,
  name: &'static str,
}

impl TypeCheck {
  /// Creates a type check matching values of type `T`.
  #[inline]
  pub fn of<T>() -> Self
  where
    T: 'static,
  {
    Self {
      id: TypeId::of::<T>(),
      name: type_name::<T>(),
    }
  }

  /// Returns the name of the expected type.
  #[inline]
  pub const fn name(&self) -> &'static str {
    self.name
  }

  /// Returns `true` if the given term contains a value of the expected type.
  #[inline]
  pub fn test(&self, term: &Term) -> bool {
    term.tid() == self.id
  }
}

impl Debug for TypeCheck {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "TypeCheck({})", self.name)
  }
}

// -----------------------------------------------------------------------------
// Pattern
// -----------------------------------------------------------------------------

/// A structural receive clause.
///
/// Patterns are tested against messages in queue order; the earliest
/// pending message satisfying any clause of a receive call is removed
/// and returned. See [`Mailbox::receive`].
///
/// # Examples
///
/// ```
/// use postbox::core::Message;
/// use postbox::core::Pattern;
///
/// let message = Message::tagged("reload", 5_u64);
///
/// // Shape clause: tag + arity, captures the payload.
/// let captures = Pattern::shape("reload", 1).matches(&message).unwrap();
/// assert_eq!(captures[0].downcast_ref::<u64>(), Some(&5));
///
/// // Tuple clause: element-wise placeholders.
/// let clause = Pattern::tuple([Pattern::of::<&str>(), Pattern::of::<u64>()]);
/// assert_eq!(clause.matches(&message).unwrap().len(), 2);
/// ```
///
/// [`Mailbox::receive`]: crate::mailbox::Mailbox::receive
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Pattern {
  /// Matches every message; captures nothing.
  Any,
  /// Matches a plain message whose value is of the expected type.
  Type(TypeCheck),
  /// Matches a plain message structurally equal to the given value.
  Value(Term),
  /// Matches a tagged message with the given tag and payload arity.
  Shape(Term, usize),
  /// Matches a message element-wise against the given sub-clauses.
  Tuple(Vec<Pattern>),
}

impl Pattern {
  /// Creates a catch-all clause.
  #[inline]
  pub fn any() -> Self {
    Self::Any
  }

  /// Creates a placeholder clause matching values of type `T`.
  #[inline]
  pub fn of<T>() -> Self
  where
    T: 'static,
  {
    Self::Type(TypeCheck::of::<T>())
  }

  /// Creates an exact-equality clause.
  #[inline]
  pub fn value<T>(value: T) -> Self
  where
    T: Item,
  {
    Self::Value(Term::new(value))
  }

  /// Creates a tagged-shape clause with the given tag and payload arity.
  #[inline]
  pub fn shape<T>(tag: T, arity: usize) -> Self
  where
    T: Item,
  {
    Self::Shape(Term::new(tag), arity)
  }

  /// Creates an element-wise tuple clause.
  ///
  /// Each sub-clause is applied to one message part. A nested tuple
  /// sub-clause recurses into a part holding a `Vec<Term>`; a
  /// [`Shape`] sub-clause never matches inside a tuple, since shapes
  /// describe whole messages.
  ///
  /// [`Shape`]: Self::Shape
  #[inline]
  pub fn tuple<I>(elems: I) -> Self
  where
    I: IntoIterator<Item = Pattern>,
  {
    Self::Tuple(elems.into_iter().collect())
  }

  /// Tests this clause against a whole message.
  ///
  /// Returns the captured terms on success, [`None`] otherwise.
  pub fn matches(&self, message: &Message) -> Option<Vec<Term>> {
    let mut captures: Vec<Term> = Vec::new();

    if self.match_message(message, &mut captures) {
      Some(captures)
    } else {
      None
    }
  }

  fn match_message(&self, message: &Message, captures: &mut Vec<Term>) -> bool {
    match self {
      Self::Any => true,
      Self::Type(_) | Self::Value(_) => match message.as_value() {
        Some(term) => self.match_term(term, captures),
        None => false,
      },
      Self::Shape(tag, arity) => match message.tag() {
        Some(found) if found == tag && message.arity() == *arity => {
          captures.extend(message.payload().iter().cloned());
          true
        }
        _ => false,
      },
      Self::Tuple(elems) => {
        if elems.len() != message.len() {
          return false;
        }

        let reset: usize = captures.len();

        for (elem, term) in elems.iter().zip(message.parts()) {
          if !elem.match_term(term, captures) {
            captures.truncate(reset);
            return false;
          }
        }

        true
      }
    }
  }

  fn match_term(&self, term: &Term, captures: &mut Vec<Term>) -> bool {
    match self {
      Self::Any => true,
      Self::Type(check) => {
        if check.test(term) {
          captures.push(term.clone());
          true
        } else {
          false
        }
      }
      Self::Value(value) => term == value,
      // Nested tuple clauses recurse into parts holding term vectors.
      Self::Tuple(elems) => match term.downcast_ref::<Vec<Term>>() {
        Some(parts) => {
          if elems.len() != parts.len() {
            return false;
          }

          let reset: usize = captures.len();

          for (elem, part) in elems.iter().zip(parts) {
            if !elem.match_term(part, captures) {
              captures.truncate(reset);
              return false;
            }
          }

          true
        }
        None => false,
      },
      // Shape clauses apply to whole messages, never to one term.
      Self::Shape(..) => false,
    }
  }
}

// -----------------------------------------------------------------------------
// Match
// -----------------------------------------------------------------------------

/// The result of a successful receive.
///
/// Holds the removed message, the index of the clause that matched, and
/// the terms captured by placeholder sub-clauses.
#[derive(Clone, Debug)]
pub struct Match {
  message: Message,
  clause: usize,
  captures: Vec<Term>,
}

impl Match {
  #[inline]
  pub(crate) fn new(message: Message, clause: usize, captures: Vec<Term>) -> Self {
    Self {
      message,
      clause,
      captures,
    }
  }

  /// Returns the matched message.
  #[inline]
  pub fn message(&self) -> &Message {
    &self.message
  }

  /// Consumes the match and returns the message.
  #[inline]
  pub fn into_message(self) -> Message {
    self.message
  }

  /// Returns the index of the clause that matched.
  ///
  /// When several clauses match the same earliest message, the
  /// first-listed clause supplies the decomposition.
  #[inline]
  pub const fn clause(&self) -> usize {
    self.clause
  }

  /// Returns the captured terms in clause order.
  #[inline]
  pub fn captures(&self) -> &[Term] {
    &self.captures
  }

  /// Returns a typed reference to the capture at `index`.
  #[inline]
  pub fn capture_ref<T>(&self, index: usize) -> Option<&T>
  where
    T: 'static,
  {
    self.captures.get(index).and_then(Term::downcast_ref)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Message;
  use crate::core::Pattern;
  use crate::core::Term;
  use crate::core::TypeCheck;

  #[test]
  fn test_any_matches_everything() {
    assert!(Pattern::any().matches(&Message::value(1_u8)).is_some());
    assert!(Pattern::any().matches(&Message::tagged("a", 1_u8)).is_some());
    assert_eq!(Pattern::any().matches(&Message::value(1_u8)).unwrap(), vec![]);
  }

  #[test]
  fn test_type_check() {
    let check: TypeCheck = TypeCheck::of::<String>();

    assert!(check.test(&Term::new(String::from("x"))));
    assert!(!check.test(&Term::new("x")));
  }

  #[test]
  fn test_type_captures_value() {
    let clause: Pattern = Pattern::of::<i32>();
    let captures: Vec<Term> = clause.matches(&Message::value(7_i32)).unwrap();

    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].downcast_ref::<i32>(), Some(&7));
    assert!(clause.matches(&Message::value(7_i64)).is_none());
  }

  #[test]
  fn test_value_is_type_strict() {
    let clause: Pattern = Pattern::value("reload");

    assert!(clause.matches(&Message::value("reload")).is_some());
    assert!(clause.matches(&Message::value(String::from("reload"))).is_none());
    assert!(clause.matches(&Message::value("restart")).is_none());
  }

  #[test]
  fn test_value_ignores_tagged_messages() {
    let clause: Pattern = Pattern::value("reload");

    assert!(clause.matches(&Message::tagged("reload", 1_u8)).is_none());
  }

  #[test]
  fn test_shape_captures_payload() {
    let clause: Pattern = Pattern::shape("sum", 2);
    let parts: Vec<Term> = vec![Term::new("sum"), Term::new(5_i32), Term::new(2_i32)];
    let message: Message = Message::from_parts(parts).unwrap();

    let captures: Vec<Term> = clause.matches(&message).unwrap();

    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0].downcast_ref::<i32>(), Some(&5));
    assert_eq!(captures[1].downcast_ref::<i32>(), Some(&2));

    // Wrong arity or tag never matches.
    assert!(Pattern::shape("sum", 1).matches(&message).is_none());
    assert!(Pattern::shape("mul", 2).matches(&message).is_none());
  }

  #[test]
  fn test_tuple_elementwise() {
    let message: Message = Message::tagged("reload", 5_u64);
    let clause: Pattern = Pattern::tuple([Pattern::of::<&str>(), Pattern::of::<u64>()]);

    let captures: Vec<Term> = clause.matches(&message).unwrap();

    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0].downcast_ref::<&str>(), Some(&"reload"));
    assert_eq!(captures[1].downcast_ref::<u64>(), Some(&5));
  }

  #[test]
  fn test_tuple_mixed_clauses() {
    let message: Message = Message::tagged("reload", 5_u64);
    let clause: Pattern = Pattern::tuple([Pattern::value("reload"), Pattern::any()]);

    assert_eq!(clause.matches(&message).unwrap().len(), 0);

    let clause: Pattern = Pattern::tuple([Pattern::value("restart"), Pattern::any()]);

    assert!(clause.matches(&message).is_none());
  }

  #[test]
  fn test_tuple_arity_mismatch() {
    let clause: Pattern = Pattern::tuple([Pattern::any(), Pattern::any()]);

    assert!(clause.matches(&Message::value(1_u8)).is_none());
  }

  #[test]
  fn test_failed_tuple_leaves_no_captures() {
    let message: Message = Message::tagged("reload", 5_u64);
    let clause: Pattern = Pattern::tuple([Pattern::of::<&str>(), Pattern::of::<i32>()]);

    assert!(clause.matches(&message).is_none());
  }

  #[test]
  fn test_nested_tuple_recurses_into_term_vectors() {
    let values: Vec<Term> = vec![Term::new(2_i32), Term::new(42_i32)];
    let message: Message = Message::tagged("values", values);

    let clause: Pattern = Pattern::tuple([
      Pattern::value("values"),
      Pattern::tuple([Pattern::value(2_i32), Pattern::of::<i32>()]),
    ]);

    let captures: Vec<Term> = clause.matches(&message).unwrap();

    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].downcast_ref::<i32>(), Some(&42));
  }

  #[test]
  fn test_nested_tuple_rejects_mismatches() {
    let values: Vec<Term> = vec![Term::new(2_i32), Term::new(42_i32)];
    let message: Message = Message::tagged("values", values);

    // Wrong inner arity.
    let clause: Pattern = Pattern::tuple([
      Pattern::value("values"),
      Pattern::tuple([Pattern::of::<i32>()]),
    ]);

    assert!(clause.matches(&message).is_none());

    // Inner element fails after an earlier capture; nothing leaks.
    let clause: Pattern = Pattern::tuple([
      Pattern::value("values"),
      Pattern::tuple([Pattern::of::<i32>(), Pattern::value(7_i32)]),
    ]);

    assert!(clause.matches(&message).is_none());

    // A non-vector part is opaque to nested tuples.
    let message: Message = Message::tagged("values", 42_i32);
    let clause: Pattern = Pattern::tuple([
      Pattern::value("values"),
      Pattern::tuple([Pattern::any()]),
    ]);

    assert!(clause.matches(&message).is_none());
  }
}
