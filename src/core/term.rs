//! Type-erased runtime value container used for message payloads.
//!
//! This module provides [`Term`], a dynamically typed value container
//! that can safely traverse task boundaries. Terms support cloning,
//! debugging, structural equality, and type-safe downcasting.
//!
//! # Type Safety
//!
//! [`Term`] uses Rust's [`Any`] trait for runtime type checking. Values
//! can be safely extracted using [`downcast_ref()`] and [`downcast_mut()`],
//! which return [`None`] if the type doesn't match.
//!
//! # Examples
//!
//! ```
//! use postbox::core::Term;
//!
//! // Create terms from various types
//! let num = Term::new(42_i32);
//! let text = Term::new(String::from("hello"));
//!
//! // Type-safe downcasting
//! assert_eq!(num.downcast_ref::<i32>(), Some(&42));
//! assert_eq!(num.downcast_ref::<String>(), None);
//!
//! // Structural equality requires identical types
//! assert_eq!(num, Term::new(42_i32));
//! assert_ne!(num, Term::new(42_i64));
//! ```
//!
//! [`downcast_ref()`]: Term::downcast_ref
//! [`downcast_mut()`]: Term::downcast_mut

use dyn_clone::clone_box;
use std::any::TypeId;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Item;

/// Dynamically typed value that can be sent between tasks.
///
/// [`Term`] wraps a boxed [`Item`] and provides type-safe downcasting
/// APIs for inspecting or extracting the contained value. All values
/// stored in a [`Term`] must implement [`Send`], [`Sync`], [`Debug`],
/// [`Clone`], and [`PartialEq`].
///
/// # Cloning Behavior
///
/// Cloning a [`Term`] performs a deep clone of the contained value using
/// the [`DynClone`] trait. This ensures each receiver has its own copy
/// of the data after message passing.
///
/// # Equality
///
/// Two terms compare equal only if their concrete types are identical
/// and the contained values compare equal. This is the equality used by
/// value patterns during receive.
///
/// [`DynClone`]: dyn_clone::DynClone
#[repr(transparent)]
pub struct Term {
  data: Box<dyn Item>,
}

impl Term {
  /// Creates a new term wrapping the given value.
  ///
  /// # Examples
  ///
  /// ```
  /// use postbox::core::Term;
  ///
  /// let num = Term::new(42);
  /// let text = Term::new("hello");
  /// let data = Term::new(vec![1, 2, 3]);
  /// ```
  #[inline]
  pub fn new<T>(data: T) -> Self
  where
    T: Item,
  {
    Self {
      data: Box::new(data),
    }
  }

  /// Returns `true` if the contained value is of type `T`.
  ///
  /// # Examples
  ///
  /// ```
  /// use postbox::core::Term;
  ///
  /// let term = Term::new(42_i32);
  ///
  /// assert!(term.is::<i32>());
  /// assert!(!term.is::<String>());
  /// ```
  #[inline]
  pub fn is<T>(&self) -> bool
  where
    T: 'static,
  {
    self.data.as_any().is::<T>()
  }

  /// Returns a shared reference to the contained value of type `T`.
  ///
  /// Returns [`None`] if the value has a different concrete type.
  #[inline]
  pub fn downcast_ref<T>(&self) -> Option<&T>
  where
    T: 'static,
  {
    self.data.as_any().downcast_ref()
  }

  /// Returns a mutable reference to the contained value of type `T`.
  ///
  /// Returns [`None`] if the value has a different concrete type.
  #[inline]
  pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
  where
    T: 'static,
  {
    self.data.as_mut_any().downcast_mut()
  }

  /// Converts this term into a boxed value of type `T`.
  ///
  /// Returns the term unchanged if the value has a different concrete type.
  ///
  /// # Examples
  ///
  /// ```
  /// use postbox::core::Term;
  ///
  /// let term = Term::new(String::from("hello"));
  /// let boxed = term.downcast::<String>().unwrap();
  ///
  /// assert_eq!(*boxed, "hello");
  /// ```
  #[inline]
  pub fn downcast<T>(self) -> Result<Box<T>, Self>
  where
    T: 'static,
  {
    if self.is::<T>() {
      // SAFETY: We just ensured the contained value is a valid `T`.
      Ok(unsafe { self.downcast_unchecked() })
    } else {
      Err(self)
    }
  }

  /// Converts this term into a boxed value of type `T` without checks.
  ///
  /// # Safety
  ///
  /// The contained value **must** be of type `T`. Supplying an incorrect
  /// type results in undefined behavior.
  ///
  /// Use [`downcast_ref()`] or [`is()`] to verify the type first, or use
  /// this method only when the type is guaranteed by construction.
  ///
  /// [`downcast_ref()`]: Self::downcast_ref
  /// [`is()`]: Self::is
  #[inline]
  pub unsafe fn downcast_unchecked<T>(self) -> Box<T>
  where
    T: 'static,
  {
    // SAFETY: This is guaranteed to be safe by the caller.
    unsafe { Box::from_raw(Box::into_raw(self.data).cast::<T>()) }
  }

  /// Returns the [`TypeId`] of the contained value.
  #[inline]
  pub(crate) fn tid(&self) -> TypeId {
    self.data.as_any().type_id()
  }
}

impl Clone for Term {
  #[inline]
  fn clone(&self) -> Self {
    Self {
      data: clone_box(&*self.data),
    }
  }
}

impl PartialEq for Term {
  #[inline]
  fn eq(&self, other: &Self) -> bool {
    self.data.dyn_eq(other.data.as_any())
  }
}

impl Debug for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Debug::fmt(&*self.data, f)
  }
}

impl Display for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Debug::fmt(&*self.data, f)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Term;

  #[test]
  fn test_is() {
    let term: Term = Term::new(42_i32);

    assert!(term.is::<i32>());
    assert!(!term.is::<i64>());
    assert!(!term.is::<String>());
  }

  #[test]
  fn test_downcast_ref() {
    let term: Term = Term::new(String::from("hello"));

    assert_eq!(term.downcast_ref::<String>(), Some(&String::from("hello")));
    assert_eq!(term.downcast_ref::<i32>(), None);
  }

  #[test]
  fn test_downcast_mut() {
    let mut term: Term = Term::new(vec![1, 2, 3]);

    if let Some(vec) = term.downcast_mut::<Vec<i32>>() {
      vec.push(4);
    }

    assert_eq!(term.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3, 4]));
  }

  #[test]
  fn test_downcast_owned() {
    let term: Term = Term::new(7_u8);
    let term: Term = term.downcast::<u16>().unwrap_err();

    assert_eq!(*term.downcast::<u8>().unwrap(), 7);
  }

  #[test]
  fn test_eq_requires_identical_types() {
    assert_eq!(Term::new(42_i32), Term::new(42_i32));
    assert_ne!(Term::new(42_i32), Term::new(42_u32));
    assert_ne!(Term::new(42_i32), Term::new(43_i32));
    assert_eq!(Term::new("a"), Term::new("a"));
  }

  #[test]
  fn test_clone_is_deep() {
    let src: Term = Term::new(vec![1, 2]);
    let mut dst: Term = src.clone();

    dst.downcast_mut::<Vec<i32>>().unwrap().push(3);

    assert_eq!(src.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2]));
    assert_eq!(dst.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
  }
}
