//! Core message types: type-erased values, messages, and patterns.
//!
//! This module provides the data model shared by mailboxes and timers:
//!
//! - [`Term`]: a dynamically typed, deeply-cloneable value
//! - [`Item`]: the trait implemented by all values stored in a [`Term`]
//! - [`Message`]: an immutable tuple of terms (plain or tagged)
//! - [`Pattern`]: a structural predicate tested against pending messages
//! - [`Match`]: the decomposition bound by a successful receive

mod item;
mod message;
mod pattern;
mod term;

pub use self::item::Item;
pub use self::message::Message;
pub use self::pattern::Match;
pub use self::pattern::Pattern;
pub use self::pattern::TypeCheck;
pub use self::term::Term;
