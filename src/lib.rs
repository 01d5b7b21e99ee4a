//! Postbox - Erlang-style mailboxes with selective receive for Rust.
//!
//! Postbox provides process-style message queues on top of tokio:
//! ordered mailboxes, pattern-matched blocking receive that skips
//! non-matching messages without disturbing them, and deferred sends
//! driven by a timer wheel.
//!
//! # Quick Start
//!
//! ```no_run
//! use postbox::core::Pattern;
//! use postbox::mailbox::Mailbox;
//!
//! #[tokio::main]
//! async fn main() {
//!   let mailbox = Mailbox::new();
//!
//!   mailbox.send_tagged("job", 42_u64).unwrap();
//!
//!   let found = mailbox
//!     .receive(&[Pattern::shape("job", 1)])
//!     .await
//!     .unwrap();
//!
//!   println!("job id: {:?}", found.capture_ref::<u64>(0));
//! }
//! ```
//!
//! # Core Modules
//!
//! - [`mailbox`]: Mailboxes and the receive protocol
//! - [`timer`]: Deferred message delivery
//! - [`core`]: Core types (terms, messages, patterns)
//! - [`error`]: Send, receive, and timer errors
//! - [`consts`]: Configuration constants

pub mod consts;
pub mod core;
pub mod error;
pub mod mailbox;
pub mod timer;
