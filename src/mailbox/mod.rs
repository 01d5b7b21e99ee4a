//! Per-process message queues with selective receive.
//!
//! A [`Mailbox`] is an ordered, unbounded (optionally bounded) queue of
//! [`Message`]s. Producers append with [`send()`]; the owning consumer
//! retrieves messages with pattern-matched, possibly-blocking receive
//! operations driven by a [`MatchCursor`].
//!
//! # Selective Receive
//!
//! A receive call scans pending messages in send order and removes the
//! earliest one matching any supplied clause. Messages that match no
//! clause are left in place, in order, for later receive calls; a
//! receive never drops or reorders what it skips. When nothing matches,
//! the caller suspends until a subsequent send, then re-scans from the
//! head.
//!
//! # Ownership
//!
//! [`Mailbox`] is a cheap cloneable handle: any number of producers may
//! hold one, but the receive side is meant for a single logical
//! consumer, mirroring process-owned mailboxes.
//!
//! [`send()`]: Mailbox::send

mod cursor;
mod msg_queue;
mod wait_queue;

pub use self::cursor::MatchCursor;

use parking_lot::Mutex;
use parking_lot::MutexGuard;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::num::NonZeroUsize;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use triomphe::Arc;

use crate::core::Item;
use crate::core::Match;
use crate::core::Message;
use crate::core::Pattern;
use crate::error::ReceiveError;
use crate::error::SendError;
use crate::mailbox::msg_queue::MsgQueue;
use crate::mailbox::wait_queue::WaitQueue;

// -----------------------------------------------------------------------------
// Mailbox
// -----------------------------------------------------------------------------

/// An ordered message queue with blocking pattern-matched retrieval.
///
/// # Examples
///
/// ```no_run
/// use postbox::core::Pattern;
/// use postbox::mailbox::Mailbox;
///
/// # async fn example() {
/// let mailbox = Mailbox::new();
///
/// mailbox.send_tagged("reload", 5_u64).unwrap();
///
/// let found = mailbox
///   .receive(&[Pattern::shape("reload", 1)])
///   .await
///   .unwrap();
///
/// assert_eq!(found.capture_ref::<u64>(0), Some(&5));
/// # }
/// ```
#[derive(Clone)]
#[repr(transparent)]
pub struct Mailbox {
  shared: Arc<Shared>,
}

struct Shared {
  mbid: u64,
  limit: Option<NonZeroUsize>,
  state: Mutex<MailState>,
}

pub(crate) struct MailState {
  pub(crate) queue: MsgQueue,
  pub(crate) waiters: WaitQueue,
  pub(crate) closed: bool,
}

impl Mailbox {
  /// Creates a new empty unbounded mailbox.
  #[inline]
  pub fn new() -> Self {
    Self::with_limit(None)
  }

  /// Creates a new empty mailbox holding at most `limit` messages.
  ///
  /// Sends beyond the limit fail with [`SendError::Full`], providing a
  /// synchronous backpressure signal to producers.
  #[inline]
  pub fn bounded(limit: NonZeroUsize) -> Self {
    Self::with_limit(Some(limit))
  }

  fn with_limit(limit: Option<NonZeroUsize>) -> Self {
    static SERIAL: AtomicU64 = AtomicU64::new(0);

    Self {
      shared: Arc::new(Shared {
        mbid: SERIAL.fetch_add(1, Ordering::Relaxed),
        limit,
        state: Mutex::new(MailState {
          queue: MsgQueue::new(),
          waiters: WaitQueue::new(),
          closed: false,
        }),
      }),
    }
  }

  // ---------------------------------------------------------------------------
  // Sending
  // ---------------------------------------------------------------------------

  /// Appends a message at the tail of the pending sequence.
  ///
  /// The message is visible to receive attempts from the moment this
  /// returns. If a receiver is blocked, the earliest one is woken; the
  /// woken receiver re-scans the queue rather than being handed the
  /// message directly, preserving match order against other pending
  /// messages. Never suspends.
  pub fn send(&self, message: Message) -> Result<(), SendError> {
    let mut state: MutexGuard<'_, MailState> = self.shared.state.lock();

    if state.closed {
      return Err(SendError::Closed(message));
    }

    if let Some(limit) = self.shared.limit {
      if state.queue.len() >= limit.get() {
        return Err(SendError::Full(message));
      }
    }

    state.queue.push(message);

    let woken: bool = state.waiters.wake_one();

    tracing::trace!(
      mbox = self.shared.mbid,
      pending = state.queue.len(),
      woken,
      "message sent"
    );

    Ok(())
  }

  /// Sends a plain single-value message.
  #[inline]
  pub fn send_value<T>(&self, value: T) -> Result<(), SendError>
  where
    T: Item,
  {
    self.send(Message::value(value))
  }

  /// Sends a tagged message.
  #[inline]
  pub fn send_tagged<T, U>(&self, tag: T, payload: U) -> Result<(), SendError>
  where
    T: Item,
    U: Item,
  {
    self.send(Message::tagged(tag, payload))
  }

  // ---------------------------------------------------------------------------
  // Receiving
  // ---------------------------------------------------------------------------

  /// Opens a fresh receive round over the current pending sequence.
  #[inline]
  pub fn cursor(&self) -> MatchCursor<'_> {
    MatchCursor::new(self)
  }

  /// Receives the earliest pending message matching any clause.
  ///
  /// Suspends until a match becomes available; fails with
  /// [`ReceiveError::Closed`] if the mailbox closes while no pending
  /// message matches.
  #[inline]
  pub async fn receive(&self, patterns: &[Pattern]) -> Result<Match, ReceiveError> {
    self.cursor().resolve(patterns).await
  }

  /// Receives with a total deadline across all suspensions.
  ///
  /// On expiry the suspended waiter is cancelled and the call fails
  /// with [`ReceiveError::TimedOut`]; no pending message is dropped or
  /// reordered.
  #[inline]
  pub async fn receive_timeout(
    &self,
    patterns: &[Pattern],
    limit: Duration,
  ) -> Result<Match, ReceiveError> {
    self.cursor().resolve_timeout(patterns, limit).await
  }

  /// Attempts a non-blocking receive.
  #[inline]
  pub fn try_receive(&self, patterns: &[Pattern]) -> Option<Match> {
    self.cursor().offer(patterns)
  }

  // ---------------------------------------------------------------------------
  // Lifecycle
  // ---------------------------------------------------------------------------

  /// Closes the mailbox and rouses every blocked receiver.
  ///
  /// Subsequent sends fail with [`SendError::Closed`]. Receives keep
  /// draining matching pending messages, but fail with
  /// [`ReceiveError::Closed`] instead of suspending once nothing
  /// matches.
  pub fn close(&self) {
    let mut state: MutexGuard<'_, MailState> = self.shared.state.lock();

    if state.closed {
      return;
    }

    state.closed = true;

    let woken: usize = state.waiters.wake_all();

    tracing::debug!(
      mbox = self.shared.mbid,
      pending = state.queue.len(),
      woken,
      "mailbox closed"
    );
  }

  /// Returns `true` if the mailbox has been closed.
  #[inline]
  pub fn is_closed(&self) -> bool {
    self.shared.state.lock().closed
  }

  /// Returns the number of pending messages.
  #[inline]
  pub fn len(&self) -> usize {
    self.shared.state.lock().queue.len()
  }

  /// Returns `true` if no messages are pending.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  // ---------------------------------------------------------------------------
  // Internals
  // ---------------------------------------------------------------------------

  #[inline]
  pub(crate) fn lock(&self) -> MutexGuard<'_, MailState> {
    self.shared.state.lock()
  }

  #[inline]
  pub(crate) fn mbid(&self) -> u64 {
    self.shared.mbid
  }
}

impl Default for Mailbox {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Debug for Mailbox {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    let state: MutexGuard<'_, MailState> = self.shared.state.lock();

    f.debug_struct("Mailbox")
      .field("mbid", &self.shared.mbid)
      .field("pending", &state.queue.len())
      .field("waiters", &state.waiters.len())
      .field("closed", &state.closed)
      .finish()
  }
}
