//! Per-round receive session over a mailbox.

use parking_lot::MutexGuard;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::time::Duration;
use tokio::time;
use tokio::time::Instant;

use crate::core::Match;
use crate::core::Pattern;
use crate::error::ReceiveError;
use crate::mailbox::MailState;
use crate::mailbox::Mailbox;
use crate::mailbox::wait_queue::Waiter;
use crate::mailbox::wait_queue::WaiterState;

// -----------------------------------------------------------------------------
// Match Cursor
// -----------------------------------------------------------------------------

/// A single receive round bound to one mailbox and one calling task.
///
/// A cursor tracks two pieces of scan state:
///
/// - a *marker*: the queue position up to which the current clause set
///   has already rejected every message, so re-scans after a wake only
///   inspect what arrived since (a fresh clause set resets it, since an
///   earlier non-matching message may well match different clauses);
/// - a *watermark*: the queue length observed by the last [`offer()`],
///   so [`wait()`] returns immediately when a send slipped in between
///   the offer and the wait instead of suspending past it.
///
/// The integrated [`resolve()`] / [`resolve_timeout()`] calls implement
/// the common one-clause-set receive; `offer` + `wait` support rounds
/// that interleave several clause sets:
///
/// ```no_run
/// use postbox::core::Pattern;
/// use postbox::mailbox::Mailbox;
///
/// # async fn example(mailbox: Mailbox) -> Result<(), postbox::error::ReceiveError> {
/// let mut cursor = mailbox.cursor();
/// let mut totals: u64 = 0;
///
/// loop {
///   if cursor.offer(&[Pattern::value("stop")]).is_some() {
///     break;
///   }
///   if let Some(found) = cursor.offer(&[Pattern::of::<u64>()]) {
///     totals += found.capture_ref::<u64>(0).copied().unwrap_or(0);
///     continue;
///   }
///   cursor.wait().await?;
/// }
/// # Ok(())
/// # }
/// ```
///
/// At most one message is removed per successful offer or resolve; the
/// cursor is destroyed when the round completes or is abandoned.
///
/// [`offer()`]: Self::offer
/// [`wait()`]: Self::wait
/// [`resolve()`]: Self::resolve
/// [`resolve_timeout()`]: Self::resolve_timeout
pub struct MatchCursor<'a> {
  mailbox: &'a Mailbox,
  marker: usize,
  watermark: usize,
}

impl<'a> MatchCursor<'a> {
  #[inline]
  pub(crate) fn new(mailbox: &'a Mailbox) -> Self {
    Self {
      mailbox,
      marker: 0,
      watermark: 0,
    }
  }

  /// Tests a clause set against the pending sequence without blocking.
  ///
  /// Scans from the head: messages rejected by earlier offers in this
  /// round are re-tested, since this clause set may accept what those
  /// rejected. On a match the message is removed and returned.
  pub fn offer(&mut self, patterns: &[Pattern]) -> Option<Match> {
    let mut state: MutexGuard<'_, MailState> = self.mailbox.lock();

    self.marker = 0;

    let found: Option<Match> = state.queue.scan(patterns, &mut self.marker);

    self.watermark = state.queue.len();

    found
  }

  /// Suspends until a message arrives after the last offer.
  ///
  /// Returns immediately if one already has. Fails with
  /// [`ReceiveError::Closed`] when the mailbox is closed, and
  /// [`ReceiveError::Cancelled`] when the suspended waiter is cancelled.
  pub async fn wait(&mut self) -> Result<(), ReceiveError> {
    let waiter: Waiter = {
      let mut state: MutexGuard<'_, MailState> = self.mailbox.lock();

      if state.queue.len() != self.watermark {
        return Ok(());
      }

      if state.closed {
        return Err(ReceiveError::Closed);
      }

      state.waiters.enqueue()
    };

    tracing::trace!(mbox = self.mailbox.mbid(), "receive suspended");

    let guard: WaitGuard<'_> = WaitGuard::new(self.mailbox, waiter);

    guard.wait().await;

    match guard.disarm().state() {
      WaiterState::Cancelled => Err(ReceiveError::Cancelled),
      _ => Ok(()),
    }
  }

  /// Blocks until a message matches the given clause set.
  ///
  /// Every wake re-validates by re-scanning rather than assuming the
  /// triggering send is the one to consume.
  pub async fn resolve(mut self, patterns: &[Pattern]) -> Result<Match, ReceiveError> {
    loop {
      let waiter: Waiter = match self.next_waiter(patterns)? {
        Ok(found) => return Ok(found),
        Err(waiter) => waiter,
      };

      let guard: WaitGuard<'_> = WaitGuard::new(self.mailbox, waiter);

      guard.wait().await;

      if guard.disarm().state() == WaiterState::Cancelled {
        return Err(ReceiveError::Cancelled);
      }
    }
  }

  /// Blocks like [`resolve()`], bounded by a total deadline.
  ///
  /// The deadline spans all suspensions of the call: intervening
  /// non-matching sends do not restart it. On expiry the waiter is
  /// cancelled; a wake that raced the deadline is re-validated and, if
  /// unused, passed on to the next waiter so no signal is lost.
  ///
  /// [`resolve()`]: Self::resolve
  pub async fn resolve_timeout(
    mut self,
    patterns: &[Pattern],
    limit: Duration,
  ) -> Result<Match, ReceiveError> {
    let deadline: Instant = Instant::now() + limit;

    loop {
      let waiter: Waiter = match self.next_waiter(patterns)? {
        Ok(found) => return Ok(found),
        Err(waiter) => waiter,
      };

      let guard: WaitGuard<'_> = WaitGuard::new(self.mailbox, waiter);

      if time::timeout_at(deadline, guard.wait()).await.is_err() {
        let waiter: Waiter = guard.disarm();
        let mut state: MutexGuard<'_, MailState> = self.mailbox.lock();

        if state.waiters.cancel(&waiter) == WaiterState::Woken {
          if let Some(found) = state.queue.scan(patterns, &mut self.marker) {
            return Ok(found);
          }

          state.waiters.wake_one();
        }

        tracing::trace!(mbox = self.mailbox.mbid(), "receive timed out");

        return Err(ReceiveError::TimedOut);
      }

      if guard.disarm().state() == WaiterState::Cancelled {
        return Err(ReceiveError::Cancelled);
      }
    }
  }

  /// Scans once; registers a waiter when nothing matches.
  ///
  /// The failed scan and the registration happen under one lock
  /// acquisition, so a send between them is impossible and the wakeup
  /// cannot be lost.
  fn next_waiter(&mut self, patterns: &[Pattern]) -> Result<Result<Match, Waiter>, ReceiveError> {
    let mut state: MutexGuard<'_, MailState> = self.mailbox.lock();

    if let Some(found) = state.queue.scan(patterns, &mut self.marker) {
      tracing::trace!(
        mbox = self.mailbox.mbid(),
        clause = found.clause(),
        pending = state.queue.len(),
        "message received"
      );

      return Ok(Ok(found));
    }

    if state.closed {
      return Err(ReceiveError::Closed);
    }

    Ok(Err(state.waiters.enqueue()))
  }
}

impl Debug for MatchCursor<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("MatchCursor")
      .field("mbox", &self.mailbox.mbid())
      .field("marker", &self.marker)
      .field("watermark", &self.watermark)
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Wait Guard
// -----------------------------------------------------------------------------

/// Owns a registered waiter for the duration of one suspension.
///
/// A receive future can be dropped mid-wait, by task abort or by a
/// losing `select!` branch. Dropping the guard deregisters the waiter;
/// a wake that already claimed the waiter is forwarded to the next one,
/// so the signal survives the drop instead of stranding receivers
/// queued behind the dead entry.
struct WaitGuard<'a> {
  mailbox: &'a Mailbox,
  waiter: Waiter,
  armed: bool,
}

impl<'a> WaitGuard<'a> {
  #[inline]
  fn new(mailbox: &'a Mailbox, waiter: Waiter) -> Self {
    Self {
      mailbox,
      waiter,
      armed: true,
    }
  }

  /// Suspends until the guarded waiter is woken or cancelled.
  #[inline]
  async fn wait(&self) {
    self.waiter.wait().await;
  }

  /// Releases the waiter without deregistering it.
  #[inline]
  fn disarm(mut self) -> Waiter {
    self.armed = false;
    self.waiter.clone()
  }
}

impl Drop for WaitGuard<'_> {
  fn drop(&mut self) {
    if !self.armed {
      return;
    }

    let mut state: MutexGuard<'_, MailState> = self.mailbox.lock();

    if state.waiters.cancel(&self.waiter) == WaiterState::Woken {
      // The wake raced the drop and was never observed; pass it on.
      state.waiters.wake_one();
    }
  }
}
