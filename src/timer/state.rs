//! Timer lifecycle state shared between handles and wheel workers.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use triomphe::Arc;

// -----------------------------------------------------------------------------
// Timer State
// -----------------------------------------------------------------------------

/// Lifecycle state of a deferred send.
///
/// A reset timer remains `Pending`; `Fired` and `Cancelled` are
/// terminal.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[repr(u8)]
pub enum TimerState {
  /// Scheduled and not yet fired.
  Pending = 0,
  /// The message was delivered. Terminal.
  Fired = 1,
  /// Delivery was cancelled. Terminal.
  Cancelled = 2,
}

impl TimerState {
  #[inline]
  const fn from_u8(bits: u8) -> Self {
    match bits {
      0 => Self::Pending,
      1 => Self::Fired,
      _ => Self::Cancelled,
    }
  }
}

impl Display for TimerState {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Pending => f.write_str("pending"),
      Self::Fired => f.write_str("fired"),
      Self::Cancelled => f.write_str("cancelled"),
    }
  }
}

// -----------------------------------------------------------------------------
// Timer Flag
// -----------------------------------------------------------------------------

/// Shared one-way state cell for a single timer.
///
/// The handle reads it to guard [`reset()`]/[`cancel()`] calls; the
/// owning wheel worker performs the only transitions, each a CAS out of
/// `Pending`, so a timer reaches exactly one terminal state.
///
/// [`reset()`]: crate::timer::TimerHandle::reset
/// [`cancel()`]: crate::timer::TimerHandle::cancel
#[derive(Clone)]
#[repr(transparent)]
pub(crate) struct TimerFlag {
  inner: Arc<AtomicU8>,
}

impl TimerFlag {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      inner: Arc::new(AtomicU8::new(TimerState::Pending as u8)),
    }
  }

  /// Returns the current timer state.
  #[inline]
  pub(crate) fn get(&self) -> TimerState {
    TimerState::from_u8(self.inner.load(Ordering::Acquire))
  }

  /// Attempts the `Pending` -> `Fired` transition.
  #[inline]
  pub(crate) fn fire(&self) -> bool {
    self.transition(TimerState::Fired)
  }

  /// Attempts the `Pending` -> `Cancelled` transition.
  #[inline]
  pub(crate) fn cancel(&self) -> bool {
    self.transition(TimerState::Cancelled)
  }

  fn transition(&self, next: TimerState) -> bool {
    self
      .inner
      .compare_exchange(
        TimerState::Pending as u8,
        next as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok()
  }
}

impl Debug for TimerFlag {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_tuple("TimerFlag").field(&self.get()).finish()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
