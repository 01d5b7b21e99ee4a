//! FIFO registry of suspended receivers awaiting a wake signal.
//!
//! Every blocking receive registers a [`Waiter`] here before yielding
//! to the runtime. A waiter is woken at most once and dequeued the
//! moment it is woken; cancellation and wake race such that exactly one
//! of the two wins. Wake signals are delivered through a per-waiter
//! [`Notify`], which retains a permit when the wake arrives before the
//! waiter is polled, so no wakeup is ever lost.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use tokio::sync::Notify;
use triomphe::Arc;

use crate::consts::CAP_WAIT_QUEUE;

// -----------------------------------------------------------------------------
// Waiter State
// -----------------------------------------------------------------------------

/// Lifecycle state of a suspended receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum WaiterState {
  /// Registered and suspended.
  Waiting = 0,
  /// Signaled by a wake; dequeued. Terminal.
  Woken = 1,
  /// Removed before any wake arrived. Terminal.
  Cancelled = 2,
}

impl WaiterState {
  #[inline]
  const fn from_u8(bits: u8) -> Self {
    match bits {
      0 => Self::Waiting,
      1 => Self::Woken,
      _ => Self::Cancelled,
    }
  }
}

// -----------------------------------------------------------------------------
// Waiter
// -----------------------------------------------------------------------------

/// Handle to one suspended receiver.
///
/// Cloned into the wait queue on registration; the original stays with
/// the suspended task, which awaits [`wait()`] and re-validates on
/// return.
///
/// [`wait()`]: Self::wait
#[derive(Clone)]
#[repr(transparent)]
pub(crate) struct Waiter {
  cell: Arc<WaitCell>,
}

struct WaitCell {
  notify: Notify,
  state: AtomicU8,
}

impl Waiter {
  #[inline]
  fn new() -> Self {
    Self {
      cell: Arc::new(WaitCell {
        notify: Notify::new(),
        state: AtomicU8::new(WaiterState::Waiting as u8),
      }),
    }
  }

  /// Suspends until this waiter is woken or cancelled.
  #[inline]
  pub(crate) async fn wait(&self) {
    self.cell.notify.notified().await;
  }

  /// Returns the current waiter state.
  #[inline]
  pub(crate) fn state(&self) -> WaiterState {
    WaiterState::from_u8(self.cell.state.load(Ordering::Acquire))
  }

  /// Attempts the `Waiting` -> `Woken` transition and signals on success.
  fn wake(&self) -> bool {
    let woken: bool = self
      .cell
      .state
      .compare_exchange(
        WaiterState::Waiting as u8,
        WaiterState::Woken as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok();

    if woken {
      self.cell.notify.notify_one();
    }

    woken
  }

  /// Attempts the `Waiting` -> `Cancelled` transition.
  ///
  /// Returns the state the waiter was in before the attempt; callers
  /// observing [`WaiterState::Woken`] hold a wake signal that raced the
  /// cancellation and must re-validate it.
  fn cancel(&self) -> WaiterState {
    let result: Result<u8, u8> = self.cell.state.compare_exchange(
      WaiterState::Waiting as u8,
      WaiterState::Cancelled as u8,
      Ordering::AcqRel,
      Ordering::Acquire,
    );

    match result {
      Ok(bits) => WaiterState::from_u8(bits),
      Err(bits) => WaiterState::from_u8(bits),
    }
  }

  #[inline]
  fn same(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.cell, &other.cell)
  }
}

impl Debug for Waiter {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_tuple("Waiter").field(&self.state()).finish()
  }
}

// -----------------------------------------------------------------------------
// Wait Queue
// -----------------------------------------------------------------------------

/// FIFO set of suspended receivers, each woken exactly once.
///
/// The queue itself is only mutated under the owning mailbox's lock;
/// waiter state is atomic because the suspended task observes it after
/// releasing that lock.
pub(crate) struct WaitQueue {
  queue: VecDeque<Waiter>,
}

impl WaitQueue {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      queue: VecDeque::with_capacity(CAP_WAIT_QUEUE),
    }
  }

  /// Registers a new waiter at the tail of the queue.
  #[inline]
  pub(crate) fn enqueue(&mut self) -> Waiter {
    let waiter: Waiter = Waiter::new();

    self.queue.push_back(waiter.clone());

    waiter
  }

  /// Wakes the earliest still-waiting receiver, if any.
  ///
  /// Cancelled entries encountered at the head are discarded. Returns
  /// `true` if a waiter was signaled; no-op on an empty queue.
  pub(crate) fn wake_one(&mut self) -> bool {
    while let Some(waiter) = self.queue.pop_front() {
      if waiter.wake() {
        return true;
      }
    }

    false
  }

  /// Wakes and clears every registered waiter.
  pub(crate) fn wake_all(&mut self) -> usize {
    let mut woken: usize = 0;

    for waiter in self.queue.drain(..) {
      if waiter.wake() {
        woken += 1;
      }
    }

    woken
  }

  /// Removes a specific waiter before it is woken.
  ///
  /// At most one of {wake, cancel} wins the race: if the waiter was
  /// already woken, the queue is left untouched and the prior state is
  /// returned so the caller can re-validate the consumed wake.
  pub(crate) fn cancel(&mut self, waiter: &Waiter) -> WaiterState {
    let prior: WaiterState = waiter.cancel();

    if prior == WaiterState::Waiting {
      self.queue.retain(|entry| !entry.same(waiter));
    }

    prior
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.queue.len()
  }
}

impl Debug for WaitQueue {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("WaitQueue ")?;
    f.debug_list().entries(self.queue.iter()).finish()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
