//! Deferred message delivery.
//!
//! A [`TimerWheel`] owns a pool of worker tasks that deliver messages
//! into mailboxes after a delay. [`send_after()`] arms a timer and
//! returns a [`TimerHandle`] that can restart the full delay, cancel
//! delivery, or read the time remaining. A timer fires at most once;
//! once fired or cancelled it is terminal and further control calls
//! fail.
//!
//! # Examples
//!
//! ```no_run
//! use postbox::core::Message;
//! use postbox::core::Pattern;
//! use postbox::mailbox::Mailbox;
//! use postbox::timer::TimerWheel;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let mailbox = Mailbox::new();
//! let wheel = TimerWheel::new();
//!
//! let timer = wheel.send_after(
//!   Duration::from_millis(250),
//!   &mailbox,
//!   Message::value("tick"),
//! );
//!
//! mailbox.receive(&[Pattern::value("tick")]).await.unwrap();
//!
//! assert!(timer.cancel().is_err());
//! # }
//! ```
//!
//! [`send_after()`]: TimerWheel::send_after

mod state;
mod wheel;

pub use self::state::TimerState;

use crossbeam_utils::CachePadded;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;

use crate::consts::DEFAULT_WHEEL_WORKERS;
use crate::consts::SHUTDOWN_TIMEOUT;
use crate::core::Message;
use crate::error::TimerError;
use crate::mailbox::Mailbox;
use crate::timer::state::TimerFlag;
use crate::timer::wheel::InitTimer;
use crate::timer::wheel::ReadTimer;
use crate::timer::wheel::Reply;
use crate::timer::wheel::ResetTimer;
use crate::timer::wheel::Signal;
use crate::timer::wheel::StopTimer;
use crate::timer::wheel::WheelWorker;

// -----------------------------------------------------------------------------
// Timer Reference
// -----------------------------------------------------------------------------

/// Reference uniquely identifying a timer.
///
/// Also selects the wheel worker that owns the timer.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TimerRef {
  id: u64,
}

impl TimerRef {
  #[inline]
  fn new() -> Self {
    static SERIAL: AtomicU64 = AtomicU64::new(0);

    Self {
      id: SERIAL.fetch_add(1, Ordering::Relaxed),
    }
  }

  #[inline]
  pub const fn id(&self) -> u64 {
    self.id
  }
}

impl Debug for TimerRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Display::fmt(self, f)
  }
}

impl Display for TimerRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "#Timer<{}>", self.id)
  }
}

// -----------------------------------------------------------------------------
// Timer Wheel
// -----------------------------------------------------------------------------

/// A pool of wheel workers delivering deferred messages.
///
/// Timers are partitioned across workers by reference, so control
/// signals for one timer are always serviced by the worker that owns
/// it. Dropping the wheel stops the workers and cancels outstanding
/// timers; [`shutdown()`] does the same with a bounded join.
///
/// [`shutdown()`]: Self::shutdown
#[repr(C)]
pub struct TimerWheel {
  senders: Vec<CachePadded<UnboundedSender<Signal>>>,
  handles: Vec<JoinHandle<()>>,
}

impl TimerWheel {
  /// Creates a wheel with the default number of workers.
  ///
  /// Must be called from within a tokio runtime.
  #[expect(clippy::new_without_default, reason = "possibly confusing")]
  #[inline]
  pub fn new() -> Self {
    Self::with_workers(DEFAULT_WHEEL_WORKERS)
  }

  /// Creates a wheel backed by `workers` worker tasks.
  ///
  /// Must be called from within a tokio runtime.
  #[inline]
  pub fn with_workers(workers: usize) -> Self {
    Self::on_runtime(&Handle::current(), workers)
  }

  /// Creates a wheel spawning its workers on the given runtime.
  pub fn on_runtime(runtime: &Handle, workers: usize) -> Self {
    let workers: usize = workers.max(1);

    let mut senders: Vec<CachePadded<UnboundedSender<Signal>>> = Vec::with_capacity(workers);
    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);

    tracing::debug!(workers, "initializing wheel workers");

    for id in 0..workers {
      let (send, recv): _ = mpsc::unbounded_channel();

      let task: JoinHandle<()> = runtime.spawn(WheelWorker::task(id, recv));

      senders.push(CachePadded::new(send));
      handles.push(task);
    }

    Self { senders, handles }
  }

  /// Arms a timer delivering `message` to `mailbox` after `delay`.
  ///
  /// Delivery is a plain [`send()`]: it lands at the queue tail in
  /// arrival order relative to direct sends. A delivery refused by a
  /// closed or full mailbox is dropped; the timer still counts as
  /// fired.
  ///
  /// [`send()`]: Mailbox::send
  pub fn send_after(&self, delay: Duration, mailbox: &Mailbox, message: Message) -> TimerHandle {
    let tref: TimerRef = TimerRef::new();
    let flag: TimerFlag = TimerFlag::new();
    let slot: usize = (tref.id % self.senders.len() as u64) as usize;
    let sender: UnboundedSender<Signal> = UnboundedSender::clone(&self.senders[slot]);

    let signal: Signal = Signal::Init(InitTimer {
      tref,
      mailbox: mailbox.clone(),
      message,
      delay,
      flag: flag.clone(),
    });

    if sender.send(signal).is_err() {
      // The worker is gone; the timer can never fire.
      tracing::error!(%tref, slot, "wheel worker unavailable");
      flag.cancel();
    }

    TimerHandle { tref, flag, sender }
  }

  /// Stops all workers using [`SHUTDOWN_TIMEOUT`] as the join bound.
  #[inline]
  pub async fn shutdown(self) {
    self.shutdown_timeout(SHUTDOWN_TIMEOUT).await;
  }

  /// Stops all workers, cancelling outstanding timers.
  ///
  /// Waits up to `timeout` for each worker task to drain and exit.
  pub async fn shutdown_timeout(self, timeout: Duration) {
    for (id, send) in self.senders.iter().enumerate() {
      if send.send(Signal::Quit).is_err() {
        tracing::warn!(id, "dangling wheel worker");
      }
    }

    for (id, handle) in self.handles.into_iter().enumerate() {
      match time::timeout(timeout, handle).await {
        Ok(Ok(())) => {
          // clean shutdown
        }
        Ok(Err(error)) => {
          tracing::error!(id, ?error, "wheel worker join error");
        }
        Err(error) => {
          tracing::error!(id, ?error, "wheel worker timeout error");
        }
      }
    }
  }
}

impl Debug for TimerWheel {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("TimerWheel")
      .field("workers", &self.senders.len())
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Timer Handle
// -----------------------------------------------------------------------------

/// Control handle for a single armed timer.
///
/// Control calls come in two flavors: fire-and-forget ([`reset()`],
/// [`cancel()`]), which enqueue the signal and return, and
/// acknowledged ([`reset_wait()`], [`cancel_wait()`], [`remaining()`]),
/// which wait for the owning worker's reply.
///
/// Both flavors fail fast once the timer is terminal. A terminal
/// transition that races the signal is resolved by the worker: the
/// timer fires or cancels exactly once regardless.
///
/// [`reset()`]: Self::reset
/// [`cancel()`]: Self::cancel
/// [`reset_wait()`]: Self::reset_wait
/// [`cancel_wait()`]: Self::cancel_wait
/// [`remaining()`]: Self::remaining
pub struct TimerHandle {
  tref: TimerRef,
  flag: TimerFlag,
  sender: UnboundedSender<Signal>,
}

impl TimerHandle {
  /// Returns the reference identifying this timer.
  #[inline]
  pub const fn tref(&self) -> TimerRef {
    self.tref
  }

  /// Returns the current lifecycle state of this timer.
  #[inline]
  pub fn state(&self) -> TimerState {
    self.flag.get()
  }

  /// Restarts the timer with its full original delay.
  ///
  /// Fails with [`TimerError::AlreadyFired`] or
  /// [`TimerError::AlreadyCancelled`] once the timer is terminal.
  pub fn reset(&self) -> Result<(), TimerError> {
    self.guard()?;
    self.dispatch(Signal::Reset(ResetTimer {
      tref: self.tref,
      reply: Reply::None,
    }))
  }

  /// Restarts the timer and waits for the worker's acknowledgment.
  ///
  /// Returns the time that remained before the restart, or `Ok(None)`
  /// when the timer reached a terminal state before the signal was
  /// serviced.
  pub async fn reset_wait(&self) -> Result<Option<Duration>, TimerError> {
    self.guard()?;

    let (send, recv): _ = oneshot::channel();

    self.dispatch(Signal::Reset(ResetTimer {
      tref: self.tref,
      reply: Reply::Ack(send),
    }))?;

    recv.await.map_err(|_| TimerError::WheelClosed)
  }

  /// Cancels the timer so its message is never delivered.
  ///
  /// Fails with [`TimerError::AlreadyFired`] or
  /// [`TimerError::AlreadyCancelled`] once the timer is terminal.
  pub fn cancel(&self) -> Result<(), TimerError> {
    self.guard()?;
    self.dispatch(Signal::Stop(StopTimer {
      tref: self.tref,
      reply: Reply::None,
    }))
  }

  /// Cancels the timer and waits for the worker's acknowledgment.
  ///
  /// Returns the undelivered time, or `Ok(None)` when the timer
  /// reached a terminal state before the signal was serviced. After
  /// this call returns the message will never be delivered unless the
  /// timer had already fired.
  pub async fn cancel_wait(&self) -> Result<Option<Duration>, TimerError> {
    self.guard()?;

    let (send, recv): _ = oneshot::channel();

    self.dispatch(Signal::Stop(StopTimer {
      tref: self.tref,
      reply: Reply::Ack(send),
    }))?;

    recv.await.map_err(|_| TimerError::WheelClosed)
  }

  /// Reads the time remaining until delivery.
  ///
  /// Returns `Ok(None)` for a terminal timer.
  pub async fn remaining(&self) -> Result<Option<Duration>, TimerError> {
    let (send, recv): _ = oneshot::channel();

    self.dispatch(Signal::Read(ReadTimer {
      tref: self.tref,
      ack: send,
    }))?;

    recv.await.map_err(|_| TimerError::WheelClosed)
  }

  fn guard(&self) -> Result<(), TimerError> {
    match self.flag.get() {
      TimerState::Pending => Ok(()),
      TimerState::Fired => Err(TimerError::AlreadyFired),
      TimerState::Cancelled => Err(TimerError::AlreadyCancelled),
    }
  }

  #[inline]
  fn dispatch(&self, signal: Signal) -> Result<(), TimerError> {
    self
      .sender
      .send(signal)
      .map_err(|_| TimerError::WheelClosed)
  }
}

impl Debug for TimerHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("TimerHandle")
      .field("tref", &self.tref)
      .field("state", &self.flag.get())
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
