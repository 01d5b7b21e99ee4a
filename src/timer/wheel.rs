//! Worker task behind the timer wheel.
//!
//! Each worker owns a [`DelayQueue`] of armed timers plus a cache of
//! their delivery data, and serves control signals from an unbounded
//! channel. Expiry polling is biased over signal handling so a due
//! timer fires before a racing reset or cancel is observed.

use hashbrown::HashMap;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot::Sender as AckSender;
use tokio::time::Instant;
use tokio_util::time::DelayQueue;
use tokio_util::time::delay_queue::Expired;
use tokio_util::time::delay_queue::Key as QueueKey;

use crate::consts::CAP_WHEEL_CACHE;
use crate::core::Message;
use crate::mailbox::Mailbox;
use crate::timer::TimerRef;
use crate::timer::state::TimerFlag;

// -----------------------------------------------------------------------------
// Signals
// -----------------------------------------------------------------------------

/// Control messages accepted by a wheel worker.
pub(crate) enum Signal {
  Init(InitTimer),
  Reset(ResetTimer),
  Read(ReadTimer),
  Stop(StopTimer),
  Quit,
}

pub(crate) struct InitTimer {
  pub(crate) tref: TimerRef,
  pub(crate) mailbox: Mailbox,
  pub(crate) message: Message,
  pub(crate) delay: Duration,
  pub(crate) flag: TimerFlag,
}

pub(crate) struct ResetTimer {
  pub(crate) tref: TimerRef,
  pub(crate) reply: Reply,
}

pub(crate) struct ReadTimer {
  pub(crate) tref: TimerRef,
  pub(crate) ack: AckSender<Option<Duration>>,
}

pub(crate) struct StopTimer {
  pub(crate) tref: TimerRef,
  pub(crate) reply: Reply,
}

/// How a worker should acknowledge a reset or stop.
pub(crate) enum Reply {
  /// Fire-and-forget; the caller does not wait.
  None,
  /// Report the time that remained, or `None` if the timer was gone.
  Ack(AckSender<Option<Duration>>),
}

impl Reply {
  fn send(self, info: Option<Duration>) {
    if let Self::Ack(ack) = self {
      // The caller may have dropped the receiving half.
      let _: Result<(), _> = ack.send(info);
    }
  }
}

// -----------------------------------------------------------------------------
// Timer Entry
// -----------------------------------------------------------------------------

struct TimerEntry {
  mailbox: Mailbox,
  message: Message,
  delay: Duration,
  ends: Instant,
  qkey: QueueKey,
  flag: TimerFlag,
}

impl TimerEntry {
  #[inline]
  fn remaining(&self) -> Option<Duration> {
    self.ends.checked_duration_since(Instant::now())
  }
}

// -----------------------------------------------------------------------------
// Wheel Worker
// -----------------------------------------------------------------------------

pub(crate) struct WheelWorker {
  id: usize,
  queue: DelayQueue<TimerRef>,
  cache: HashMap<TimerRef, TimerEntry>,
}

impl WheelWorker {
  fn new(id: usize) -> Self {
    Self {
      id,
      queue: DelayQueue::with_capacity(CAP_WHEEL_CACHE),
      cache: HashMap::with_capacity(CAP_WHEEL_CACHE),
    }
  }

  /// Main loop of a single wheel worker task.
  pub(crate) async fn task(id: usize, mut signals: UnboundedReceiver<Signal>) {
    let mut this: Self = Self::new(id);

    tracing::trace!(wheel = this.id, "wheel worker online");

    'work: loop {
      tokio::select! {
        biased;
        Some(expired) = NextExpired(&mut this.queue), if !this.queue.is_empty() => {
          this.on_expired(expired);
        }
        signal = signals.recv() => match signal {
          Some(Signal::Init(signal)) => this.on_init(signal),
          Some(Signal::Reset(signal)) => this.on_reset(signal),
          Some(Signal::Read(signal)) => this.on_read(signal),
          Some(Signal::Stop(signal)) => this.on_stop(signal),
          Some(Signal::Quit) | None => break 'work this.on_quit(),
        },
      }
    }

    tracing::trace!(wheel = id, "wheel worker offline");
  }

  fn on_expired(&mut self, expired: Expired<TimerRef>) {
    let tref: TimerRef = expired.into_inner();

    let Some(entry) = self.cache.remove(&tref) else {
      tracing::error!(wheel = self.id, %tref, "expired timer missing from cache");
      return;
    };

    // A cancel that won the race owns the terminal state; drop silently.
    if !entry.flag.fire() {
      return;
    }

    match entry.mailbox.send(entry.message) {
      Ok(()) => {
        tracing::trace!(wheel = self.id, %tref, "timer fired");
      }
      Err(error) => {
        // Delivery into a closed or full mailbox is not an error of the
        // wheel; the timer still counts as fired.
        tracing::debug!(wheel = self.id, %tref, %error, "timer message dropped");
      }
    }
  }

  fn on_init(&mut self, signal: InitTimer) {
    let ends: Instant = Instant::now() + signal.delay;
    let qkey: QueueKey = self.queue.insert_at(signal.tref, ends);

    tracing::trace!(
      wheel = self.id,
      tref = %signal.tref,
      delay = ?signal.delay,
      "timer armed"
    );

    self.cache.insert(signal.tref, TimerEntry {
      mailbox: signal.mailbox,
      message: signal.message,
      delay: signal.delay,
      ends,
      qkey,
      flag: signal.flag,
    });
  }

  fn on_reset(&mut self, signal: ResetTimer) {
    let info: Option<Duration> = match self.cache.get_mut(&signal.tref) {
      Some(entry) => {
        let prior: Option<Duration> = entry.remaining();

        entry.ends = Instant::now() + entry.delay;

        self.queue.reset_at(&entry.qkey, entry.ends);

        tracing::trace!(wheel = self.id, tref = %signal.tref, "timer reset");

        prior
      }
      None => None,
    };

    signal.reply.send(info);
  }

  fn on_read(&mut self, signal: ReadTimer) {
    let info: Option<Duration> = self
      .cache
      .get(&signal.tref)
      .and_then(TimerEntry::remaining);

    let _: Result<(), _> = signal.ack.send(info);
  }

  fn on_stop(&mut self, signal: StopTimer) {
    let info: Option<Duration> = match self.cache.remove(&signal.tref) {
      Some(entry) => {
        // Expiry polling is biased ahead of signals, so a due timer has
        // already fired and left the cache; this transition succeeds.
        let cancelled: bool = entry.flag.cancel();

        self.queue.remove(&entry.qkey);

        tracing::trace!(wheel = self.id, tref = %signal.tref, cancelled, "timer stopped");

        entry.remaining()
      }
      None => None,
    };

    signal.reply.send(info);
  }

  fn on_quit(&mut self) {
    let outstanding: usize = self.cache.len();

    for (_, entry) in self.cache.drain() {
      if entry.flag.cancel() {
        self.queue.remove(&entry.qkey);
      }
    }

    tracing::debug!(wheel = self.id, outstanding, "wheel worker quitting");
  }
}

// -----------------------------------------------------------------------------
// Next Expired
// -----------------------------------------------------------------------------

/// Adapter exposing [`DelayQueue::poll_expired`] as a future.
#[repr(transparent)]
struct NextExpired<'a, T>(&'a mut DelayQueue<T>);

impl<T> Future for NextExpired<'_, T> {
  type Output = Option<Expired<T>>;

  #[inline]
  fn poll(mut self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
    self.0.poll_expired(context)
  }
}
