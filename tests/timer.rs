// -----------------------------------------------------------------------------
// Deferred Send Behavior
// -----------------------------------------------------------------------------

use postbox::core::Match;
use postbox::core::Message;
use postbox::core::Pattern;
use postbox::error::ReceiveError;
use postbox::error::TimerError;
use postbox::mailbox::Mailbox;
use postbox::timer::TimerHandle;
use postbox::timer::TimerState;
use postbox::timer::TimerWheel;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_timer_fires_and_delivers() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_millis(100),
    &mailbox,
    Message::tagged("tick", 1_u32),
  );

  let found: Match = mailbox.receive(&[Pattern::shape("tick", 1)]).await.unwrap();

  assert_eq!(found.capture_ref::<u32>(0), Some(&1));
  assert_eq!(timer.state(), TimerState::Fired);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_delivery() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_millis(100),
    &mailbox,
    Message::value("tick"),
  );

  let info: Option<Duration> = timer.cancel_wait().await.unwrap();

  assert!(info.is_some());
  assert_eq!(timer.state(), TimerState::Cancelled);

  let result: Result<Match, ReceiveError> = mailbox
    .receive_timeout(&[Pattern::any()], Duration::from_millis(500))
    .await;

  assert_eq!(result.unwrap_err(), ReceiveError::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_control_after_fire_is_an_error() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_millis(10),
    &mailbox,
    Message::value("tick"),
  );

  mailbox.receive(&[Pattern::any()]).await.unwrap();

  assert_eq!(timer.state(), TimerState::Fired);
  assert_eq!(timer.cancel().unwrap_err(), TimerError::AlreadyFired);
  assert_eq!(timer.reset().unwrap_err(), TimerError::AlreadyFired);
}

#[tokio::test(start_paused = true)]
async fn test_control_after_cancel_is_an_error() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_millis(100),
    &mailbox,
    Message::value("tick"),
  );

  timer.cancel_wait().await.unwrap();

  assert_eq!(timer.cancel().unwrap_err(), TimerError::AlreadyCancelled);
  assert_eq!(timer.reset().unwrap_err(), TimerError::AlreadyCancelled);
}

#[tokio::test(start_paused = true)]
async fn test_reset_restarts_the_full_delay() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_millis(100),
    &mailbox,
    Message::value("tick"),
  );

  tokio::time::sleep(Duration::from_millis(60)).await;

  let info: Option<Duration> = timer.reset_wait().await.unwrap();

  assert!(info.unwrap() <= Duration::from_millis(40));

  // Without the reset the timer would fire at the original deadline.
  let result: Result<Match, ReceiveError> = mailbox
    .receive_timeout(&[Pattern::any()], Duration::from_millis(90))
    .await;

  assert_eq!(result.unwrap_err(), ReceiveError::TimedOut);

  // The restarted delay still elapses in full.
  mailbox.receive(&[Pattern::any()]).await.unwrap();

  assert_eq!(timer.state(), TimerState::Fired);
}

#[tokio::test(start_paused = true)]
async fn test_remaining_reports_time_left() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_millis(100),
    &mailbox,
    Message::value("tick"),
  );

  let info: Option<Duration> = timer.remaining().await.unwrap();

  assert!(info.unwrap() <= Duration::from_millis(100));

  mailbox.receive(&[Pattern::any()]).await.unwrap();

  // A fired timer has nothing left to report.
  assert_eq!(timer.remaining().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_delivery_into_closed_mailbox_is_dropped() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_millis(10),
    &mailbox,
    Message::value("tick"),
  );

  mailbox.close();

  tokio::time::sleep(Duration::from_millis(20)).await;

  // The refused delivery still counts as a fire.
  assert_eq!(timer.state(), TimerState::Fired);
  assert!(mailbox.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_outstanding_timers() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::new();

  let timer: TimerHandle = wheel.send_after(
    Duration::from_secs(10),
    &mailbox,
    Message::value("tick"),
  );

  wheel.shutdown().await;

  assert_eq!(timer.state(), TimerState::Cancelled);
  assert_eq!(timer.cancel().unwrap_err(), TimerError::AlreadyCancelled);

  let result: Result<Match, ReceiveError> = mailbox
    .receive_timeout(&[Pattern::any()], Duration::from_millis(100))
    .await;

  assert_eq!(result.unwrap_err(), ReceiveError::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_timers_partition_across_workers() {
  let mailbox: Mailbox = Mailbox::new();
  let wheel: TimerWheel = TimerWheel::with_workers(4);

  for index in 0..8_u64 {
    let _: TimerHandle = wheel.send_after(
      Duration::from_millis(10 + index),
      &mailbox,
      Message::value(index),
    );
  }

  let mut seen: Vec<u64> = Vec::new();

  for _ in 0..8 {
    let found: Match = mailbox.receive(&[Pattern::of::<u64>()]).await.unwrap();

    seen.push(*found.capture_ref::<u64>(0).unwrap());
  }

  seen.sort_unstable();

  assert_eq!(seen, (0..8).collect::<Vec<u64>>());
}
