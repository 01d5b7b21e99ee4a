//! Ordered pending-message queue with clause-driven removal.

use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::consts::CAP_MAILBOX_BUFFER;
use crate::core::Match;
use crate::core::Message;
use crate::core::Pattern;
use crate::core::Term;

// -----------------------------------------------------------------------------
// Message Queue
// -----------------------------------------------------------------------------

/// The pending sequence of a mailbox.
///
/// Insertion order is delivery order: messages are appended at the tail
/// and removed only by a matching scan. A message skipped by one scan
/// stays in place, preserving its position for later scans.
pub(crate) struct MsgQueue {
  pending: Vec<Message>,
}

impl MsgQueue {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      pending: Vec::with_capacity(CAP_MAILBOX_BUFFER),
    }
  }

  /// Appends a message at the tail of the pending sequence.
  #[inline]
  pub(crate) fn push(&mut self, message: Message) {
    self.pending.push(message);
  }

  /// Scans for the earliest pending message matching any clause.
  ///
  /// Scanning starts at `*marker`, the position up to which an earlier
  /// scan with the same clause set already rejected every message. On a
  /// match the message is removed, the marker resets, and the bound
  /// [`Match`] is returned. Otherwise the marker advances to the queue
  /// tail so the next scan with these clauses only inspects new
  /// arrivals.
  ///
  /// Per message, clauses are tried in the order given: the earliest
  /// message wins regardless of which clause matched it, and the
  /// first-listed clause that matches supplies the decomposition.
  pub(crate) fn scan(&mut self, patterns: &[Pattern], marker: &mut usize) -> Option<Match> {
    // Another cursor may have shrunk the queue since the marker was set.
    let start: usize = (*marker).min(self.pending.len());

    for index in start..self.pending.len() {
      if let Some((clause, captures)) = test_clauses(patterns, &self.pending[index]) {
        *marker = 0;
        return Some(Match::new(self.pending.remove(index), clause, captures));
      }
    }

    *marker = self.pending.len();

    None
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.pending.len()
  }
}

impl Debug for MsgQueue {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("MsgQueue ")?;
    f.debug_list().entries(self.pending.iter()).finish()
  }
}

fn test_clauses(patterns: &[Pattern], message: &Message) -> Option<(usize, Vec<Term>)> {
  patterns
    .iter()
    .enumerate()
    .find_map(|(clause, pattern)| pattern.matches(message).map(|captures| (clause, captures)))
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Match;
  use crate::core::Message;
  use crate::core::Pattern;
  use crate::mailbox::msg_queue::MsgQueue;

  fn drain_order(queue: &mut MsgQueue) -> Vec<i32> {
    let mut marker: usize = 0;
    let mut order: Vec<i32> = Vec::new();

    while let Some(found) = queue.scan(&[Pattern::any()], &mut marker) {
      order.push(*found.message().as_value().unwrap().downcast_ref().unwrap());
    }

    order
  }

  #[test]
  fn test_fifo_order() {
    let mut queue: MsgQueue = MsgQueue::new();

    for value in [1, 2, 3, 4] {
      queue.push(Message::value(value));
    }

    assert_eq!(drain_order(&mut queue), vec![1, 2, 3, 4]);
  }

  #[test]
  fn test_skip_preserves_position() {
    let mut queue: MsgQueue = MsgQueue::new();

    queue.push(Message::value("a"));
    queue.push(Message::value(1_i32));

    let mut marker: usize = 0;
    let found: Match = queue.scan(&[Pattern::of::<i32>()], &mut marker).unwrap();

    assert_eq!(found.capture_ref::<i32>(0), Some(&1));
    assert_eq!(queue.len(), 1);

    // The skipped message is still matchable by a later clause set.
    let mut marker: usize = 0;
    let found: Match = queue.scan(&[Pattern::value("a")], &mut marker).unwrap();

    assert_eq!(found.clause(), 0);
    assert_eq!(queue.len(), 0);
  }

  #[test]
  fn test_earliest_message_wins_over_clause_order() {
    let mut queue: MsgQueue = MsgQueue::new();

    queue.push(Message::value("b"));
    queue.push(Message::value("a"));

    // "a" is the first-listed clause, but "b" is the earlier message.
    let mut marker: usize = 0;
    let found: Match = queue
      .scan(&[Pattern::value("a"), Pattern::value("b")], &mut marker)
      .unwrap();

    assert_eq!(found.clause(), 1);
    assert_eq!(found.message().as_value().unwrap().downcast_ref::<&str>(), Some(&"b"));
  }

  #[test]
  fn test_first_listed_clause_decomposes_ties() {
    let mut queue: MsgQueue = MsgQueue::new();

    queue.push(Message::value(5_i32));

    let mut marker: usize = 0;
    let found: Match = queue
      .scan(&[Pattern::of::<i32>(), Pattern::value(5_i32)], &mut marker)
      .unwrap();

    // Both clauses match; the first-listed one binds the captures.
    assert_eq!(found.clause(), 0);
    assert_eq!(found.capture_ref::<i32>(0), Some(&5));
  }

  #[test]
  fn test_marker_advances_and_resets() {
    let mut queue: MsgQueue = MsgQueue::new();
    let mut marker: usize = 0;

    queue.push(Message::value("a"));

    assert!(queue.scan(&[Pattern::of::<i32>()], &mut marker).is_none());
    assert_eq!(marker, 1);

    queue.push(Message::value(9_i32));

    assert!(queue.scan(&[Pattern::of::<i32>()], &mut marker).is_some());
    assert_eq!(marker, 0);
    assert_eq!(queue.len(), 1);
  }
}
