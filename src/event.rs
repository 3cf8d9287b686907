//! Events and the identities that travel with them.

use std::{
  fmt,
  sync::atomic::{AtomicU64, Ordering},
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 { NEXT_ID.fetch_add(1, Ordering::Relaxed) }

/// Identity of an Observable.
///
/// Carried by [`Event::Complete`] so a receiver can tell its own completion
/// apart from the completion of an upstream it is piped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
  pub(crate) fn next() -> Self { Self(next_id()) }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "obs#{}", self.0) }
}

/// Identity of an event sink ([`Observer`](crate::observer::Observer)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
  pub(crate) fn next() -> Self { Self(next_id()) }
}

impl fmt::Display for SinkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "sink#{}", self.0) }
}

/// A single notification pushed through a stream.
///
/// `Error` and `Complete` are terminal: a sink delivers at most one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<Item, Err> {
  Next(Item),
  Error(Err),
  Complete(SourceId),
}

impl<Item, Err> Event<Item, Err> {
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Event::Next(_)) }

  /// The carried value, if this is a `Next`.
  pub fn into_next(self) -> Option<Item> {
    match self {
      Event::Next(v) => Some(v),
      _ => None,
    }
  }
}

/// Bound shared by every payload carried through an Observable.
///
/// Values are cloned once per subscriber on fan-out and cross task
/// boundaries, hence `Clone + Send + 'static`.
pub trait Payload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Payload for T {}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn ids_are_unique() {
    let a = SourceId::next();
    let b = SourceId::next();
    assert_ne!(a, b);
    assert_ne!(SinkId::next(), SinkId::next());
  }

  #[test]
  fn terminal_classification() {
    let id = SourceId::next();
    assert!(!Event::<i32, ()>::Next(1).is_terminal());
    assert!(Event::<i32, ()>::Error(()).is_terminal());
    assert!(Event::<i32, ()>::Complete(id).is_terminal());
    assert_eq!(Event::<i32, ()>::Next(7).into_next(), Some(7));
    assert_eq!(Event::<i32, ()>::Complete(id).into_next(), None);
  }
}
