//! Composition: `pipe` and `merge`.
//!
//! Piping `source` into `target` subscribes a *port* to `source`. The port
//! forwards every event into `target`'s inbox, tagged with the producer
//! generation `target` had at the time. `target` keeps the link in its pipe
//! set so that tearing it down also unsubscribes `source`.

use crate::{
  event::Payload,
  observable::{Observable, Pipe, State},
  observer::Observer,
};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Forwards every event of `self` into `target` and records `self` in
  /// `target`'s pipe set. Piping the same source twice, or into a target
  /// that is tearing down, does nothing.
  ///
  /// Returns `self`, the source.
  pub fn pipe(&self, target: &Observable<Item, Err>) -> &Self {
    if target.is_tearing_down() {
      return self;
    }
    let port = Observer::port(target.shared.inbox.clone(), target.generation());
    if !target.shared.insert_pipe(Pipe { source: self.clone(), port: port.clone() }) {
      return self;
    }
    self.subscribe(&port);

    // The target may have torn down its pipes between the check and the insert.
    if target.is_tearing_down() {
      if let Some(Pipe { source, port }) = target.shared.remove_pipe(self.id()) {
        port.release();
        source.unsubscribe(&port);
      }
    }
    self
  }

  /// Merges `other` into `self`.
  ///
  /// `other` becomes multicast and is piped into `self`. A merging
  /// Observable only completes once every merged arm has completed; values
  /// from different arms interleave in arrival order.
  ///
  /// ```rust
  /// # #[tokio::main(flavor = "current_thread")]
  /// # async fn main() {
  /// use rxloop::prelude::*;
  ///
  /// let merged = Observable::<i32, ()>::new();
  /// merged.merge(&Observable::from_iter([1, 2])).merge(&Observable::from_iter([3]));
  /// let (observer, events) = Observer::new();
  /// merged.subscribe(&observer);
  ///
  /// let mut values = events.values().await;
  /// values.sort();
  /// assert_eq!(values, vec![1, 2, 3]);
  /// # }
  /// ```
  pub fn merge(&self, other: &Observable<Item, Err>) -> &Self {
    other.multicast();
    self.configure(|core| core.modes.merging = true);
    other.pipe(self);
    self
  }

  fn is_tearing_down(&self) -> bool { matches!(self.state(), State::Completing | State::Finalized) }
}
