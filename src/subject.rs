//! Subjects: Observables fed from the outside that multicast to every
//! subscriber.
//!
//! A subject is not a separate type. The constructors return a plain
//! [`Observable`] that is already multicast and, for the behavior and replay
//! variants, already holds its ring buffer. Feed it with
//! [`next`](Observable::next), [`error`](Observable::error) and
//! [`complete`](Observable::complete).

use crate::{config::Config, event::Payload, observable::Observable};

mod behavior_subject;
mod replay_subject;

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// A multicast Observable with no replay.
  pub fn subject() -> Self { Self::subject_with_config(Config::default()) }

  pub fn subject_with_config(config: Config) -> Self {
    let subject = Self::with_config(config);
    subject.multicast();
    subject
  }
}
