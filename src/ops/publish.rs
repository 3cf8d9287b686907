use crate::{
  event::Payload,
  observable::{Message, Observable, State},
};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Defers activation: subscriptions are queued, not wired, and the
  /// producer's connect gate stays shut until [`connect`](Self::connect).
  /// Publishing does not imply multicast: on a unicast Observable the last
  /// queued subscription wins at connect.
  pub fn publish(&self) -> &Self {
    self.configure(|core| {
      core.modes.publish = true;
      core.shared.set_state(State::Gating);
    })
  }

  /// Wires every queued subscription at once and opens the connect gate.
  pub fn connect(&self) -> &Self {
    let _ = self.shared.inbox.post(Message::Connect);
    self
  }
}
