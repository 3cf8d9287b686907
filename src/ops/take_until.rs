use crate::{
  event::{Event, Payload},
  observable::{Observable, Origin},
  observer::Observer,
};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Completes this Observable as soon as `notifier` emits anything:
  /// a value, an error or a completion.
  ///
  /// The notifier is watched through a throwaway subscription which is
  /// abandoned after the first event, or when this Observable finalizes.
  pub fn take_until<N, E>(&self, notifier: &Observable<N, E>) -> &Self
  where
    N: Payload,
    E: Payload,
  {
    let (watcher, mut events) = Observer::<N, E>::channel(1);
    notifier.subscribe(&watcher);
    // Not a handle: the watch alone must not keep `self` alive.
    let target = self.shared.clone();
    tokio::spawn(async move {
      tokio::select! {
        event = events.recv() => {
          if event.is_some() {
            tracing::debug!(observable = %target.id, "take_until notifier fired");
            let _ = target.inbox.post_event(Origin::Own, Event::Complete(target.id));
          }
        }
        _ = target.finalized() => {}
      }
    });
    self
  }
}
