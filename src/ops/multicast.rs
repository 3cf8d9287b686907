use crate::{event::Payload, observable::Observable};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Keeps every subscriber. Without it a new subscription completes and
  /// replaces the current one.
  pub fn multicast(&self) -> &Self { self.configure(|core| core.modes.multicast = true) }

  /// Multicast that outlives its audience: upstream completions are ignored
  /// while subscribers remain, and losing the last subscriber does not
  /// finalize the Observable. Only self-completion, an error, or an
  /// upstream completion with nobody subscribed ends it.
  pub fn share(&self) -> &Self {
    self.configure(|core| {
      core.modes.multicast = true;
      core.modes.share = true;
    })
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use tokio::time::timeout;

  use crate::prelude::*;

  const WAIT: Duration = Duration::from_secs(5);

  #[tokio::test]
  async fn multicast_keeps_everyone() {
    let source = Observable::<i32, ()>::new();
    source.multicast();
    let (a, a_events) = Observer::new();
    let (b, b_events) = Observer::new();
    source.subscribe(&a).subscribe(&b);

    source.next(1).await.unwrap();
    source.complete().unwrap();
    assert_eq!(timeout(WAIT, a_events.values()).await.unwrap(), vec![1]);
    assert_eq!(timeout(WAIT, b_events.values()).await.unwrap(), vec![1]);
  }

  #[tokio::test]
  async fn shared_survives_last_unsubscribe() {
    let source = Observable::<i32, ()>::new();
    source.share();
    let (a, a_events) = Observer::new();
    source.subscribe(&a);
    source.unsubscribe(&a);
    assert_eq!(timeout(WAIT, a_events.drain()).await.unwrap(), vec![Event::Complete(source.id())]);

    let (b, b_events) = Observer::new();
    source.subscribe(&b);
    source.next(2).await.unwrap();
    source.complete().unwrap();
    assert_eq!(timeout(WAIT, b_events.values()).await.unwrap(), vec![2]);
    assert_eq!(source.unsubscribe_count(), 1);
  }

  #[tokio::test]
  async fn shared_ignores_upstream_completion_while_watched() {
    let upstream = Observable::<i32, ()>::new();
    let shared = Observable::<i32, ()>::new();
    shared.share();
    let (observer, mut events) = Observer::new();
    shared.subscribe(&observer);
    upstream.pipe(&shared);

    upstream.next(1).await.unwrap();
    upstream.complete().unwrap();
    assert_eq!(timeout(WAIT, events.recv()).await.unwrap(), Some(Event::Next(1)));
    timeout(WAIT, upstream.finalized()).await.unwrap();

    shared.next(2).await.unwrap();
    assert_eq!(timeout(WAIT, events.recv()).await.unwrap(), Some(Event::Next(2)));
    assert_eq!(shared.state(), State::Hot);
  }

  #[tokio::test]
  async fn non_shared_finalizes_on_last_unsubscribe() {
    let source = Observable::<i32, ()>::subject();
    let (a, _a_events) = Observer::new();
    let (b, _b_events) = Observer::new();
    source.subscribe(&a).subscribe(&b);
    source.unsubscribe(&a);
    source.next(1).await.unwrap();
    assert_ne!(source.state(), State::Finalized);

    source.unsubscribe(&b);
    timeout(WAIT, source.finalized()).await.unwrap();
    assert_eq!(source.unsubscribe_count(), 2);
  }
}
