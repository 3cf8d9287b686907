use crate::{event::Payload, observable::Observable};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Emits every value of `values` once connected, then completes.
  ///
  /// The values are collected up front, so `values` must be finite.
  #[allow(clippy::should_implement_trait)]
  pub fn from_iter<I>(values: I) -> Self
  where
    I: IntoIterator<Item = Item>,
  {
    let values: Vec<Item> = values.into_iter().collect();
    Self::create(move |observable| async move {
      for value in values {
        observable.next(value).await?;
      }
      // Let the loop hand out the last values before completing.
      tokio::task::yield_now().await;
      observable.complete()
    })
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use tokio::time::timeout;

  use crate::prelude::*;

  #[tokio::test]
  async fn emits_then_completes() {
    let source = Observable::<char, ()>::from_iter("abc".chars());
    let (observer, events) = Observer::new();
    source.subscribe(&observer);

    let events = timeout(Duration::from_secs(5), events.drain()).await.unwrap();
    assert_eq!(
      events,
      vec![Event::Next('a'), Event::Next('b'), Event::Next('c'), Event::Complete(source.id())]
    );
  }

  #[tokio::test]
  async fn empty_source_only_completes() {
    let source = Observable::<i32, ()>::from_iter(Vec::new());
    let (observer, events) = Observer::new();
    source.subscribe(&observer);
    let events = timeout(Duration::from_secs(5), events.drain()).await.unwrap();
    assert_eq!(events, vec![Event::Complete(source.id())]);
  }

  #[tokio::test]
  async fn more_values_than_the_queues_hold() {
    let source = Observable::<u32, ()>::from_iter(0..200);
    let (observer, events) = Observer::channel(2);
    source.subscribe(&observer);
    let values = timeout(Duration::from_secs(5), events.values()).await.unwrap();
    assert_eq!(values, (0..200).collect::<Vec<_>>());
  }
}
