use crate::{event::Payload, observable::Observable, ops::Step};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Sends the values returned by `seeds` to every new subscription, before
  /// replay and live values. `seeds` runs once per subscription.
  pub fn start_with<F, I>(&self, mut seeds: F) -> &Self
  where
    F: FnMut() -> I + Send + 'static,
    I: IntoIterator<Item = Item>,
  {
    let seed = move || -> Vec<Item> { seeds().into_iter().collect() };
    self.configure(move |core| core.pipeline.push(Step::StartWith(Box::new(seed))))
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use tokio::time::timeout;

  use crate::prelude::*;

  #[tokio::test]
  async fn every_subscription_is_seeded() {
    let source = Observable::<i32, ()>::subject();
    source.start_with(|| [1, 2]);

    let (first, first_events) = Observer::new();
    source.subscribe(&first);
    source.next(3).await.unwrap();

    let (second, second_events) = Observer::new();
    source.subscribe(&second);
    source.next(4).await.unwrap();
    source.complete().unwrap();

    let wait = Duration::from_secs(5);
    assert_eq!(timeout(wait, first_events.values()).await.unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(timeout(wait, second_events.values()).await.unwrap(), vec![1, 2, 4]);
  }

  #[tokio::test]
  async fn seeds_come_before_replay() {
    let source = Observable::<i32, ()>::behavior_subject(10);
    source.start_with(|| [0]);
    let (observer, events) = Observer::new();
    source.subscribe(&observer);
    source.complete().unwrap();

    let values = timeout(Duration::from_secs(5), events.values()).await.unwrap();
    assert_eq!(values, vec![0, 10]);
  }

  #[tokio::test]
  async fn seeds_bypass_the_pipeline() {
    let source = Observable::<i32, ()>::new();
    source.start_with(|| [5]).map(|v| v * 100);
    let (observer, events) = Observer::new();
    source.subscribe(&observer);
    source.next(1).await.unwrap();
    source.complete().unwrap();

    let values = timeout(Duration::from_secs(5), events.values()).await.unwrap();
    assert_eq!(values, vec![5, 100]);
  }

  #[tokio::test]
  async fn seeds_are_produced_per_subscription() {
    let source = Observable::<usize, ()>::subject();
    let mut calls = 0;
    source.start_with(move || {
      calls += 1;
      vec![calls; calls]
    });

    let (first, first_events) = Observer::new();
    let (second, second_events) = Observer::new();
    source.subscribe(&first).subscribe(&second);
    source.complete().unwrap();

    let wait = Duration::from_secs(5);
    assert_eq!(timeout(wait, first_events.values()).await.unwrap(), vec![1]);
    assert_eq!(timeout(wait, second_events.values()).await.unwrap(), vec![2, 2]);
  }
}
