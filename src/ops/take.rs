use crate::{event::Payload, observable::Observable};

/// Stop condition evaluated on the `Next` path of the control loop.
pub(crate) enum Limit<Item> {
  /// Values still to emit. Every value leaving the pipeline counts, with or
  /// without subscribers.
  Count(usize),
  /// Completes after the first value failing the predicate.
  While(Box<dyn FnMut(&Item) -> bool + Send>),
}

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Emits only the first `count` values, then completes.
  ///
  /// After the last value the control loop yields once, so a consumer can
  /// pick it up, then self-completes. Later values from the producer are
  /// never delivered.
  ///
  /// ```rust
  /// # #[tokio::main(flavor = "current_thread")]
  /// # async fn main() {
  /// use rxloop::prelude::*;
  ///
  /// let source = Observable::<usize, ()>::interval(std::time::Duration::from_millis(1));
  /// let (observer, events) = Observer::new();
  /// source.take(5).subscribe(&observer);
  /// assert_eq!(events.values().await, vec![0, 1, 2, 3, 4]);
  /// # }
  /// ```
  pub fn take(&self, count: usize) -> &Self {
    self.configure(move |core| core.limit = Some(Limit::Count(count)));
    if count == 0 {
      let _ = self.complete();
    }
    self
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use tokio::time::timeout;

  use crate::prelude::*;

  const WAIT: Duration = Duration::from_secs(5);

  #[tokio::test]
  async fn base_function() {
    let source = Observable::<i32, ()>::from_iter(0..100);
    let (observer, events) = Observer::new();
    source.take(5).subscribe(&observer);

    let events = timeout(WAIT, events.drain()).await.unwrap();
    let (values, terminal) = events.split_at(5);
    assert_eq!(values, &[Event::Next(0), Event::Next(1), Event::Next(2), Event::Next(3), Event::Next(4)]);
    assert_eq!(terminal, &[Event::Complete(source.id())]);
  }

  #[tokio::test]
  async fn take_more_than_available() {
    let source = Observable::<i32, ()>::from_iter(0..3);
    let (observer, events) = Observer::new();
    source.take(10).subscribe(&observer);
    assert_eq!(timeout(WAIT, events.values()).await.unwrap(), vec![0, 1, 2]);
  }

  #[tokio::test]
  async fn take_zero_completes_at_once() {
    let source = Observable::<i32, ()>::from_iter(0..3);
    let (observer, events) = Observer::new();
    source.take(0).subscribe(&observer);

    let events = timeout(WAIT, events.drain()).await.unwrap();
    assert_eq!(events, vec![Event::Complete(source.id())]);
  }

  #[tokio::test]
  async fn values_count_without_subscribers() {
    let source = Observable::<i32, ()>::subject();
    source.take(2);
    source.next(1).await.unwrap();
    source.next(2).await.unwrap();
    timeout(WAIT, source.finalized()).await.unwrap();

    let (observer, events) = Observer::new();
    source.subscribe(&observer);
    assert_eq!(timeout(WAIT, events.drain()).await.unwrap(), vec![Event::Complete(source.id())]);
  }

  #[tokio::test]
  async fn filtered_values_do_not_count() {
    let source = Observable::<i32, ()>::from_iter(0..10);
    let (observer, events) = Observer::new();
    source.filter(|v| v % 3 == 0).take(2).subscribe(&observer);
    assert_eq!(timeout(WAIT, events.values()).await.unwrap(), vec![0, 3]);
  }

  #[tokio::test]
  async fn infinite_producer_stops() {
    let source = Observable::<usize, ()>::interval(Duration::from_millis(1));
    let (observer, events) = Observer::new();
    source.take(5).subscribe(&observer);

    let events = timeout(WAIT, events.drain()).await.unwrap();
    assert_eq!(events.iter().filter(|e| matches!(e, Event::Next(_))).count(), 5);
    assert_eq!(events.last(), Some(&Event::Complete(source.id())));
    assert!(!events.iter().any(|e| matches!(e, Event::Error(_))));
    timeout(WAIT, source.finalized()).await.unwrap();
  }
}
