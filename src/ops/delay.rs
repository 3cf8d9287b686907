use std::time::Duration;

use crate::{event::Payload, observable::Observable, ops::Step};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Holds every value for `duration` before it moves on.
  ///
  /// The wait happens on the control loop itself: while a value is held, no
  /// other message of this Observable is processed. The delay therefore
  /// throttles the whole stream rather than shifting each value in time.
  pub fn delay(&self, duration: Duration) -> &Self {
    self.configure(move |core| core.pipeline.push(Step::Delay(duration)))
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use tokio::time::{timeout, Instant};

  use crate::prelude::*;

  #[tokio::test]
  async fn throttles_the_loop() {
    let source = Observable::<i32, ()>::new();
    let (observer, events) = Observer::new();
    source.delay(Duration::from_millis(20)).subscribe(&observer);

    let started = Instant::now();
    for v in 0..3 {
      source.next(v).await.unwrap();
    }
    source.complete().unwrap();

    let values = timeout(Duration::from_secs(5), events.values()).await.unwrap();
    assert_eq!(values, vec![0, 1, 2]);
    assert!(started.elapsed() >= Duration::from_millis(60));
  }

  #[tokio::test]
  async fn filtered_values_are_not_delayed() {
    let source = Observable::<i32, ()>::new();
    let (observer, events) = Observer::new();
    source.filter(|v| *v == 0).delay(Duration::from_millis(200)).subscribe(&observer);

    let started = Instant::now();
    for v in 1..4 {
      source.next(v).await.unwrap();
    }
    source.complete().unwrap();

    assert!(timeout(Duration::from_secs(5), events.values()).await.unwrap().is_empty());
    assert!(started.elapsed() < Duration::from_millis(200));
  }
}
