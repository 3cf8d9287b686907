use crate::{event::Payload, observable::Observable, ops::take::Limit};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Emits values while `predicate` holds. The first value failing it is
  /// still delivered, then the Observable completes.
  pub fn take_while<F>(&self, predicate: F) -> &Self
  where
    F: FnMut(&Item) -> bool + Send + 'static,
  {
    self.configure(move |core| core.limit = Some(Limit::While(Box::new(predicate))))
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use tokio::time::timeout;

  use crate::prelude::*;

  #[tokio::test]
  async fn base_function() {
    let source = Observable::<i32, ()>::from_iter(0..100);
    let (observer, events) = Observer::new();
    source.take_while(|v| *v < 4).subscribe(&observer);

    let events = timeout(Duration::from_secs(5), events.drain()).await.unwrap();
    assert_eq!(
      events,
      vec![
        Event::Next(0),
        Event::Next(1),
        Event::Next(2),
        Event::Next(3),
        Event::Next(4),
        Event::Complete(source.id())
      ]
    );
  }

  #[tokio::test]
  async fn sees_transformed_values() {
    let source = Observable::<i32, ()>::from_iter([1, 2, 3, 4]);
    let (observer, events) = Observer::new();
    source.map(|v| v * 10).take_while(|v| *v <= 20).subscribe(&observer);

    let values = timeout(Duration::from_secs(5), events.values()).await.unwrap();
    assert_eq!(values, vec![10, 20, 30]);
  }
}
