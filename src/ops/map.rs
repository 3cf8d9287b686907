use crate::{event::Payload, observable::Observable, ops::Step};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Transforms every value with `f`.
  ///
  /// ```rust
  /// # #[tokio::main(flavor = "current_thread")]
  /// # async fn main() {
  /// use rxloop::prelude::*;
  ///
  /// let source = Observable::<i32, ()>::from_iter(1..=3);
  /// let (observer, events) = Observer::new();
  /// source.map(|v| v * v).subscribe(&observer);
  /// assert_eq!(events.values().await, vec![1, 4, 9]);
  /// # }
  /// ```
  pub fn map<F>(&self, mut f: F) -> &Self
  where
    F: FnMut(Item) -> Item + Send + 'static,
  {
    self.configure(move |core| core.pipeline.push(Step::Map(Box::new(move |v| Some(f(v))))))
  }

  /// Transforms every value with `f`, dropping those mapped to `None`.
  pub fn filter_map<F>(&self, f: F) -> &Self
  where
    F: FnMut(Item) -> Option<Item> + Send + 'static,
  {
    self.configure(move |core| core.pipeline.push(Step::Map(Box::new(f))))
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use tokio::time::timeout;

  use crate::prelude::*;

  #[tokio::test]
  async fn primitive_type() {
    let source = Observable::<i32, ()>::new();
    let (observer, events) = Observer::new();
    source.map(|v| v * 2).subscribe(&observer);

    for v in 1..=3 {
      source.next(v).await.unwrap();
    }
    source.complete().unwrap();
    assert_eq!(timeout(Duration::from_secs(5), events.values()).await.unwrap(), vec![2, 4, 6]);
  }

  #[tokio::test]
  async fn chained_maps_apply_in_order() {
    let source = Observable::<String, ()>::new();
    let (observer, events) = Observer::new();
    source.map(|s| s + "b").map(|s| s + "c").subscribe(&observer);

    source.next("a".to_owned()).await.unwrap();
    source.complete().unwrap();
    let values = timeout(Duration::from_secs(5), events.values()).await.unwrap();
    assert_eq!(values, vec!["abc".to_owned()]);
  }

  #[tokio::test]
  async fn filter_map_drops_none() {
    let source = Observable::<i32, ()>::new();
    let (observer, events) = Observer::new();
    source.filter_map(|v| (v % 2 == 0).then(|| v / 2)).subscribe(&observer);

    for v in 1..=6 {
      source.next(v).await.unwrap();
    }
    source.complete().unwrap();
    assert_eq!(timeout(Duration::from_secs(5), events.values()).await.unwrap(), vec![1, 2, 3]);
  }
}
