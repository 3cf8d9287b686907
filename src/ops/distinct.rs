use crate::{event::Payload, observable::Observable, ops::Step};

impl<Item: Payload + PartialEq, Err: Payload> Observable<Item, Err> {
  /// Drops a value equal to the last value that passed. The first value
  /// always passes.
  ///
  /// ```rust
  /// # #[tokio::main(flavor = "current_thread")]
  /// # async fn main() {
  /// use rxloop::prelude::*;
  ///
  /// let source = Observable::<i32, ()>::from_iter([1, 1, 2, 2, 1]);
  /// let (observer, events) = Observer::new();
  /// source.distinct().subscribe(&observer);
  /// assert_eq!(events.values().await, vec![1, 2, 1]);
  /// # }
  /// ```
  pub fn distinct(&self) -> &Self {
    let mut last: Option<Item> = None;
    self.configure(move |core| {
      core.pipeline.push(Step::Filter(Box::new(move |value: &Item| {
        if last.as_ref() == Some(value) {
          return false;
        }
        last = Some(value.clone());
        true
      })))
    })
  }
}
