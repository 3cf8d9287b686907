use crate::{event::Payload, observable::Observable, ops::Step};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Emits only the values that satisfy `predicate`.
  pub fn filter<F>(&self, predicate: F) -> &Self
  where
    F: FnMut(&Item) -> bool + Send + 'static,
  {
    self.configure(move |core| core.pipeline.push(Step::Filter(Box::new(predicate))))
  }
}
