use crate::{event::Payload, observable::Observable, ops::Step};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Runs `f` on every value that reaches this step, leaving the value
  /// untouched.
  pub fn tap<F>(&self, f: F) -> &Self
  where
    F: FnMut(&Item) + Send + 'static,
  {
    self.configure(move |core| core.pipeline.push(Step::Tap(Box::new(f))))
  }
}
