use crate::{event::Payload, observable::Observable};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Hands every error to `handler` instead of terminating. Subscribers
  /// never see the error and the Observable stays alive.
  ///
  /// A retry policy, if installed, gets the first chance at the error.
  pub fn catch_error<F>(&self, handler: F) -> &Self
  where
    F: FnMut(Err) + Send + 'static,
  {
    self.configure(move |core| core.recovery.catch = Some(Box::new(handler)))
  }
}
