//! Retry and repeat.
//!
//! Both policies re-attach a fresh upstream through the Observable's
//! resubscribe action instead of failing or completing:
//!
//! - [`retry_when`](Observable::retry_when) is consulted when an error
//!   arrives;
//! - [`repeat_when`](Observable::repeat_when) is consulted when a piped
//!   upstream completes (self-completion is never repeated).
//!
//! The controller only steps in while someone is listening, that is while at
//! least one subscriber remains or the Observable is shared. Before asking the
//! predicate it drops every current upstream and starts a new producer
//! generation, so stragglers from the old upstream are discarded. The
//! predicate receives the 1-based attempt number and may take its time: the
//! control loop waits for it, which is how backoff is expressed.
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::time::Duration;
//!
//! use rxloop::prelude::*;
//!
//! let polled = Observable::<u32, String>::new();
//! let (observer, events) = Observer::new();
//! polled.subscribe(&observer);
//! polled.retry_when(|attempt| async move {
//!   tokio::time::sleep(Duration::from_millis(attempt as u64)).await;
//!   attempt <= 3
//! });
//! polled.resubscribe(|target| {
//!   Observable::create(|upstream| async move { upstream.error("unreachable".to_owned()) })
//!     .pipe(target);
//!   Ok(())
//! });
//!
//! // The initial attempt and three retries all fail.
//! assert_eq!(events.drain().await, vec![Event::Error("unreachable".to_owned())]);
//! # }
//! ```

use std::future::Future;

use futures::future::BoxFuture;

use crate::{error::Error, event::Payload, observable::Observable};

type Decide = Box<dyn FnMut(usize) -> BoxFuture<'static, bool> + Send>;
type Action<Item, Err> = Box<dyn FnMut(&Observable<Item, Err>) -> Result<(), Error> + Send>;
type Catch<Err> = Box<dyn FnMut(Err) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Policy {
  Retry,
  Repeat,
}

/// Recovery hooks held by the control loop.
pub(crate) struct Recovery<Item, Err> {
  retry: Option<Decide>,
  repeat: Option<Decide>,
  retries: usize,
  repeats: usize,
  action: Option<Action<Item, Err>>,
  pub(crate) catch: Option<Catch<Err>>,
}

impl<Item, Err> Default for Recovery<Item, Err> {
  fn default() -> Self {
    Self { retry: None, repeat: None, retries: 0, repeats: 0, action: None, catch: None }
  }
}

impl<Item, Err> Recovery<Item, Err> {
  pub(crate) fn handles(&self, policy: Policy) -> bool {
    match policy {
      Policy::Retry => self.retry.is_some(),
      Policy::Repeat => self.repeat.is_some(),
    }
  }

  pub(crate) fn attempts(&self, policy: Policy) -> usize {
    match policy {
      Policy::Retry => self.retries,
      Policy::Repeat => self.repeats,
    }
  }

  #[inline]
  pub(crate) fn has_action(&self) -> bool { self.action.is_some() }

  fn install(&mut self, policy: Policy, decide: Decide) {
    match policy {
      Policy::Retry => self.retry = Some(decide),
      Policy::Repeat => self.repeat = Some(decide),
    }
  }

  /// Counts an attempt and asks the policy's predicate about it.
  pub(crate) fn consult(&mut self, policy: Policy) -> Option<BoxFuture<'static, bool>> {
    let (decide, attempts) = match policy {
      Policy::Retry => (self.retry.as_mut()?, &mut self.retries),
      Policy::Repeat => (self.repeat.as_mut()?, &mut self.repeats),
    };
    *attempts += 1;
    Some(decide(*attempts))
  }

  pub(crate) fn run_action(&mut self, target: &Observable<Item, Err>) -> Result<(), Error> {
    match self.action.as_mut() {
      Some(action) => action(target),
      None => Err(Error::resubscribe("no resubscribe action installed")),
    }
  }
}

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Re-attaches a fresh upstream on error for as long as `predicate`
  /// resolves to `true`. Requires a [`resubscribe`](Self::resubscribe)
  /// action.
  pub fn retry_when<F, Fut>(&self, predicate: F) -> &Self
  where
    F: FnMut(usize) -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
  {
    self.install_policy(Policy::Retry, predicate)
  }

  /// Re-attaches a fresh upstream when the current one completes, for as
  /// long as `predicate` resolves to `true`. Requires a
  /// [`resubscribe`](Self::resubscribe) action.
  pub fn repeat_when<F, Fut>(&self, predicate: F) -> &Self
  where
    F: FnMut(usize) -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
  {
    self.install_policy(Policy::Repeat, predicate)
  }

  fn install_policy<F, Fut>(&self, policy: Policy, mut predicate: F) -> &Self
  where
    F: FnMut(usize) -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
  {
    self.configure(move |core| {
      let decide: Decide = Box::new(move |attempt| Box::pin(predicate(attempt)));
      core.recovery.install(policy, decide);
    })
  }

  /// Registers the action that builds a new upstream and pipes it into this
  /// Observable. The action runs once on registration for the initial
  /// attach, then again on every intercepted error or completion.
  pub fn resubscribe<F>(&self, mut action: F) -> &Self
  where
    F: FnMut(&Observable<Item, Err>) -> Result<(), Error> + Send + 'static,
  {
    self.configure(move |core| {
      let handle = core.handle_of();
      if let Err(err) = action(&handle) {
        tracing::warn!(error = %err, label = err.as_label(), "initial attach failed");
      }
      core.recovery.action = Some(Box::new(action));
    })
  }
}
