use std::future::Future;

use tracing::Instrument;

use crate::{
  config::Config,
  error::Error,
  event::Payload,
  observable::{Observable, ProducerGuard},
};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Observable driven by the async `producer`.
  ///
  /// The producer is spawned on its own task and receives a handle to the
  /// new Observable. It starts once the connect gate opens; if the
  /// Observable terminates first it never runs. Returning
  /// [`Error::Closed`] from a `next` call is the usual way to stop.
  ///
  /// ```rust
  /// # #[tokio::main(flavor = "current_thread")]
  /// # async fn main() {
  /// use rxloop::prelude::*;
  ///
  /// let source = Observable::<&str, ()>::create(|observable| async move {
  ///   observable.next("hello").await?;
  ///   observable.next("world").await?;
  ///   observable.complete()
  /// });
  /// let (observer, events) = Observer::new();
  /// source.subscribe(&observer);
  /// assert_eq!(events.values().await, vec!["hello", "world"]);
  /// # }
  /// ```
  pub fn create<F, Fut>(producer: F) -> Self
  where
    F: FnOnce(Observable<Item, Err>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
  {
    Self::create_with_config(Config::default(), producer)
  }

  pub fn create_with_config<F, Fut>(config: Config, producer: F) -> Self
  where
    F: FnOnce(Observable<Item, Err>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
  {
    let observable = Self::with_config(config);
    // Until the gate opens the task holds no handle, so an Observable
    // nobody subscribes to can still be dropped.
    let guard = ProducerGuard::new(observable.shared.clone());
    let span = tracing::debug_span!("producer", observable = %observable.id());
    tokio::spawn(
      async move {
        let shared = guard.shared();
        if shared.connected().await.is_err() {
          tracing::trace!("terminated before connect");
          return;
        }
        if let Err(err) = producer(Observable::from_shared(shared)).await {
          tracing::debug!(error = %err, label = err.as_label(), "producer stopped");
        }
        drop(guard);
      }
      .instrument(span),
    );
    observable
  }
}

#[cfg(test)]
mod test {
  use std::{
    sync::{
      atomic::{AtomicBool, Ordering},
      Arc,
    },
    time::Duration,
  };

  use tokio::time::timeout;

  use crate::prelude::*;

  #[tokio::test]
  async fn waits_for_the_first_subscription() {
    let started = Arc::new(AtomicBool::new(false));
    let flag = started.clone();
    let source = Observable::<i32, ()>::create(move |observable| async move {
      flag.store(true, Ordering::SeqCst);
      observable.next(1).await?;
      observable.complete()
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!started.load(Ordering::SeqCst));

    let (observer, events) = Observer::new();
    source.subscribe(&observer);
    assert_eq!(timeout(Duration::from_secs(5), events.values()).await.unwrap(), vec![1]);
    assert!(started.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn never_runs_if_terminated_first() {
    let started = Arc::new(AtomicBool::new(false));
    let flag = started.clone();
    let source = Observable::<i32, ()>::create(move |observable| async move {
      flag.store(true, Ordering::SeqCst);
      observable.complete()
    });
    source.complete().unwrap();
    timeout(Duration::from_secs(5), source.finalized()).await.unwrap();
    tokio::task::yield_now().await;
    assert!(!started.load(Ordering::SeqCst));
  }

  #[tokio::test]
  async fn producer_learns_it_is_unwanted() {
    let (stopped_tx, stopped_rx) = tokio::sync::oneshot::channel();
    let source = Observable::<u32, ()>::create(move |observable| async move {
      let mut n = 0;
      let result = loop {
        if let Err(err) = observable.next(n).await {
          break err;
        }
        n += 1;
      };
      let _ = stopped_tx.send(result.clone());
      Err(result)
    });
    let (observer, mut events) = Observer::new();
    source.subscribe(&observer);
    assert_eq!(events.recv().await, Some(Event::Next(0)));
    // The loop may be blocked on the full queue; dropping the receiver
    // releases it before the unsubscribe is processed.
    drop(events);
    source.unsubscribe(&observer);

    let err = timeout(Duration::from_secs(5), stopped_rx).await.unwrap().unwrap();
    assert_eq!(err, Error::Closed { observable: source.id() });
  }
}
