//! The Observable handle.
//!
//! An [`Observable`] is a cheap, cloneable handle onto a control loop that
//! runs on its own Tokio task. The loop is the only place the subscriber set,
//! the operator pipeline and the replay buffer are touched. Every call on the
//! handle is turned into a message on the loop's FIFO inbox. The one exception
//! is the pipe set, which composition calls ([`pipe`](Observable::pipe),
//! [`merge`](Observable::merge)) update directly under its own lock.
//!
//! ```text
//!  producer ── next/error/complete ──┐
//!  upstream ports ── events ─────────┼──► inbox ──► control loop ──► sinks
//!  consumers ── subscribe/unsubscribe┤              (single writer)
//!  operators ── configure ───────────┘
//! ```
//!
//! # Lifecycle
//!
//! `Cold` → (`Gating` while [`publish`](Observable::publish) holds
//! subscriptions) → `Hot` on the first wired subscription → `Completing` once
//! a terminal event is in flight → `Finalized` when the loop has released
//! every subscriber and upstream pipe.
//!
//! Dropping the last handle does not leave the loop running for nothing.
//! With nobody subscribed it finalizes. With subscribers but nothing left
//! that could emit (no pipe, no running producer) it completes them.

use std::{
  borrow::Cow,
  collections::HashMap,
  fmt,
  sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, RwLock,
  },
};

use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug_span, Instrument};

use crate::{
  config::Config,
  error::Error,
  event::{Event, Payload, SinkId, SourceId},
  observer::Observer,
  util,
};

mod control;
mod create;
mod from_iter;
mod interval;

pub(crate) use control::Core;

/// Lifecycle of an Observable, observable through [`Observable::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
  /// No subscriber has been wired yet; producers wait at the connect gate.
  Cold,
  /// `publish` is active; subscriptions queue until `connect`.
  Gating,
  /// At least one subscription was wired; the connect gate is open.
  Hot,
  /// A terminal event is being delivered.
  Completing,
  /// Every queue is closed and all sets are released.
  Finalized,
}

impl State {
  fn can_become(self, next: State) -> bool {
    match next {
      State::Cold => false,
      State::Gating => self == State::Cold,
      State::Hot => matches!(self, State::Cold | State::Gating),
      State::Completing => !matches!(self, State::Completing | State::Finalized),
      State::Finalized => self != State::Finalized,
    }
  }
}

/// Where an event entering the inbox came from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Origin {
  /// The Observable's own producer.
  Own,
  /// An upstream pipe, created under the given producer generation.
  Port { generation: u64 },
}

pub(crate) type Configure<Item, Err> = Box<dyn FnOnce(&mut Core<Item, Err>) + Send>;

pub(crate) enum Message<Item, Err> {
  Event { origin: Origin, event: Event<Item, Err>, permit: Option<OwnedSemaphorePermit> },
  Subscribe(Observer<Item, Err>),
  Unsubscribe(SinkId),
  Connect,
  Configure(Configure<Item, Err>),
  /// The last handle or producer task went away.
  Orphaned,
}

/// Sending side of an Observable's inbox.
///
/// `Next` events take a permit from the semaphore before they are queued;
/// the permit travels with the message and is returned when the loop dequeues
/// it. Terminal events and control messages never wait.
pub(crate) struct Inbox<Item, Err> {
  id: SourceId,
  tx: mpsc::UnboundedSender<Message<Item, Err>>,
  permits: Arc<Semaphore>,
}

impl<Item, Err> Clone for Inbox<Item, Err> {
  fn clone(&self) -> Self {
    Self { id: self.id, tx: self.tx.clone(), permits: self.permits.clone() }
  }
}

impl<Item, Err> Inbox<Item, Err> {
  pub(crate) fn post(&self, message: Message<Item, Err>) -> Result<(), Error> {
    self.tx.send(message).map_err(|_| Error::Closed { observable: self.id })
  }

  pub(crate) async fn post_next(&self, origin: Origin, value: Item) -> Result<(), Error> {
    let permit = self
      .permits
      .clone()
      .acquire_owned()
      .await
      .map_err(|_| Error::Closed { observable: self.id })?;
    self.post(Message::Event { origin, event: Event::Next(value), permit: Some(permit) })
  }

  pub(crate) fn post_event(&self, origin: Origin, event: Event<Item, Err>) -> Result<(), Error> {
    self.post(Message::Event { origin, event, permit: None })
  }

  /// Wakes every producer blocked on a permit with `Closed`.
  pub(crate) fn close(&self) { self.permits.close(); }
}

/// An upstream registered in a target's pipe set, with the port the target
/// subscribed to it.
pub(crate) struct Pipe<Item, Err> {
  pub(crate) source: Observable<Item, Err>,
  pub(crate) port: Observer<Item, Err>,
}

#[derive(Default)]
pub(crate) struct Stats {
  subscribers: AtomicUsize,
  pending: AtomicUsize,
  unsubscribes: AtomicUsize,
}

pub(crate) struct Shared<Item, Err> {
  pub(crate) id: SourceId,
  label: Option<Cow<'static, str>>,
  pub(crate) inbox: Inbox<Item, Err>,
  pipes: RwLock<HashMap<SourceId, Pipe<Item, Err>>>,
  generation: AtomicU64,
  state: watch::Sender<State>,
  pub(crate) stats: Stats,
  /// Live `Observable` handles. The control loop itself holds none.
  handles: AtomicUsize,
  /// Producer tasks that have not returned yet.
  producers: AtomicUsize,
}

impl<Item, Err> Shared<Item, Err> {
  pub(crate) fn handle_count(&self) -> usize { self.handles.load(Ordering::Acquire) }

  pub(crate) fn producer_count(&self) -> usize { self.producers.load(Ordering::Acquire) }

  pub(crate) fn closed(&self) -> Error { Error::Closed { observable: self.id } }

  pub(crate) async fn finalized(&self) {
    let mut state = self.state.subscribe();
    let _ = state.wait_for(|s| *s == State::Finalized).await;
  }

  pub(crate) async fn connected(&self) -> Result<(), Error> {
    let mut state = self.state.subscribe();
    let reached = state
      .wait_for(|s| !matches!(s, State::Cold | State::Gating))
      .await
      .map(|s| *s)
      .unwrap_or(State::Finalized);
    match reached {
      State::Hot => Ok(()),
      _ => Err(self.closed()),
    }
  }

  pub(crate) fn generation(&self) -> u64 { self.generation.load(Ordering::Acquire) }

  /// Starts a new producer generation. Events still in flight from ports of
  /// the previous generation are discarded by the loop.
  pub(crate) fn bump_generation(&self) -> u64 { self.generation.fetch_add(1, Ordering::AcqRel) + 1 }

  pub(crate) fn set_state(&self, next: State) {
    self.state.send_if_modified(|state| {
      let changed = state.can_become(next);
      if changed {
        *state = next;
      }
      changed
    });
  }

  pub(crate) fn set_counts(&self, subscribers: usize, pending: usize) {
    self.stats.subscribers.store(subscribers, Ordering::Release);
    self.stats.pending.store(pending, Ordering::Release);
  }

  pub(crate) fn count_unsubscribe(&self) { self.stats.unsubscribes.fetch_add(1, Ordering::AcqRel); }

  pub(crate) fn pipe_count(&self) -> usize { util::read(&self.pipes).len() }

  pub(crate) fn remove_pipe(&self, source: SourceId) -> Option<Pipe<Item, Err>> {
    util::write(&self.pipes).remove(&source)
  }

  /// Drops pipes whose upstream already delivered its terminal event.
  pub(crate) fn prune_finished_pipes(&self) {
    util::write(&self.pipes).retain(|_, pipe| !pipe.port.is_finalized());
  }

  pub(crate) fn take_pipes(&self) -> Vec<Pipe<Item, Err>> {
    util::write(&self.pipes).drain().map(|(_, pipe)| pipe).collect()
  }

  /// Registers `pipe` unless its source is already piped in.
  pub(crate) fn insert_pipe(&self, pipe: Pipe<Item, Err>) -> bool {
    let mut pipes = util::write(&self.pipes);
    let source = pipe.source.id();
    if pipes.contains_key(&source) {
      return false;
    }
    pipes.insert(source, pipe);
    true
  }
}

/// A push-based, cancellable event stream.
///
/// Cloning the handle is cheap; all clones address the same control loop.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use rxloop::prelude::*;
///
/// let subject = Observable::<i32, ()>::subject();
/// let (observer, events) = Observer::new();
/// subject.map(|v| v * 10).subscribe(&observer);
///
/// subject.next(1).await.unwrap();
/// subject.next(2).await.unwrap();
/// subject.complete().unwrap();
///
/// let values: Vec<_> = events.drain().await.into_iter().filter_map(Event::into_next).collect();
/// assert_eq!(values, vec![10, 20]);
/// # }
/// ```
pub struct Observable<Item, Err> {
  pub(crate) shared: Arc<Shared<Item, Err>>,
}

impl<Item, Err> Observable<Item, Err> {
  pub(crate) fn from_shared(shared: Arc<Shared<Item, Err>>) -> Self {
    shared.handles.fetch_add(1, Ordering::AcqRel);
    Self { shared }
  }
}

impl<Item, Err> Clone for Observable<Item, Err> {
  fn clone(&self) -> Self { Self::from_shared(self.shared.clone()) }
}

impl<Item, Err> Drop for Observable<Item, Err> {
  fn drop(&mut self) {
    if self.shared.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
      let _ = self.shared.inbox.post(Message::Orphaned);
    }
  }
}

/// Marks a running producer task. The loop is told once the last producer
/// is gone and no handle is left.
pub(crate) struct ProducerGuard<Item, Err> {
  shared: Arc<Shared<Item, Err>>,
}

impl<Item, Err> ProducerGuard<Item, Err> {
  pub(crate) fn new(shared: Arc<Shared<Item, Err>>) -> Self {
    shared.producers.fetch_add(1, Ordering::AcqRel);
    Self { shared }
  }

  pub(crate) fn shared(&self) -> Arc<Shared<Item, Err>> { self.shared.clone() }
}

impl<Item, Err> Drop for ProducerGuard<Item, Err> {
  fn drop(&mut self) {
    if self.shared.producers.fetch_sub(1, Ordering::AcqRel) == 1 && self.shared.handle_count() == 0 {
      let _ = self.shared.inbox.post(Message::Orphaned);
    }
  }
}

impl<Item, Err> fmt::Debug for Observable<Item, Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Observable")
      .field("id", &self.shared.id)
      .field("label", &self.shared.label)
      .field("state", &self.state())
      .finish()
  }
}

impl<Item, Err> Observable<Item, Err> {
  #[inline]
  pub fn id(&self) -> SourceId { self.shared.id }

  #[inline]
  pub fn label(&self) -> Option<&str> { self.shared.label.as_deref() }

  #[inline]
  pub fn state(&self) -> State { *self.shared.state.borrow() }

  /// Number of wired subscribers, as last recorded by the control loop.
  pub fn subscriber_count(&self) -> usize { self.shared.stats.subscribers.load(Ordering::Acquire) }

  /// Number of subscriptions held back by `publish`.
  pub fn pending_count(&self) -> usize { self.shared.stats.pending.load(Ordering::Acquire) }

  /// Number of upstream Observables currently piped or merged in.
  pub fn pipe_count(&self) -> usize { self.shared.pipe_count() }

  /// How many subscribers this Observable has removed on request. A pipe
  /// torn down before its subscription was wired counts too.
  pub fn unsubscribe_count(&self) -> usize {
    self.shared.stats.unsubscribes.load(Ordering::Acquire)
  }

  pub(crate) fn generation(&self) -> u64 { self.shared.generation() }

  /// Waits until the Observable reaches `Finalized`.
  pub async fn finalized(&self) { self.shared.finalized().await }

  /// The connect gate: resolves once the first subscription has been wired
  /// (or `connect` was called). Producers await it before emitting.
  ///
  /// Returns [`Error::Closed`] if the Observable terminated first.
  pub async fn connected(&self) -> Result<(), Error> { self.shared.connected().await }

  pub(crate) fn closed(&self) -> Error { self.shared.closed() }
}

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// Creates a bare, cold, unicast Observable.
  ///
  /// # Panics
  ///
  /// Must be called from within a Tokio runtime: the control loop is spawned
  /// immediately.
  pub fn new() -> Self { Self::with_config(Config::default()) }

  pub fn with_config(config: Config) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = SourceId::next();
    let (state, _) = watch::channel(State::Cold);
    let span = debug_span!("observable", id = %id, label = config.label().unwrap_or_default());
    let shared = Arc::new(Shared {
      id,
      label: config.label().map(|l| Cow::Owned(l.to_owned())),
      inbox: Inbox { id, tx, permits: Arc::new(Semaphore::new(config.event_permits())) },
      pipes: RwLock::new(HashMap::new()),
      generation: AtomicU64::new(0),
      state,
      stats: Stats::default(),
      handles: AtomicUsize::new(0),
      producers: AtomicUsize::new(0),
    });
    tokio::spawn(Core::new(shared.clone()).run(rx).instrument(span));
    Self::from_shared(shared)
  }

  /// Emits a value from this Observable's own producer.
  ///
  /// Waits while the inbox holds its full share of undelivered values.
  pub async fn next(&self, value: Item) -> Result<(), Error> {
    self.shared.inbox.post_next(Origin::Own, value).await
  }

  /// Emits an error from this Observable's own producer.
  pub fn error(&self, err: Err) -> Result<(), Error> {
    self.shared.inbox.post_event(Origin::Own, Event::Error(err))
  }

  /// Completes this Observable. Self-completion is authoritative: share,
  /// merge and repeat policies do not hold it back.
  pub fn complete(&self) -> Result<(), Error> {
    self.shared.inbox.post_event(Origin::Own, Event::Complete(self.shared.id))
  }

  /// Registers `observer`. Subscribing to a finalized Observable completes
  /// the observer straight away.
  pub fn subscribe(&self, observer: &Observer<Item, Err>) -> &Self {
    if self.shared.inbox.post(Message::Subscribe(observer.clone())).is_err() {
      observer.complete(self.shared.id);
    }
    self
  }

  /// Removes `observer` and completes it. Removing the last subscriber of a
  /// non-`share` Observable finalizes it and unsubscribes every upstream.
  ///
  /// The request is queued behind earlier messages. If the loop is stuck
  /// delivering to a consumer that stopped reading, drop that consumer's
  /// [`Events`](crate::observer::Events) to release it.
  pub fn unsubscribe(&self, observer: &Observer<Item, Err>) -> &Self {
    let _ = self.shared.inbox.post(Message::Unsubscribe(observer.id()));
    self
  }

  /// Enqueues a configuration change for the control loop.
  pub(crate) fn configure(&self, f: impl FnOnce(&mut Core<Item, Err>) + Send + 'static) -> &Self {
    let _ = self.shared.inbox.post(Message::Configure(Box::new(f)));
    self
  }
}

impl<Item: Payload, Err: Payload> Default for Observable<Item, Err> {
  fn default() -> Self { Self::new() }
}
