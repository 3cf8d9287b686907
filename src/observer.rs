//! The Event Sink.
//!
//! An [`Observer`] is the addressable endpoint that events are pushed into.
//! It carries a single-fire guard: after the first `Error` or `Complete` every
//! further delivery is a no-op, whichever path (self-completion, upstream
//! completion, unsubscribe, a dropped consumer) gets there first.
//!
//! A sink comes in two flavours:
//!
//! - a *channel* sink, created with [`Observer::new`] or
//!   [`Observer::channel`], whose events are read back through the paired
//!   [`Events`] receiver;
//! - a *port*, created internally by `pipe`/`merge`, which forwards events
//!   into another Observable's inbox tagged with the producer generation it
//!   was created under.
//!
//! Delivery of `Next` blocks while the sink's queue is full. A consumer that
//! never reads therefore stalls the control loop feeding it; a consumer that
//! drops its [`Events`] gets its sink finalized on the next delivery.

use std::{
  fmt,
  pin::Pin,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
  task::{Context, Poll},
};

use futures::{future::poll_fn, Stream};
use smallvec::SmallVec;
use tokio::sync::{mpsc, Notify};

use crate::{
  config::DEFAULT_SINK_CAPACITY,
  event::{Event, SinkId, SourceId},
  observable::{Inbox, Message, Origin},
  util,
};

type TerminalSlot<Item, Err> = Arc<Mutex<Option<Event<Item, Err>>>>;

enum Route<Item, Err> {
  Channel { sender: Mutex<Option<mpsc::Sender<Event<Item, Err>>>>, terminal: TerminalSlot<Item, Err> },
  Port { inbox: Inbox<Item, Err>, generation: u64 },
}

struct SinkInner<Item, Err> {
  id: SinkId,
  finalized: AtomicBool,
  /// Wakes a delivery blocked on a full queue when the sink finalizes.
  closed: Notify,
  route: Route<Item, Err>,
  /// Observables holding this sink in their subscriber set.
  owners: Mutex<SmallVec<[Inbox<Item, Err>; 1]>>,
}

/// Cloneable handle onto an event sink.
pub struct Observer<Item, Err> {
  inner: Arc<SinkInner<Item, Err>>,
}

impl<Item, Err> Clone for Observer<Item, Err> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<Item, Err> fmt::Debug for Observer<Item, Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self.inner.route {
      Route::Channel { .. } => "channel",
      Route::Port { .. } => "port",
    };
    f.debug_struct("Observer")
      .field("id", &self.inner.id)
      .field("kind", &kind)
      .field("finalized", &self.is_finalized())
      .finish()
  }
}

impl<Item, Err> Observer<Item, Err> {
  /// A channel sink with the default queue capacity.
  pub fn new() -> (Self, Events<Item, Err>) { Self::channel(DEFAULT_SINK_CAPACITY) }

  /// A channel sink holding at most `capacity` undelivered values.
  pub fn channel(capacity: usize) -> (Self, Events<Item, Err>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let terminal = Arc::new(Mutex::new(None));
    let route = Route::Channel { sender: Mutex::new(Some(sender)), terminal: terminal.clone() };
    (Self::with_route(route), Events { receiver, terminal, done: false })
  }

  pub(crate) fn port(inbox: Inbox<Item, Err>, generation: u64) -> Self {
    Self::with_route(Route::Port { inbox, generation })
  }

  fn with_route(route: Route<Item, Err>) -> Self {
    let inner = SinkInner {
      id: SinkId::next(),
      finalized: AtomicBool::new(false),
      closed: Notify::new(),
      route,
      owners: Mutex::new(SmallVec::new()),
    };
    Self { inner: Arc::new(inner) }
  }

  #[inline]
  pub fn id(&self) -> SinkId { self.inner.id }

  pub(crate) fn is_port(&self) -> bool { matches!(self.inner.route, Route::Port { .. }) }

  /// Whether a terminal event was delivered or the sink was released.
  #[inline]
  pub fn is_finalized(&self) -> bool { self.inner.finalized.load(Ordering::Acquire) }

  /// Pushes a value, waiting while the sink's queue is full.
  pub async fn next(&self, value: Item) { self.deliver(Event::Next(value)).await }

  pub fn error(&self, err: Err) { self.finalize(Some(Event::Error(err))); }

  /// Completes the sink on behalf of `source`. Only the first terminal
  /// delivery has any effect.
  pub fn complete(&self, source: SourceId) { self.finalize(Some(Event::Complete(source))); }

  pub(crate) async fn deliver(&self, event: Event<Item, Err>) {
    let closed = self.inner.closed.notified();
    if self.is_finalized() {
      return;
    }
    let value = match event {
      Event::Next(value) => value,
      terminal => {
        self.finalize(Some(terminal));
        return;
      }
    };
    let send = async {
      match &self.inner.route {
        Route::Channel { sender, .. } => {
          let sender = util::lock(sender).clone();
          match sender {
            Some(sender) => sender.send(Event::Next(value)).await.is_ok(),
            None => true,
          }
        }
        Route::Port { inbox, generation } => {
          inbox.post_next(Origin::Port { generation: *generation }, value).await.is_ok()
        }
      }
    };
    let delivered = tokio::select! {
      delivered = send => delivered,
      _ = closed => return,
    };
    if !delivered {
      // Nobody is listening any more.
      self.finalize(None);
    }
  }

  /// Records `owner` as holding this sink, so finalization can ask it to drop
  /// the sink from its subscriber set.
  pub(crate) fn attach(&self, owner: &Inbox<Item, Err>) {
    util::lock(&self.inner.owners).push(owner.clone());
    if self.is_finalized() {
      self.notify_owners();
    }
  }

  /// Finalizes without a terminal event and without notifying owners. Used
  /// when the owner side is the one tearing the link down.
  pub(crate) fn release(&self) {
    if self.inner.finalized.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Route::Channel { sender, .. } = &self.inner.route {
      util::lock(sender).take();
    }
    self.inner.closed.notify_waiters();
    util::lock(&self.inner.owners).clear();
  }

  fn finalize(&self, terminal: Option<Event<Item, Err>>) {
    if self.inner.finalized.swap(true, Ordering::AcqRel) {
      return;
    }
    match &self.inner.route {
      Route::Channel { sender, terminal: slot } => {
        if terminal.is_some() {
          *util::lock(slot) = terminal;
        }
        // Closing the channel lets the receiver drain queued values first;
        // the terminal event is yielded after them.
        util::lock(sender).take();
      }
      Route::Port { inbox, generation } => {
        if let Some(event) = terminal {
          let _ = inbox.post_event(Origin::Port { generation: *generation }, event);
        }
      }
    }
    self.inner.closed.notify_waiters();
    self.notify_owners();
  }

  fn notify_owners(&self) {
    let owners = std::mem::take(&mut *util::lock(&self.inner.owners));
    for owner in owners {
      let _ = owner.post(Message::Unsubscribe(self.inner.id));
    }
  }
}

/// Receiving end of a channel sink.
///
/// Yields every delivered value in order, then the terminal event (if one was
/// delivered), then `None`.
pub struct Events<Item, Err> {
  receiver: mpsc::Receiver<Event<Item, Err>>,
  terminal: TerminalSlot<Item, Err>,
  done: bool,
}

impl<Item, Err> Events<Item, Err> {
  pub fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<Event<Item, Err>>> {
    if self.done {
      return Poll::Ready(None);
    }
    match self.receiver.poll_recv(cx) {
      Poll::Ready(None) => {
        self.done = true;
        Poll::Ready(util::lock(&self.terminal).take())
      }
      ready_or_pending => ready_or_pending,
    }
  }

  pub async fn recv(&mut self) -> Option<Event<Item, Err>> { poll_fn(|cx| self.poll_event(cx)).await }

  /// Collects every event up to and including the terminal one.
  pub async fn drain(mut self) -> Vec<Event<Item, Err>> {
    let mut events = Vec::new();
    while let Some(event) = self.recv().await {
      events.push(event);
    }
    events
  }

  /// Collects the delivered values, discarding the terminal event.
  pub async fn values(self) -> Vec<Item> {
    self.drain().await.into_iter().filter_map(Event::into_next).collect()
  }
}

impl<Item, Err> Stream for Events<Item, Err> {
  type Item = Event<Item, Err>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.get_mut().poll_event(cx)
  }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use futures::StreamExt;
  use tokio::time::timeout;

  use super::*;

  #[tokio::test]
  async fn values_then_terminal() {
    let (observer, events) = Observer::<i32, ()>::new();
    let source = SourceId::next();
    observer.next(1).await;
    observer.next(2).await;
    observer.complete(source);

    assert_eq!(events.drain().await, vec![Event::Next(1), Event::Next(2), Event::Complete(source)]);
  }

  #[tokio::test]
  async fn completion_is_idempotent() {
    let (observer, events) = Observer::<i32, ()>::new();
    let source = SourceId::next();
    observer.complete(source);
    observer.complete(source);
    observer.error(());
    observer.next(3).await;

    assert!(observer.is_finalized());
    assert_eq!(events.drain().await, vec![Event::Complete(source)]);
  }

  #[tokio::test]
  async fn first_terminal_wins() {
    let (observer, events) = Observer::<i32, &str>::new();
    observer.error("first");
    observer.complete(SourceId::next());
    assert_eq!(events.drain().await, vec![Event::Error("first")]);
  }

  #[tokio::test]
  async fn clones_share_the_guard() {
    let (observer, events) = Observer::<i32, ()>::new();
    let other = observer.clone();
    let source = SourceId::next();
    other.complete(source);
    observer.complete(source);
    assert!(observer.is_finalized());
    assert_eq!(events.drain().await.len(), 1);
  }

  #[tokio::test]
  async fn full_queue_blocks_delivery() {
    let (observer, mut events) = Observer::<i32, ()>::channel(1);
    observer.next(1).await;
    assert!(timeout(Duration::from_millis(50), observer.next(2)).await.is_err());

    assert_eq!(events.recv().await, Some(Event::Next(1)));
    timeout(Duration::from_secs(5), observer.next(3)).await.unwrap();
    assert_eq!(events.recv().await, Some(Event::Next(3)));
  }

  #[tokio::test]
  async fn finalizing_unblocks_a_pending_delivery() {
    let (observer, events) = Observer::<i32, ()>::channel(1);
    observer.next(1).await;
    let blocked = tokio::spawn({
      let observer = observer.clone();
      async move { observer.next(2).await }
    });
    tokio::task::yield_now().await;

    let source = SourceId::next();
    observer.complete(source);
    timeout(Duration::from_secs(5), blocked).await.unwrap().unwrap();
    assert_eq!(events.drain().await, vec![Event::Next(1), Event::Complete(source)]);
  }

  #[tokio::test]
  async fn dropped_receiver_finalizes_on_delivery() {
    let (observer, events) = Observer::<i32, ()>::new();
    drop(events);
    assert!(!observer.is_finalized());
    observer.next(1).await;
    assert!(observer.is_finalized());
  }

  #[tokio::test]
  async fn events_is_a_stream() {
    let (observer, events) = Observer::<i32, ()>::new();
    let source = SourceId::next();
    observer.next(5).await;
    observer.complete(source);
    let collected: Vec<_> = events.collect().await;
    assert_eq!(collected, vec![Event::Next(5), Event::Complete(source)]);
  }

  #[tokio::test]
  async fn released_sink_stays_silent() {
    let (observer, events) = Observer::<i32, ()>::new();
    observer.release();
    observer.complete(SourceId::next());
    assert!(events.drain().await.is_empty());
  }
}
