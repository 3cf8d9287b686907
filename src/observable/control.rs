//! The control loop.
//!
//! One `Core` per Observable, running on its own task and processing the
//! inbox one message at a time. It is the only writer of the subscriber set,
//! the pending set, the pipeline, the ring buffer and the recovery policy.

use std::{collections::HashMap, ops::ControlFlow, sync::Arc};

use futures::future::join_all;
use tokio::sync::mpsc;

use super::{Message, Observable, Origin, Pipe, Shared, State};
use crate::{
  event::{Event, Payload, SinkId, SourceId},
  observer::Observer,
  ops::{
    retry::{Policy, Recovery},
    take::Limit,
    Pipeline,
  },
  ring_buffer::RingBuffer,
};

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Modes {
  /// Stay alive across upstream completions while subscribers remain, and
  /// across the last unsubscribe.
  pub(crate) share: bool,
  /// Keep every subscriber instead of handing off to the newest one.
  pub(crate) multicast: bool,
  /// Complete only once every piped arm has completed.
  pub(crate) merging: bool,
  /// Queue subscriptions until `connect`.
  pub(crate) publish: bool,
}

pub(crate) struct Core<Item, Err> {
  pub(crate) shared: Arc<Shared<Item, Err>>,
  subscribers: HashMap<SinkId, Observer<Item, Err>>,
  pending: Vec<Observer<Item, Err>>,
  pub(crate) modes: Modes,
  pub(crate) buffer: Option<RingBuffer<Item>>,
  pub(crate) pipeline: Pipeline<Item>,
  pub(crate) recovery: Recovery<Item, Err>,
  pub(crate) limit: Option<Limit<Item>>,
  terminated: bool,
}

impl<Item: Payload, Err: Payload> Core<Item, Err> {
  pub(crate) fn new(shared: Arc<Shared<Item, Err>>) -> Self {
    Self {
      shared,
      subscribers: HashMap::new(),
      pending: Vec::new(),
      modes: Modes::default(),
      buffer: None,
      pipeline: Pipeline::default(),
      recovery: Recovery::default(),
      limit: None,
      terminated: false,
    }
  }

  #[inline]
  fn id(&self) -> SourceId { self.shared.id }

  pub(crate) fn handle_of(&self) -> Observable<Item, Err> { Observable::from_shared(self.shared.clone()) }

  pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message<Item, Err>>) {
    tracing::trace!("control loop started");
    while let Some(message) = rx.recv().await {
      if self.handle(message).await.is_break() {
        break;
      }
    }
    self.finalize(rx);
  }

  async fn handle(&mut self, message: Message<Item, Err>) -> ControlFlow<()> {
    match message {
      Message::Event { origin, event, permit } => {
        // Dequeued: the producer may queue its next value.
        drop(permit);
        if let Origin::Port { generation } = origin {
          if generation != self.shared.generation() {
            tracing::trace!(generation, "dropping event from a replaced upstream");
            return ControlFlow::Continue(());
          }
        }
        match event {
          Event::Next(value) => self.on_next(value).await,
          Event::Error(err) => self.on_error(err).await,
          Event::Complete(source) => self.on_complete(source).await,
        }
      }
      Message::Subscribe(sink) => self.on_subscribe(sink).await,
      Message::Unsubscribe(id) => self.on_unsubscribe(id),
      Message::Connect => {
        self.on_connect().await;
        ControlFlow::Continue(())
      }
      Message::Configure(configure) => {
        configure(self);
        ControlFlow::Continue(())
      }
      Message::Orphaned => self.on_orphaned(),
    }
  }

  async fn on_next(&mut self, value: Item) -> ControlFlow<()> {
    let Some(value) = self.pipeline.apply(value).await else {
      return ControlFlow::Continue(());
    };

    if let Some(buffer) = &mut self.buffer {
      buffer.add(value.clone());
    }

    tracing::trace!(subscribers = self.subscribers.len(), "dispatch next");
    join_all(self.subscribers.values().map(|sink| sink.deliver(Event::Next(value.clone())))).await;

    // The limit is checked after fan-out: the value that exhausts it is
    // still delivered.
    let exhausted = match &mut self.limit {
      Some(Limit::Count(remaining)) => {
        *remaining = remaining.saturating_sub(1);
        *remaining == 0
      }
      Some(Limit::While(predicate)) => !predicate(&value),
      None => false,
    };
    if exhausted {
      // Let consumers pick up the last value before the terminal event.
      tokio::task::yield_now().await;
      tracing::debug!("take limit reached");
      return self.terminate(None);
    }
    ControlFlow::Continue(())
  }

  async fn on_error(&mut self, err: Err) -> ControlFlow<()> {
    if self.recovery.handles(Policy::Retry) && self.resubscribe(Policy::Retry).await {
      tracing::debug!(attempt = self.recovery.attempts(Policy::Retry), "retrying");
      return ControlFlow::Continue(());
    }
    if let Some(handler) = &mut self.recovery.catch {
      handler(err);
      self.shared.prune_finished_pipes();
      tracing::debug!("error caught");
      return ControlFlow::Continue(());
    }
    self.terminate(Some(err))
  }

  async fn on_complete(&mut self, source: SourceId) -> ControlFlow<()> {
    if source != self.id() {
      self.shared.remove_pipe(source);
      if self.modes.share && !self.subscribers.is_empty() && self.can_emit() {
        tracing::debug!(upstream = %source, "upstream completed, shared observable stays hot");
        return ControlFlow::Continue(());
      }
      if self.modes.merging && self.shared.pipe_count() > 0 {
        tracing::debug!(upstream = %source, "merge arm completed");
        return ControlFlow::Continue(());
      }
      if self.recovery.handles(Policy::Repeat) && self.resubscribe(Policy::Repeat).await {
        tracing::debug!(attempt = self.recovery.attempts(Policy::Repeat), "repeating");
        return ControlFlow::Continue(());
      }
    }
    self.terminate(None)
  }

  /// Replaces the upstream with a fresh one built by the resubscribe action.
  /// Returns whether the error or completion was intercepted.
  async fn resubscribe(&mut self, policy: Policy) -> bool {
    if self.subscribers.is_empty() && !self.modes.share {
      return false;
    }
    if !self.recovery.has_action() {
      return false;
    }

    self.clear_pipes();
    let generation = self.shared.bump_generation();
    let Some(decision) = self.recovery.consult(policy) else {
      return false;
    };
    if !decision.await {
      return false;
    }

    let handle = self.handle_of();
    match self.recovery.run_action(&handle) {
      Ok(()) => {
        tracing::debug!(generation, ?policy, "attached fresh upstream");
        true
      }
      Err(err) => {
        tracing::warn!(error = %err, label = err.as_label(), "resubscribe action failed");
        false
      }
    }
  }

  async fn on_subscribe(&mut self, sink: Observer<Item, Err>) -> ControlFlow<()> {
    if self.subscribers.contains_key(&sink.id()) {
      return ControlFlow::Continue(());
    }
    if sink.is_finalized() {
      if !sink.is_port() {
        return ControlFlow::Continue(());
      }
      // The downstream dropped this pipe before the subscription landed.
      // Its unsubscribe is already queued behind us and will find nothing.
      tracing::debug!(sink = %sink.id(), "port released before it was wired");
      self.shared.count_unsubscribe();
      return self.release_if_unwanted();
    }
    if self.modes.publish {
      if self.pending.iter().all(|queued| queued.id() != sink.id()) {
        tracing::debug!(sink = %sink.id(), "subscription held until connect");
        self.pending.push(sink);
      }
    } else {
      self.wire(sink).await;
      self.shared.set_state(State::Hot);
    }
    self.sync_stats();
    ControlFlow::Continue(())
  }

  async fn wire(&mut self, sink: Observer<Item, Err>) {
    if !self.modes.multicast {
      for (_, evicted) in self.subscribers.drain() {
        tracing::debug!(sink = %evicted.id(), "handing off unicast subscription");
        evicted.complete(self.shared.id);
      }
    }
    sink.attach(&self.shared.inbox);

    for seed in self.pipeline.seeds() {
      sink.deliver(Event::Next(seed)).await;
    }
    let replay: Vec<Item> = self.buffer.iter().flat_map(|buffer| buffer.iter().cloned()).collect();
    for value in replay {
      sink.deliver(Event::Next(value)).await;
    }

    tracing::debug!(sink = %sink.id(), "subscribed");
    self.subscribers.insert(sink.id(), sink);
  }

  async fn on_connect(&mut self) {
    self.modes.publish = false;
    for sink in std::mem::take(&mut self.pending) {
      if !sink.is_finalized() {
        self.wire(sink).await;
      }
    }
    tracing::debug!("connected");
    self.shared.set_state(State::Hot);
    self.sync_stats();
  }

  fn on_unsubscribe(&mut self, id: SinkId) -> ControlFlow<()> {
    if let Some(position) = self.pending.iter().position(|sink| sink.id() == id) {
      let sink = self.pending.remove(position);
      self.sync_stats();
      sink.complete(self.id());
      return ControlFlow::Continue(());
    }
    let Some(sink) = self.subscribers.remove(&id) else {
      return ControlFlow::Continue(());
    };
    self.shared.count_unsubscribe();
    self.sync_stats();
    sink.complete(self.id());
    tracing::debug!(sink = %id, remaining = self.subscribers.len(), "unsubscribed");
    self.release_if_unwanted()
  }

  /// Breaks the loop once nobody is subscribed and nobody can subscribe
  /// again. A shared Observable waits for new subscribers while a handle
  /// exists.
  fn release_if_unwanted(&self) -> ControlFlow<()> {
    let idle = self.subscribers.is_empty() && self.pending.is_empty();
    if idle && (!self.modes.share || self.shared.handle_count() == 0) {
      return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
  }

  /// Whether anything could still push an event in: a handle, an upstream
  /// pipe or a running producer.
  fn can_emit(&self) -> bool {
    self.shared.handle_count() > 0 || self.shared.pipe_count() > 0 || self.shared.producer_count() > 0
  }

  fn on_orphaned(&mut self) -> ControlFlow<()> {
    if self.shared.handle_count() > 0 {
      return ControlFlow::Continue(());
    }
    if self.subscribers.is_empty() {
      tracing::debug!("every handle dropped with nobody subscribed");
      return ControlFlow::Break(());
    }
    if !self.can_emit() {
      tracing::debug!("every handle dropped and nothing left to emit");
      return self.terminate(None);
    }
    ControlFlow::Continue(())
  }

  /// Delivers the terminal event to every subscriber and releases every
  /// upstream. Only the first call has any effect.
  fn terminate(&mut self, err: Option<Err>) -> ControlFlow<()> {
    if self.terminated {
      return ControlFlow::Break(());
    }
    self.terminated = true;
    self.shared.set_state(State::Completing);

    let id = self.id();
    match &err {
      Some(_) => tracing::debug!(subscribers = self.subscribers.len(), "terminating with error"),
      None => tracing::debug!(subscribers = self.subscribers.len(), "completing"),
    }
    for (_, sink) in self.subscribers.drain() {
      match &err {
        Some(err) => sink.error(err.clone()),
        None => sink.complete(id),
      }
    }
    for sink in self.pending.drain(..) {
      sink.complete(id);
    }
    self.clear_pipes();
    self.sync_stats();
    ControlFlow::Break(())
  }

  /// Unsubscribes from every upstream. Ports are released first so the
  /// upstream's completion of them is not forwarded back here.
  fn clear_pipes(&mut self) {
    for Pipe { source, port } in self.shared.take_pipes() {
      port.release();
      source.unsubscribe(&port);
    }
  }

  fn finalize(mut self, mut rx: mpsc::UnboundedReceiver<Message<Item, Err>>) {
    let _ = self.terminate(None);
    self.shared.inbox.close();
    rx.close();
    while let Ok(message) = rx.try_recv() {
      if let Message::Subscribe(sink) = message {
        sink.complete(self.id());
      }
    }
    self.sync_stats();
    self.shared.set_state(State::Finalized);
    // A pipe inserted while the first teardown ran.
    self.clear_pipes();
    tracing::debug!("finalized");
  }

  fn sync_stats(&self) { self.shared.set_counts(self.subscribers.len(), self.pending.len()); }
}
