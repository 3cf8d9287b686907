use crate::{config::Config, event::Payload, observable::Observable, ring_buffer::RingBuffer};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// A subject that replays up to `capacity` of its most recent values to
  /// every new subscriber before live values.
  ///
  /// ```rust
  /// # #[tokio::main(flavor = "current_thread")]
  /// # async fn main() {
  /// use rxloop::prelude::*;
  ///
  /// let subject = Observable::<i32, ()>::replay_subject(2);
  /// for v in [1, 2, 3] {
  ///   subject.next(v).await.unwrap();
  /// }
  /// let (observer, events) = Observer::new();
  /// subject.subscribe(&observer);
  /// subject.next(4).await.unwrap();
  /// subject.complete().unwrap();
  /// assert_eq!(events.values().await, vec![2, 3, 4]);
  /// # }
  /// ```
  pub fn replay_subject(capacity: usize) -> Self {
    Self::replay_subject_with_config(Config::default(), capacity)
  }

  pub fn replay_subject_with_config(config: Config, capacity: usize) -> Self {
    let subject = Self::subject_with_config(config);
    subject.configure(move |core| core.buffer = Some(RingBuffer::new(capacity)));
    subject
  }
}
