use crate::{config::Config, event::Payload, observable::Observable, ring_buffer::RingBuffer};

impl<Item: Payload, Err: Payload> Observable<Item, Err> {
  /// A subject that remembers its latest value, starting with `value`, and
  /// sends it to every new subscriber before live values.
  pub fn behavior_subject(value: Item) -> Self {
    Self::behavior_subject_with_config(Config::default(), value)
  }

  pub fn behavior_subject_with_config(config: Config, value: Item) -> Self {
    let subject = Self::subject_with_config(config);
    subject.configure(move |core| {
      let mut latest = RingBuffer::new(1);
      latest.add(value);
      core.buffer = Some(latest);
    });
    subject
  }
}
