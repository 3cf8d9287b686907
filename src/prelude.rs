//! Prelude module for convenient imports

pub use crate::{
  config::Config,
  error::Error,
  event::{Event, Payload, SinkId, SourceId},
  observable::{Observable, State},
  observer::{Events, Observer},
  ring_buffer::RingBuffer,
};
