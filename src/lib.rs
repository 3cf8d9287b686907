//! # rxloop: a message-driven reactive stream engine
//!
//! Every [`Observable`] owns a control loop running on its own Tokio task.
//! Producers push events into it, consumers subscribe [`Observer`] sinks to
//! it, and operators configure it. All of that travels as messages on the
//! loop's FIFO inbox, so the subscriber set, the operator pipeline and the
//! replay buffer have exactly one writer.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxloop::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let source = Observable::<i32, ()>::from_iter(0..10);
//! source.filter(|v| v % 2 == 0).map(|v| v * 2);
//!
//! let (observer, events) = Observer::new();
//! source.subscribe(&observer);
//! assert_eq!(events.values().await, vec![0, 4, 8, 12, 16]);
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Handle onto a control loop; producer entry points, operators, subscriptions |
//! | [`Observer`] | An event sink with a single-fire terminal guard |
//! | [`Events`] | The consumer end of a channel sink; also a `futures::Stream` |
//! | [`Event`] | `Next`, `Error` or `Complete(SourceId)` |
//! | [`State`] | `Cold`, `Gating`, `Hot`, `Completing`, `Finalized` |
//!
//! Operators must be configured before the first subscription. Only
//! `subscribe`, `unsubscribe`, `connect` and emission are meant for a live
//! Observable.
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]. Each control loop runs in an
//! `observable` span carrying its id and the label from [`Config`]; install
//! any subscriber to see them.

pub mod config;
pub mod error;
pub mod event;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod ring_buffer;
pub mod subject;
mod util;

pub use prelude::*;

// Compile the README examples as doctests.
#[cfg(doctest)]
mod __markdown_doctests {
  #![doc = include_str!("../README.md")]
}
