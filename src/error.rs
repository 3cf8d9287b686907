//! Errors raised by the engine itself.
//!
//! Stream failures travel as [`Event::Error`](crate::event::Event) values
//! carrying the user's error type. The [`Error`] here only covers the
//! engine's own conditions.

use thiserror::Error;

use crate::event::SourceId;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// The Observable was finalized. Producers treat this as "stop emitting".
  #[error("observable {observable} is finalized")]
  Closed {
    /// The finalized Observable.
    observable: SourceId,
  },

  /// A resubscribe action could not attach a fresh upstream.
  #[error("resubscribe failed: {reason}")]
  Resubscribe {
    /// Why the action gave up.
    reason: String,
  },
}

impl Error {
  pub fn resubscribe(reason: impl Into<String>) -> Self {
    Error::Resubscribe { reason: reason.into() }
  }

  /// Returns a short stable label (snake_case) for use in logs.
  pub fn as_label(&self) -> &'static str {
    match self {
      Error::Closed { .. } => "observable_closed",
      Error::Resubscribe { .. } => "resubscribe_failed",
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn labels_and_messages() {
    let err = Error::resubscribe("upstream unavailable");
    assert_eq!(err.as_label(), "resubscribe_failed");
    assert_eq!(err.to_string(), "resubscribe failed: upstream unavailable");

    let closed = Error::Closed { observable: SourceId::next() };
    assert_eq!(closed.as_label(), "observable_closed");
    assert!(closed.to_string().ends_with("is finalized"));
  }
}
