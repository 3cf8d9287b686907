//! Construction-time configuration for Observables.

use std::borrow::Cow;

/// Default number of `Next` events that may wait in an Observable's inbox.
pub const DEFAULT_EVENT_PERMITS: usize = 10;

/// Default queue capacity of an [`Observer`](crate::observer::Observer)
/// created with [`Observer::new`](crate::observer::Observer::new).
pub const DEFAULT_SINK_CAPACITY: usize = 10;

/// Settings applied when an Observable is constructed.
///
/// ```rust
/// use rxloop::Config;
///
/// let config = Config::default().with_label("ticks").with_event_permits(4);
/// assert_eq!(config.label(), Some("ticks"));
/// assert_eq!(config.event_permits(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
  label: Option<Cow<'static, str>>,
  event_permits: usize,
}

impl Default for Config {
  fn default() -> Self { Self { label: None, event_permits: DEFAULT_EVENT_PERMITS } }
}

impl Config {
  /// Label recorded on the Observable's tracing span.
  pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
    self.label = Some(label.into());
    self
  }

  /// Back-pressure bound for `Next` events. Clamped to at least 1.
  pub fn with_event_permits(mut self, permits: usize) -> Self {
    self.event_permits = permits.max(1);
    self
  }

  #[inline]
  pub fn label(&self) -> Option<&str> { self.label.as_deref() }

  #[inline]
  pub fn event_permits(&self) -> usize { self.event_permits }
}
