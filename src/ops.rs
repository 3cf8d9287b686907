//! Operators.
//!
//! Every operator is a configuration call on [`Observable`](crate::Observable)
//! that is queued on the control loop's inbox, so it takes effect in call
//! order relative to subscriptions and emissions made from the same task.
//! Per-event operators become [`Step`]s of the Observable's [`Pipeline`];
//! behavioural ones (take, multicast, retry, ...) flip state on the loop.

use std::time::Duration;

pub mod delay;
pub mod distinct;
pub mod filter;
pub mod map;
pub mod merge;
pub mod multicast;
pub mod on_error;
pub mod publish;
pub mod retry;
pub mod start_with;
pub mod take;
pub mod take_until;
pub mod take_while;
pub mod tap;

pub(crate) type MapFn<Item> = Box<dyn FnMut(Item) -> Option<Item> + Send>;
pub(crate) type FilterFn<Item> = Box<dyn FnMut(&Item) -> bool + Send>;
pub(crate) type TapFn<Item> = Box<dyn FnMut(&Item) + Send>;
pub(crate) type SeedFn<Item> = Box<dyn FnMut() -> Vec<Item> + Send>;

pub(crate) enum Step<Item> {
  /// `None` drops the event.
  Map(MapFn<Item>),
  Filter(FilterFn<Item>),
  Tap(TapFn<Item>),
  /// Suspends the control loop before the event moves on.
  Delay(Duration),
  /// Runs once per new subscription rather than per event.
  StartWith(SeedFn<Item>),
}

/// Ordered list of steps applied to every `Next` before it is buffered and
/// fanned out.
pub(crate) struct Pipeline<Item> {
  steps: Vec<Step<Item>>,
}

impl<Item> Default for Pipeline<Item> {
  fn default() -> Self { Self { steps: Vec::new() } }
}

impl<Item> Pipeline<Item> {
  pub(crate) fn push(&mut self, step: Step<Item>) { self.steps.push(step); }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize { self.steps.len() }

  /// Runs `value` through every per-event step. Stops at the first step that
  /// rejects it.
  pub(crate) async fn apply(&mut self, mut value: Item) -> Option<Item> {
    for step in &mut self.steps {
      match step {
        Step::Map(f) => value = f(value)?,
        Step::Filter(predicate) => {
          if !predicate(&value) {
            return None;
          }
        }
        Step::Tap(f) => f(&value),
        Step::Delay(duration) => tokio::time::sleep(*duration).await,
        Step::StartWith(_) => {}
      }
    }
    Some(value)
  }

  /// Seed values for a new subscription, in step order.
  pub(crate) fn seeds(&mut self) -> Vec<Item> {
    let mut seeds = Vec::new();
    for step in &mut self.steps {
      if let Step::StartWith(seed) = step {
        seeds.extend(seed());
      }
    }
    seeds
  }
}
