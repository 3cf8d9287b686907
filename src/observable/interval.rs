use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{event::Payload, observable::Observable};

impl<Err: Payload> Observable<usize, Err> {
  /// Emits `0, 1, 2, ...`, one value every `period` (at least a millisecond)
  /// once connected. Stops when the Observable finalizes.
  pub fn interval(period: Duration) -> Self {
    let period = period.max(Duration::from_millis(1));
    Self::create(move |observable| async move {
      let mut ticks = time::interval_at(Instant::now() + period, period);
      ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
      let mut seq = 0;
      loop {
        tokio::select! {
          _ = ticks.tick() => {
            observable.next(seq).await?;
            seq += 1;
          }
          _ = observable.finalized() => return Ok(()),
        }
      }
    })
  }
}
