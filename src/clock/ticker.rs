use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{SessionClock, TickOutcome};
use crate::types::ClockStatus;

/// Spawn the repeating tick source for one clock.
///
/// Ticks only while the clock is `Running`, so a clock that is reset with a
/// new budget after expiring keeps its ticker. The task ends once the last
/// strong reference to the clock is gone.
pub fn spawn_ticker(clock: &Arc<SessionClock>, cadence: Duration) -> JoinHandle<()> {
    let clock: Weak<SessionClock> = Arc::downgrade(clock);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let Some(clock) = clock.upgrade() else {
                break;
            };

            if clock.get_remaining().1 != ClockStatus::Running {
                continue;
            }
            if clock.tick(clock.now()).await == TickOutcome::Expired {
                tracing::debug!(session_id = clock.session_id(), "Ticker saw clock expire");
            }
        }

        tracing::debug!("Clock dropped, ticker stopped");
    })
}
