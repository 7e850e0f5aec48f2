//! Session clock
//!
//! Authoritative countdown for one paid play session. The clock is the single
//! writer of its state: every mutation updates memory first, then writes a
//! snapshot through the [`ClockStore`] so a reload can rebuild it with
//! [`SessionClock::load_from_persistence`]. Mutations are serialized from the
//! state change through the store write, so snapshots land in order.
//! The snapshot is cleared once the clock expires.
//!
//! State machine: `Idle -> Running <-> Paused`, `Running -> Expired`,
//! `Expired -> Idle` only through `reset`. Anything else is a no-op.

mod observer;
mod ticker;

pub use observer::{ClockChange, ClockEvent, Observer, Subscription};
pub use ticker::spawn_ticker;

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crate::store::{ClockSnapshot, ClockStore, StoreError, StoreResult};
use crate::time::TimeSource;
use crate::types::{ClockState, ClockStatus, SessionId};
use observer::Observers;

/// Result type for clock operations
pub type ClockResult<T> = Result<T, ClockError>;

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("Invalid budget {0}: must be a positive number of seconds")]
    InvalidBudget(i64),

    #[error("Failed to persist clock state: {0}")]
    Persistence(#[from] StoreError),
}

/// Result of a single `tick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time was applied (possibly zero whole seconds)
    Advanced {
        elapsed_seconds: u64,
        remaining_seconds: u64,
    },
    /// This tick drove the clock to zero
    Expired,
    /// `now` was earlier than the last observed timestamp
    RejectedBackward,
    /// Clock is not running, nothing to do
    NotRunning,
}

enum Advance {
    Consumed(u64),
    Expired,
    Backward,
    Nothing,
}

/// Apply wall-clock time elapsed since `last_observed_wall_clock`.
///
/// Only whole seconds are consumed; the sub-second remainder stays behind
/// `last_observed_wall_clock` and counts on the next tick.
fn advance(state: &mut ClockState, now: DateTime<Utc>) -> Advance {
    let Some(last) = state.last_observed_wall_clock else {
        state.last_observed_wall_clock = Some(now);
        return Advance::Nothing;
    };

    let elapsed_ms = (now - last).num_milliseconds();
    if elapsed_ms < 0 {
        return Advance::Backward;
    }

    let whole = elapsed_ms / 1000;
    if whole == 0 {
        return Advance::Nothing;
    }

    state.remaining_seconds = state.remaining_seconds.saturating_sub(whole as u64);
    state.last_observed_wall_clock = Some(last + Duration::seconds(whole));

    if state.remaining_seconds == 0 {
        state.status = ClockStatus::Expired;
        state.last_observed_wall_clock = Some(now);
        return Advance::Expired;
    }

    Advance::Consumed(whole as u64)
}

fn validate_budget(budget_seconds: i64) -> ClockResult<u64> {
    if budget_seconds <= 0 {
        return Err(ClockError::InvalidBudget(budget_seconds));
    }
    Ok(budget_seconds as u64)
}

/// Countdown for one play session
pub struct SessionClock {
    session_id: SessionId,
    state: RwLock<ClockState>,
    store: Arc<dyn ClockStore>,
    time: Arc<dyn TimeSource>,
    observers: Observers,
    /// Held by every mutation until its snapshot is written
    ops: tokio::sync::Mutex<()>,
}

impl SessionClock {
    /// Create an `Idle` clock without a budget
    pub fn new(
        session_id: impl Into<SessionId>,
        store: Arc<dyn ClockStore>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state: RwLock::new(ClockState::default()),
            store,
            time,
            observers: Observers::default(),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current time according to this clock's time source
    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    /// Remaining seconds and status; always reflects the latest mutation
    pub fn get_remaining(&self) -> (u64, ClockStatus) {
        let state = self.state.read().expect("clock state lock poisoned");
        (state.remaining_seconds, state.status)
    }

    /// Full copy of the in-memory state
    pub fn state(&self) -> ClockState {
        self.state.read().expect("clock state lock poisoned").clone()
    }

    /// Register a callback for every state change
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ClockChange) + Send + Sync + 'static,
    {
        self.observers.subscribe(Arc::new(observer))
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClockState> {
        self.state.write().expect("clock state lock poisoned")
    }

    async fn persist(&self, state: &ClockState) -> StoreResult<()> {
        let snapshot = ClockSnapshot::capture(state, self.time.now());
        self.store.save(&self.session_id, &snapshot).await
    }

    /// Persist, logging instead of failing. A lost write is corrected by the next one.
    async fn persist_or_log(&self, state: &ClockState, operation: &str) {
        if let Err(e) = self.persist(state).await {
            tracing::warn!(
                session_id = %self.session_id,
                operation,
                error = %e,
                "Failed to persist clock state"
            );
        }
    }

    /// Drop the persisted snapshot of an expired clock
    async fn clear_or_log(&self) {
        if let Err(e) = self.store.clear(&self.session_id).await {
            tracing::warn!(
                session_id = %self.session_id,
                error = %e,
                "Failed to clear persisted clock"
            );
        }
    }

    fn emit(&self, event: ClockEvent, state: &ClockState) {
        self.observers.notify(ClockChange {
            event,
            remaining_seconds: state.remaining_seconds,
            status: state.status,
        });
    }

    /// Set a fresh budget and return to `Idle`.
    ///
    /// Fails on a non-positive budget or if the budget cannot be persisted; in
    /// the latter case the previous state is restored.
    pub async fn initialize(&self, budget_seconds: i64) -> ClockResult<()> {
        let budget = validate_budget(budget_seconds)?;
        let _op = self.ops.lock().await;

        let (previous, next) = {
            let mut state = self.write();
            let previous = state.clone();
            *state = ClockState {
                total_budget_seconds: budget,
                remaining_seconds: budget,
                status: ClockStatus::Idle,
                last_observed_wall_clock: None,
                carried_millis: 0,
            };
            (previous, state.clone())
        };

        if let Err(e) = self.persist(&next).await {
            tracing::error!(
                session_id = %self.session_id,
                error = %e,
                "Failed to persist session budget, refusing to initialize"
            );
            *self.write() = previous;
            return Err(e.into());
        }

        tracing::info!(session_id = %self.session_id, budget, "Clock initialized");
        self.emit(ClockEvent::Initialized, &next);
        Ok(())
    }

    /// `Idle`/`Paused` -> `Running`. Returns false when nothing changed.
    pub async fn start(&self) -> bool {
        let _op = self.ops.lock().await;
        let now = self.time.now();

        let next = {
            let mut state = self.write();
            let startable = matches!(state.status, ClockStatus::Idle | ClockStatus::Paused)
                && state.remaining_seconds > 0;
            if !startable {
                return false;
            }
            // Running time left over from before a pause counts on the next tick
            let carried = Duration::milliseconds(state.carried_millis as i64);
            state.status = ClockStatus::Running;
            state.last_observed_wall_clock = Some(now - carried);
            state.carried_millis = 0;
            state.clone()
        };

        tracing::info!(
            session_id = %self.session_id,
            remaining = next.remaining_seconds,
            "Clock started"
        );
        self.persist_or_log(&next, "start").await;
        self.emit(ClockEvent::Started, &next);
        true
    }

    /// `Running` -> `Paused`. Returns false when nothing changed.
    ///
    /// Remaining seconds stay as they are. Running time not yet charged by a
    /// tick is carried into the next `start`, so rapid pause/start cycles
    /// cannot stall the countdown.
    pub async fn pause(&self) -> bool {
        let _op = self.ops.lock().await;
        let now = self.time.now();

        let next = {
            let mut state = self.write();
            if state.status != ClockStatus::Running {
                return false;
            }
            let unticked_ms = state
                .last_observed_wall_clock
                .map(|last| (now - last).num_milliseconds().max(0))
                .unwrap_or(0);
            state.carried_millis = unticked_ms as u64;
            state.status = ClockStatus::Paused;
            state.last_observed_wall_clock = Some(now);
            state.clone()
        };

        self.persist_or_log(&next, "pause").await;
        tracing::info!(
            session_id = %self.session_id,
            remaining = next.remaining_seconds,
            carried_ms = next.carried_millis,
            "Clock paused"
        );
        self.emit(ClockEvent::Paused, &next);
        true
    }

    /// Advance the countdown to `now`. The only time-advancing operation.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let _op = self.ops.lock().await;

        let (outcome, next) = {
            let mut state = self.write();
            if state.status != ClockStatus::Running {
                return TickOutcome::NotRunning;
            }

            match advance(&mut state, now) {
                Advance::Backward => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        now = %now,
                        last = ?state.last_observed_wall_clock,
                        "Rejected tick: clock moved backwards"
                    );
                    return TickOutcome::RejectedBackward;
                }
                Advance::Nothing => {
                    return TickOutcome::Advanced {
                        elapsed_seconds: 0,
                        remaining_seconds: state.remaining_seconds,
                    };
                }
                Advance::Consumed(elapsed_seconds) => (
                    TickOutcome::Advanced {
                        elapsed_seconds,
                        remaining_seconds: state.remaining_seconds,
                    },
                    state.clone(),
                ),
                Advance::Expired => (TickOutcome::Expired, state.clone()),
            }
        };

        if outcome == TickOutcome::Expired {
            self.clear_or_log().await;
            tracing::info!(session_id = %self.session_id, "Clock expired");
            self.emit(ClockEvent::Expired, &next);
        } else {
            self.persist_or_log(&next, "tick").await;
            self.emit(ClockEvent::Ticked, &next);
        }
        outcome
    }

    /// Force any state back to `Idle`, optionally with a new budget.
    ///
    /// Without a budget the persisted snapshot is cleared. With one it is
    /// validated and persisted like `initialize`.
    pub async fn reset(&self, budget_seconds: Option<i64>) -> ClockResult<()> {
        let budget = budget_seconds.map(validate_budget).transpose()?;
        let _op = self.ops.lock().await;

        let (previous, next) = {
            let mut state = self.write();
            let previous = state.clone();
            *state = match budget {
                Some(budget) => ClockState {
                    total_budget_seconds: budget,
                    remaining_seconds: budget,
                    status: ClockStatus::Idle,
                    last_observed_wall_clock: None,
                    carried_millis: 0,
                },
                None => ClockState::default(),
            };
            (previous, state.clone())
        };

        match budget {
            Some(_) => {
                if let Err(e) = self.persist(&next).await {
                    tracing::error!(
                        session_id = %self.session_id,
                        error = %e,
                        "Failed to persist reset budget"
                    );
                    *self.write() = previous;
                    return Err(e.into());
                }
            }
            None => self.clear_or_log().await,
        }

        tracing::info!(session_id = %self.session_id, budget = ?budget, "Clock reset");
        self.emit(ClockEvent::Reset, &next);
        Ok(())
    }

    /// Rebuild state from the store after a reload.
    ///
    /// A `Running` snapshot is charged for the wall-clock time since it was
    /// last observed, with the same backward-clock rejection as `tick`.
    /// Returns false when nothing was persisted for this session.
    pub async fn load_from_persistence(&self) -> ClockResult<bool> {
        let _op = self.ops.lock().await;
        let Some(snapshot) = self.store.load(&self.session_id).await? else {
            return Ok(false);
        };
        let now = self.time.now();

        let (next, applied) = {
            let mut state = self.write();
            *state = snapshot.into_state();
            let applied = (state.status == ClockStatus::Running)
                .then(|| advance(&mut state, now));
            (state.clone(), applied)
        };

        if matches!(applied, Some(Advance::Backward)) {
            tracing::warn!(
                session_id = %self.session_id,
                "Persisted clock is ahead of current time, not charging elapsed time"
            );
        }

        tracing::info!(
            session_id = %self.session_id,
            remaining = next.remaining_seconds,
            status = ?next.status,
            "Clock restored"
        );
        if next.status == ClockStatus::Expired {
            self.clear_or_log().await;
        } else {
            self.persist_or_log(&next, "restore").await;
        }

        if matches!(applied, Some(Advance::Expired)) {
            self.emit(ClockEvent::Expired, &next);
        } else {
            self.emit(ClockEvent::Restored, &next);
        }
        Ok(true)
    }
}
