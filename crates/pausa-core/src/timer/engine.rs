//! Timer state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused <-> Running) -> Completed -> Idle
//!                \-> Idle (stop)
//! ```
//!
//! The timer has no internal thread. Completion is lazy: every
//! status/progress read first computes the true elapsed time and, when a
//! Running session has used up its duration, transitions to Completed as a
//! side effect -- persisting the snapshot, appending exactly one history
//! record and emitting `timer_completed`. Repeated reads after completion
//! are no-ops.
//!
//! Every transition and every reader takes the same exclusive lock; reads
//! are not lock-free because they may mutate. Across processes the state
//! file is the only shared resource and consistency is last-writer-wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::error::TimerError;
use crate::events::{Event, EventType};
use crate::plugins::EventBus;
use crate::store::{HistoryRecord, HistoryStore, StateStore};

use super::session::{SessionSnapshot, SessionType, TimerStatus};

/// A state change discovered in the shared file that this process did not
/// make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalChange {
    /// Another process stopped or reset the session.
    Cleared,
    /// Another process moved the session to this status (e.g. paused it).
    Updated(TimerStatus),
}

/// The session timer.
///
/// Constructed once per process from its stores and passed by reference;
/// there is no global instance. The event bus is optional -- without one,
/// transitions simply do not notify plugins.
pub struct Timer {
    state: Mutex<SessionSnapshot>,
    store: StateStore,
    history: HistoryStore,
    bus: Option<Arc<EventBus>>,
}

impl Timer {
    /// Build a timer on top of its stores, adopting the persisted snapshot.
    ///
    /// An unreadable state file degrades to the default Idle snapshot with
    /// a warning; a fresh process must never refuse to start over it.
    pub fn new(store: StateStore, history: HistoryStore) -> Self {
        let snapshot = match store.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "could not load timer state, starting idle");
                SessionSnapshot::default()
            }
        };
        Self {
            state: Mutex::new(snapshot),
            store,
            history,
            bus: None,
        }
    }

    /// Attach an event bus for plugin notification.
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session. Legal from any state except Running.
    pub fn start(&self, duration: Duration, session_type: SessionType) -> Result<(), TimerError> {
        if duration.is_zero() {
            return Err(TimerError::InvalidDuration);
        }
        let mut state = self.lock();
        if state.status == TimerStatus::Running {
            return Err(TimerError::AlreadyRunning);
        }

        *state = SessionSnapshot {
            status: TimerStatus::Running,
            session_type,
            started_at: Some(Utc::now()),
            duration_ms: duration.as_millis() as u64,
            elapsed_ms: 0,
        };
        self.persist(&state);
        self.emit(
            Event::new(EventType::Started)
                .with("session_type", session_type.as_str())
                .with("duration_secs", duration.as_secs()),
        );
        Ok(())
    }

    /// Pause a running session, folding the current stretch into the
    /// accumulated elapsed time.
    pub fn pause(&self) -> Result<(), TimerError> {
        let mut state = self.lock();
        if state.status != TimerStatus::Running {
            return Err(TimerError::NotRunning);
        }

        let now = Utc::now();
        state.elapsed_ms = state.true_elapsed_ms(now);
        state.status = TimerStatus::Paused;
        let event = Event::new(EventType::Paused)
            .with("session_type", state.session_type.as_str())
            .with("elapsed_secs", state.elapsed_ms / 1000);
        self.persist(&state);
        self.emit(event);
        Ok(())
    }

    /// Resume a paused session. A fresh running stretch begins now.
    pub fn resume(&self) -> Result<(), TimerError> {
        let mut state = self.lock();
        if state.status != TimerStatus::Paused {
            return Err(TimerError::NotPaused);
        }

        let now = Utc::now();
        state.started_at = Some(now);
        state.status = TimerStatus::Running;
        let event = Event::new(EventType::Resumed)
            .with("session_type", state.session_type.as_str())
            .with("remaining_secs", state.remaining_ms(now) / 1000);
        self.persist(&state);
        self.emit(event);
        Ok(())
    }

    /// End the session and record it, whether or not it ran to completion.
    pub fn stop(&self) -> Result<(), TimerError> {
        let mut state = self.lock();
        if state.status == TimerStatus::Idle {
            return Err(TimerError::NotRunning);
        }

        let completed = state.status == TimerStatus::Completed;
        self.record(&state, completed);
        let event = Event::new(EventType::Stopped)
            .with("session_type", state.session_type.as_str())
            .with("completed", completed)
            .with("elapsed_secs", state.elapsed_ms / 1000);

        state.status = TimerStatus::Idle;
        state.elapsed_ms = 0;
        state.started_at = None;
        self.persist(&state);
        self.emit(event);
        Ok(())
    }

    /// Return a completed session to Idle, clearing its duration.
    pub fn reset(&self) -> Result<(), TimerError> {
        let mut state = self.lock();
        if state.status != TimerStatus::Completed {
            return Err(TimerError::NotCompleted);
        }

        self.record(&state, true);
        state.status = TimerStatus::Idle;
        state.duration_ms = 0;
        state.elapsed_ms = 0;
        state.started_at = None;
        self.persist(&state);
        Ok(())
    }

    // ── Readers (lazily completing) ──────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        let mut state = self.lock();
        self.refresh(&mut state);
        state.status
    }

    /// Progress in [0, 1]; 0 when no duration is set.
    pub fn progress(&self) -> f64 {
        let mut state = self.lock();
        self.refresh(&mut state);
        state.progress(Utc::now())
    }

    /// True elapsed time.
    pub fn elapsed(&self) -> Duration {
        let mut state = self.lock();
        self.refresh(&mut state);
        Duration::from_millis(state.true_elapsed_ms(Utc::now()))
    }

    /// A copy of the current snapshot, after the lazy-completion check.
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut state = self.lock();
        self.refresh(&mut state);
        state.clone()
    }

    pub fn session_type(&self) -> SessionType {
        self.lock().session_type
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.lock().duration_ms)
    }

    /// Reload the shared state file and adopt any change another process
    /// made. History is never written here -- the process that made the
    /// change already recorded it.
    pub fn poll_external(&self) -> Option<ExternalChange> {
        let disk = match self.store.load() {
            Ok(disk) => disk,
            Err(err) => {
                warn!(%err, "could not poll shared timer state");
                return None;
            }
        };
        let mut state = self.lock();
        if disk == *state {
            return None;
        }
        let change = if disk.status == TimerStatus::Idle {
            ExternalChange::Cleared
        } else {
            ExternalChange::Updated(disk.status)
        };
        *state = disk;
        Some(change)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// The lazy-completion check. Runs under the state lock, so the
    /// Running -> Completed transition (and its single history record)
    /// happens at most once no matter how many readers race.
    fn refresh(&self, state: &mut MutexGuard<'_, SessionSnapshot>) {
        if state.status != TimerStatus::Running {
            return;
        }
        let now = Utc::now();
        if state.true_elapsed_ms(now) < state.duration_ms {
            return;
        }

        state.status = TimerStatus::Completed;
        state.elapsed_ms = state.duration_ms;
        self.persist(state);
        self.record(state, true);
        self.emit(
            Event::new(EventType::Completed)
                .with("session_type", state.session_type.as_str())
                .with("duration_secs", state.duration_ms / 1000),
        );
    }

    /// Persistence failures degrade to in-memory-only operation.
    fn persist(&self, state: &SessionSnapshot) {
        if let Err(err) = self.store.save(state) {
            warn!(%err, "could not persist timer state");
        }
    }

    fn record(&self, state: &SessionSnapshot, completed: bool) {
        let ended_at = Utc::now();
        let record = HistoryRecord {
            session_type: state.session_type,
            duration_ms: state.duration_ms,
            started_at: state.started_at.unwrap_or(ended_at),
            ended_at,
            completed,
        };
        if let Err(err) = self.history.append(record) {
            warn!(%err, "could not record session history");
        }
    }

    fn emit(&self, event: Event) {
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }
}
