//! Session snapshot types.
//!
//! The snapshot is the single persisted record representing the current
//! session, shared across processes via the state file. While Running the
//! true elapsed time is `elapsed_ms` plus the wall-clock stretch since
//! `started_at`; in every other state `elapsed_ms` is exact.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The state of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

/// The type of session being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    Work,
    Break,
    LongBreak,
}

impl SessionType {
    /// Wire name, as seen in the state file and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::Break => "break",
            SessionType::LongBreak => "long-break",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::Break => "break",
            SessionType::LongBreak => "long break",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted session record.
///
/// Invariant: `duration_ms > 0` whenever `status` is not Idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: TimerStatus,
    pub session_type: SessionType,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            session_type: SessionType::Work,
            started_at: None,
            duration_ms: 0,
            elapsed_ms: 0,
        }
    }
}

impl SessionSnapshot {
    /// True elapsed time at `now`: the accumulated span plus, while
    /// Running, the wall-clock stretch since the last start/resume.
    pub fn true_elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let mut elapsed = self.elapsed_ms;
        if self.status == TimerStatus::Running {
            if let Some(started_at) = self.started_at {
                elapsed += (now - started_at).num_milliseconds().max(0) as u64;
            }
        }
        elapsed
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        self.duration_ms.saturating_sub(self.true_elapsed_ms(now))
    }

    /// Progress in [0, 1]; 0 when no duration is set.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.true_elapsed_ms(now) as f64 / self.duration_ms as f64).min(1.0)
    }
}
