//! # Pausa Core Library
//!
//! Core business logic for the pausa session timer. Commands run as
//! independent short-lived processes; the persisted state file is the
//! cross-process source of truth, and every status read may perform the
//! lazy Running -> Completed transition as a side effect.
//!
//! ## Key Components
//!
//! - [`Timer`]: session state machine with lazily-evaluating readers
//! - [`StateStore`] / [`HistoryStore`]: JSON persistence under the data dir
//! - [`PluginHost`]: one sandboxed Lua interpreter per plugin script
//! - [`EventBus`]: bounded queue plus background consumer that fans
//!   lifecycle events out to plugin hooks without blocking the timer
//! - [`run_session`]: foreground interactive loop with key controls and
//!   external-change polling

pub mod error;
pub mod events;
pub mod plugins;
pub mod store;
pub mod timer;

pub use error::{ConfigError, PluginError, StoreError, TimerError};
pub use events::{Event, EventType, EventValue};
pub use plugins::{EventBus, PluginHost, PluginInfo, PluginMeta};
pub use store::{Config, HistoryRecord, HistoryStore, StateStore};
pub use timer::{
    format_duration, run_session, ExternalChange, RunnerOptions, SessionOutcome, SessionSnapshot,
    SessionType, Timer, TimerStatus,
};
