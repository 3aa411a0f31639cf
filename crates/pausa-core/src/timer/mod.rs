mod engine;
mod interactive;
mod session;

pub use engine::{ExternalChange, Timer};
pub use interactive::{format_duration, run_session, RunnerOptions, SessionOutcome};
pub use session::{SessionSnapshot, SessionType, TimerStatus};
