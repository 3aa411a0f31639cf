//! Foreground interactive session loop.
//!
//! One cooperative loop per process, multiplexing key input, Ctrl-C, a
//! render tick and a fixed-interval poll of the shared state file. Whichever
//! source fires first ends the loop. The keyboard reader is a detached
//! thread; cancelling it is best-effort and it may stay blocked on the next
//! key until the process exits.

use std::io::Write as _;
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::TimerError;

use super::engine::{ExternalChange, Timer};
use super::session::{SessionType, TimerStatus};

const PROGRESS_BAR_WIDTH: usize = 30;

/// Loop pacing. The poll interval controls how quickly a stop or reset
/// issued by another process is noticed.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub render_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            render_interval: Duration::from_millis(200),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The session ran out its duration.
    Completed,
    /// The user stopped it with a key or Ctrl-C.
    Stopped,
    /// Another process stopped or reset it; history was not re-written.
    External,
}

enum KeyCommand {
    Pause,
    Resume,
    Stop,
}

/// Start a session and block this process until it ends, rendering
/// progress and accepting p/r/q/s key controls.
pub async fn run_session(
    timer: &Timer,
    duration: Duration,
    session_type: SessionType,
    opts: &RunnerOptions,
) -> Result<SessionOutcome, TimerError> {
    // Adopt an expired session left behind by another process before
    // checking whether a start is legal.
    timer.status();
    timer.start(duration, session_type)?;

    println!("Timer started for {}", format_duration(duration));
    println!("Session type: {}", session_type.label());
    println!("Press 'p' to pause, 'r' to resume, 'q'/'s' to stop, Ctrl+C to exit.");

    let raw = RawModeGuard::enable();
    let (key_tx, key_rx) = mpsc::channel(8);
    spawn_key_reader(key_tx);

    let outcome = control_loop(timer, key_rx, opts).await;

    drop(raw);
    clear_line();
    match outcome {
        SessionOutcome::Completed => println!("Session complete. Recorded to history."),
        SessionOutcome::Stopped => println!("Timer stopped."),
        SessionOutcome::External => println!("Timer stopped by another process."),
    }
    Ok(outcome)
}

async fn control_loop(
    timer: &Timer,
    mut key_rx: mpsc::Receiver<KeyCommand>,
    opts: &RunnerOptions,
) -> SessionOutcome {
    let mut render = tokio::time::interval(opts.render_interval);
    let mut poll = tokio::time::interval(opts.poll_interval);
    let mut keys_open = true;

    loop {
        tokio::select! {
            _ = render.tick() => {
                match timer.status() {
                    TimerStatus::Completed => return SessionOutcome::Completed,
                    TimerStatus::Idle => return SessionOutcome::External,
                    TimerStatus::Paused => draw_paused(),
                    TimerStatus::Running => draw_progress(timer),
                }
            }
            _ = poll.tick() => {
                match timer.poll_external() {
                    Some(ExternalChange::Cleared) => return SessionOutcome::External,
                    // An external pause/resume is adopted and the loop
                    // continues rendering the new state.
                    Some(ExternalChange::Updated(_)) | None => {}
                }
            }
            key = key_rx.recv(), if keys_open => match key {
                Some(KeyCommand::Pause) => {
                    if timer.pause().is_ok() {
                        draw_paused();
                    }
                }
                Some(KeyCommand::Resume) => {
                    let _ = timer.resume();
                }
                Some(KeyCommand::Stop) => {
                    let _ = timer.stop();
                    return SessionOutcome::Stopped;
                }
                // Not a terminal; keep running on ticks alone.
                None => keys_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                let _ = timer.stop();
                return SessionOutcome::Stopped;
            }
        }
    }
}

/// Reads key events on a detached thread. The thread ends when the
/// receiver is dropped or stdin stops producing events; until then it may
/// stay blocked inside `event::read`.
fn spawn_key_reader(tx: mpsc::Sender<KeyCommand>) {
    std::thread::spawn(move || loop {
        let ev = match event::read() {
            Ok(ev) => ev,
            Err(_) => return,
        };
        if let TermEvent::Key(key) = ev {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let cmd = match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    KeyCommand::Stop
                }
                KeyCode::Char('p') => KeyCommand::Pause,
                KeyCode::Char('r') => KeyCommand::Resume,
                KeyCode::Char('q') | KeyCode::Char('s') => KeyCommand::Stop,
                _ => continue,
            };
            if tx.blocking_send(cmd).is_err() {
                return;
            }
        }
    });
}

struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    fn enable() -> Self {
        match terminal::enable_raw_mode() {
            Ok(()) => Self { active: true },
            Err(err) => {
                // Not a terminal (tests, pipes); key controls are inert.
                debug!(%err, "raw mode unavailable");
                Self { active: false }
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = terminal::disable_raw_mode();
        }
    }
}

fn draw_progress(timer: &Timer) {
    let snapshot = timer.snapshot();
    let now = Utc::now();
    let progress = snapshot.progress(now);
    let remaining = Duration::from_millis(snapshot.remaining_ms(now));
    print!(
        "\r{} {:3}% {} | {}  ",
        progress_bar(progress, PROGRESS_BAR_WIDTH),
        (progress * 100.0) as u32,
        format_duration(remaining),
        snapshot.session_type.label()
    );
    let _ = std::io::stdout().flush();
}

fn draw_paused() {
    print!("\rPaused - press 'r' to resume{}", " ".repeat(40));
    let _ = std::io::stdout().flush();
}

fn clear_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = std::io::stdout().flush();
}

fn progress_bar(progress: f64, width: usize) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let filled = (width as f64 * progress) as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    for _ in 0..filled {
        bar.push('█');
    }
    for _ in filled..width {
        bar.push('░');
    }
    bar.push(']');
    bar
}

/// Human-readable duration, e.g. "25 minutes", "1 hour 5 minutes",
/// "30 seconds".
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        if minutes == 0 {
            return format!("{} hour{}", hours, plural(hours));
        }
        return format!(
            "{} hour{} {} minute{}",
            hours,
            plural(hours),
            minutes,
            plural(minutes)
        );
    }
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if minutes == 0 {
        return format!("{} second{}", seconds, plural(seconds));
    }
    if seconds == 0 {
        return format!("{} minute{}", minutes, plural(minutes));
    }
    format!(
        "{} minute{} {} second{}",
        minutes,
        plural(minutes),
        seconds,
        plural(seconds)
    )
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_with_progress() {
        assert_eq!(progress_bar(0.0, 4), "[░░░░]");
        assert_eq!(progress_bar(0.5, 4), "[██░░]");
        assert_eq!(progress_bar(1.0, 4), "[████]");
        assert_eq!(progress_bar(2.0, 4), "[████]");
    }

    #[test]
    fn durations_format_human_readably() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30 seconds");
        assert_eq!(format_duration(Duration::from_secs(1)), "1 second");
        assert_eq!(format_duration(Duration::from_secs(60)), "1 minute");
        assert_eq!(
            format_duration(Duration::from_secs(25 * 60)),
            "25 minutes"
        );
        assert_eq!(
            format_duration(Duration::from_secs(90)),
            "1 minute 30 seconds"
        );
        assert_eq!(format_duration(Duration::from_secs(3600)), "1 hour");
        assert_eq!(
            format_duration(Duration::from_secs(3900)),
            "1 hour 5 minutes"
        );
    }
}
