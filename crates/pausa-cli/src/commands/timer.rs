use std::sync::Arc;

use chrono::Utc;
use pausa_core::{format_duration, run_session, Config, RunnerOptions, SessionType, TimerStatus};

use crate::common;

/// Start a session and block until it completes, is stopped, or another
/// process clears it.
pub async fn start(
    config: &Config,
    duration: Option<String>,
    session_type: SessionType,
) -> Result<(), Box<dyn std::error::Error>> {
    let duration = match duration {
        Some(raw) => common::parse_duration(&raw)?,
        None => match session_type {
            SessionType::Work => config.work_duration(),
            SessionType::Break => config.short_break_duration(),
            SessionType::LongBreak => config.long_break_duration(),
        },
    };

    let plugins = common::start_plugins(config);
    let mut timer = common::build_timer()?;
    if let Some(runtime) = &plugins {
        timer = timer.with_bus(Arc::clone(&runtime.bus));
    }

    let result = run_session(&timer, duration, session_type, &RunnerOptions::default()).await;
    common::shutdown_plugins(plugins).await;
    result?;
    Ok(())
}

pub async fn pause(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let plugins = common::start_plugins(config);
    let mut timer = common::build_timer()?;
    if let Some(runtime) = &plugins {
        timer = timer.with_bus(Arc::clone(&runtime.bus));
    }

    let result = timer.pause();
    if result.is_ok() {
        println!("Session paused at {}", format_duration(timer.elapsed()));
    }
    common::shutdown_plugins(plugins).await;
    result?;
    Ok(())
}

pub async fn resume(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let plugins = common::start_plugins(config);
    let mut timer = common::build_timer()?;
    if let Some(runtime) = &plugins {
        timer = timer.with_bus(Arc::clone(&runtime.bus));
    }

    let result = timer.resume();
    if result.is_ok() {
        let snapshot = timer.snapshot();
        println!(
            "Session resumed, {} remaining",
            format_duration(std::time::Duration::from_millis(
                snapshot.remaining_ms(Utc::now())
            ))
        );
    }
    common::shutdown_plugins(plugins).await;
    result?;
    Ok(())
}

pub async fn stop(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let plugins = common::start_plugins(config);
    let mut timer = common::build_timer()?;
    if let Some(runtime) = &plugins {
        timer = timer.with_bus(Arc::clone(&runtime.bus));
    }

    let result = timer.stop();
    if result.is_ok() {
        println!("Timer stopped. Session recorded to history.");
    }
    common::shutdown_plugins(plugins).await;
    result?;
    Ok(())
}

/// Render current status. The read itself may complete an expired session
/// (and notify plugins), so the plugin runtime is wired up here too.
pub async fn status(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let plugins = common::start_plugins(config);
    let mut timer = common::build_timer()?;
    if let Some(runtime) = &plugins {
        timer = timer.with_bus(Arc::clone(&runtime.bus));
    }

    let snapshot = timer.snapshot();
    common::shutdown_plugins(plugins).await;

    let now = Utc::now();
    let elapsed = std::time::Duration::from_millis(snapshot.true_elapsed_ms(now));
    let remaining = std::time::Duration::from_millis(snapshot.remaining_ms(now));
    let progress = snapshot.progress(now);

    if json {
        let payload = serde_json::json!({
            "status": snapshot.status,
            "session_type": snapshot.session_type,
            "start_time": snapshot.started_at.map(|t| t.to_rfc3339()),
            "duration_secs": snapshot.duration_ms / 1000,
            "elapsed_secs": elapsed.as_secs(),
            "remaining_secs": remaining.as_secs(),
            "progress": progress,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let status = match snapshot.status {
        TimerStatus::Idle => "idle",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
        TimerStatus::Completed => "completed",
    };
    println!("Status:        {status}");
    println!("Session type:  {}", snapshot.session_type.label());
    match snapshot.started_at {
        Some(started_at) => println!(
            "Start time:    {}",
            started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("Start time:    -"),
    }
    println!(
        "Duration:      {}",
        format_duration(std::time::Duration::from_millis(snapshot.duration_ms))
    );
    println!("Elapsed:       {}", format_duration(elapsed));
    println!("Remaining:     {}", format_duration(remaining));
    println!("Progress:      {:3.0}%", progress * 100.0);
    Ok(())
}
