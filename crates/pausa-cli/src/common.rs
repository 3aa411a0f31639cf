//! Shared plumbing for CLI commands: logging, timer construction, the
//! plugin runtime and duration parsing.

use std::sync::Arc;
use std::time::Duration;

use pausa_core::store::data_dir;
use pausa_core::{Config, EventBus, HistoryStore, PluginHost, StateStore, Timer};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Give fire-and-forget hook invocations a chance to run before a
/// short-lived command process tears the runtime down.
const DISPATCH_GRACE: Duration = Duration::from_millis(100);

/// Logs go to a file under the data directory so the interactive display
/// stays clean; falls back to stderr. RUST_LOG overrides the configured
/// level.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let log_file = data_dir().ok().and_then(|dir| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("pausa.log"))
            .ok()
    });

    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// One timer per process, reconstructed from the shared state file.
pub fn build_timer() -> Result<Timer, Box<dyn std::error::Error>> {
    Ok(Timer::new(StateStore::open()?, HistoryStore::open()?))
}

pub struct PluginRuntime {
    pub host: Arc<PluginHost>,
    pub bus: Arc<EventBus>,
}

/// Load plugins and spawn the dispatch consumer. Load failures are
/// logged and never abort the command.
pub fn start_plugins(config: &Config) -> Option<PluginRuntime> {
    if !config.plugins.enabled {
        return None;
    }
    let dir = match config.plugins_dir() {
        Ok(dir) => dir,
        Err(err) => {
            warn!(%err, "plugin directory unavailable");
            return None;
        }
    };

    let host = Arc::new(PluginHost::new());
    if let Err(err) = host.load_dir(&dir) {
        warn!(path = %dir.display(), %err, "could not scan plugin directory");
    }
    for name in &config.plugins.disabled {
        if let Err(err) = host.set_enabled(name, false) {
            warn!(plugin = %name, %err, "could not disable plugin");
        }
    }

    let bus = EventBus::start(Arc::clone(&host), config.events.queue_capacity);
    Some(PluginRuntime { host, bus })
}

pub async fn shutdown_plugins(runtime: Option<PluginRuntime>) {
    if let Some(runtime) = runtime {
        tokio::time::sleep(DISPATCH_GRACE).await;
        runtime.bus.shutdown().await;
        runtime.host.shutdown();
    }
}

/// Parse "30m", "1h", "90s" or bare minutes.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    if let Ok(minutes) = s.parse::<u64>() {
        return Ok(Duration::from_secs(minutes * 60));
    }
    let (value, unit) = s.split_at(s.len().saturating_sub(1));
    let value: u64 = value
        .parse()
        .map_err(|_| format!("unable to parse duration: {s}"))?;
    match unit {
        "h" => Ok(Duration::from_secs(value * 3600)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(format!("unable to parse duration: {s}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_parse_with_and_without_units() {
        assert_eq!(parse_duration("25"), Ok(Duration::from_secs(25 * 60)));
        assert_eq!(parse_duration("30m"), Ok(Duration::from_secs(30 * 60)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration(" 5M "), Ok(Duration::from_secs(300)));
    }

    #[test]
    fn malformed_durations_are_rejected() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("-5m").is_err());
    }
}
