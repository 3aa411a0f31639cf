use clap::{CommandFactory, Parser, Subcommand};
use pausa_core::Config;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "pausa", version, about = "Session timer with Lua plugin hooks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a work session and stay in the foreground
    Start {
        /// Session length, e.g. "25m", "1h", "90s" or bare minutes
        duration: Option<String>,
    },
    /// Start a short break
    Break {
        /// Break length, e.g. "5m"
        duration: Option<String>,
    },
    /// Start a long break
    LongBreak {
        /// Break length, e.g. "15m"
        duration: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Stop the current session and record it
    Stop,
    /// Show current session status
    Status {
        /// Output status as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent session history
    History {
        /// Maximum number of records to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Output history as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plugin management
    Plugin {
        #[command(subcommand)]
        action: commands::plugin::PluginAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    common::init_logging(&config);

    let result = match cli.command {
        Commands::Start { duration } => {
            commands::timer::start(&config, duration, pausa_core::SessionType::Work).await
        }
        Commands::Break { duration } => {
            commands::timer::start(&config, duration, pausa_core::SessionType::Break).await
        }
        Commands::LongBreak { duration } => {
            commands::timer::start(&config, duration, pausa_core::SessionType::LongBreak).await
        }
        Commands::Pause => commands::timer::pause(&config).await,
        Commands::Resume => commands::timer::resume(&config).await,
        Commands::Stop => commands::timer::stop(&config).await,
        Commands::Status { json } => commands::timer::status(&config, json).await,
        Commands::History { limit, json } => commands::history::run(limit, json),
        Commands::Plugin { action } => commands::plugin::run(&config, action),
        Commands::Config { action } => commands::config::run(&config, action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pausa", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
