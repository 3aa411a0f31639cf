use clap::Subcommand;
use pausa_core::{Config, PluginHost};

#[derive(Subcommand)]
pub enum PluginAction {
    /// List plugins discovered in the plugin directory
    List {
        /// Output plugin list as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(config: &Config, action: PluginAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PluginAction::List { json } => list(config, json),
    }
}

fn list(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let host = PluginHost::new();
    let dir = config.plugins_dir()?;
    host.load_dir(&dir)?;
    for name in &config.plugins.disabled {
        let _ = host.set_enabled(name, false);
    }

    let plugins = host.list();
    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    if plugins.is_empty() {
        println!("No plugins found in {}", dir.display());
        return Ok(());
    }

    println!("{:<20} {:<10} {:<8} Description", "Name", "Version", "Enabled");
    for plugin in &plugins {
        println!(
            "{:<20} {:<10} {:<8} {}",
            plugin.meta.name,
            plugin.meta.version,
            if plugin.enabled { "yes" } else { "no" },
            plugin.meta.description
        );
    }
    Ok(())
}
