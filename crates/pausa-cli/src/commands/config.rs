use clap::Subcommand;
use pausa_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the active configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}

pub fn run(config: &Config, action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
            Ok(())
        }
    }
}
