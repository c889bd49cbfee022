mod cli;
mod paths;
mod run;
mod settings;
mod signals;
mod sinks;

use anyhow::Result;
use cli::{Command, ConfigAction};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    let paths = AppPaths::discover()?;
    match action {
        ConfigAction::Where => {
            println!("Configuration:");
            println!("  dir:   {}", paths.config_dir().display());
            println!("  file:  {}", paths.config_file().display());
            println!(
                "  state: {}",
                if paths.config_file().exists() {
                    "present"
                } else {
                    "missing (defaults apply)"
                }
            );
            Ok(())
        }
        ConfigAction::Init { force } => {
            let path = paths.config_file();
            settings::write_sample(&path, force)?;
            println!("Wrote sample configuration to {}", path.display());
            Ok(())
        }
    }
}
