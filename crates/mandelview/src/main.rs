mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};
use paths::AppPaths;
use viewconfig::ViewerFile;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Check(args)) => run::check(args),
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Where => run_config_where(),
        ConfigAction::Defaults => run_config_defaults(),
    }
}

fn run_config_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    let file = paths.config_file();
    println!("Configuration:");
    println!("  dir:   {}", paths.config_dir().display());
    println!("  file:  {}", file.display());
    if !file.exists() {
        println!("  (file not present; built-in defaults apply)");
    }
    Ok(())
}

fn run_config_defaults() -> Result<()> {
    print!("{}", ViewerFile::default().to_toml_string()?);
    Ok(())
}
