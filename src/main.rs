use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info};

use rusty_lgn::config::SimulationConfig;
use rusty_lgn::error::LGNError;

/// Simulate the responses of retinal, thalamic and cortical cells to visual stimuli.
#[derive(Parser, Debug)]
#[command(name = "rusty_lgn", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the simulation described by a JSON configuration
    Run {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Path to the report file, printed to stdout if missing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print an example thalamocortical configuration
    Template,
}

fn execute(cli: Cli) -> Result<(), LGNError> {
    match cli.command {
        Command::Run { config, output } => {
            info!("Loading configuration from {}", config.display());
            let report = SimulationConfig::from_file(&config)?.run()?;
            match output {
                Some(path) => {
                    report.save_to(&path)?;
                    info!("Report saved to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Command::Template => {
            let config = SimulationConfig::thalamocortical()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = execute(Cli::parse()) {
        error!("{}", e);
        process::exit(1);
    }
}
