use clap::{CommandFactory, Parser};
use colored::Colorize;
use resim_core::{config, logging};
use resim_runner::cli::Commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "resim")]
#[command(about = "Realization run paths and workflow jobs for reservoir ensembles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long, global = true, default_value = "./resim.toml")]
    config: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level")]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            if let Err(e) = Cli::command().print_help() {
                eprintln!("{}", format!("[ERROR] {}", e).red());
                std::process::exit(1);
            }
            return;
        }
    };

    logging::set_log_level_from_env();
    logging::set_log_level_from_verbosity(cli.verbose);

    let logging_config = config::load_config(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_default();

    if let Err(e) = logging::init_session_logger(&logging_config) {
        eprintln!(
            "{}",
            format!("[ERROR] Failed to initialize session logger: {}", e).red()
        );
    }

    let runner_cli = resim_runner::cli::Cli {
        command,
        config: cli.config,
        verbose: cli.verbose,
    };

    if let Err(e) = resim_runner::run(runner_cli) {
        eprintln!("{}", format!("[ERROR] {}", e).red());
        std::process::exit(1);
    }
}
