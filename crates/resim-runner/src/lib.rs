use crate::cli::{Cli, Commands};
use crate::error::CliError;
use resim_core::config;

pub mod builtins;
pub mod cli;
pub mod commands;
pub mod error;
pub mod files;
pub mod provision;

pub fn run(cli: Cli) -> Result<(), CliError> {
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Provision(args) => commands::provision::handle_provision(args, &config),
        Commands::Finalize(args) => commands::provision::handle_finalize(args, &config),
        Commands::ListRunpaths(args) => commands::list::handle_list_runpaths(args, &config),
        Commands::ListJobs => commands::list::handle_list_jobs(&config),
        Commands::RunJob(args) => commands::jobs::handle_run_job(args, &config, cli.verbose > 0),
    }
}
