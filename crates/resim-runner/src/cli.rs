use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Provision realization run paths and dispatch workflow jobs.",
    long_about = "This tool reads a resim configuration, creates the per-realization run \
                  directories of an ensemble and runs the workflow jobs it defines."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, default_value = "./resim.toml")]
    pub config: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level (-v for debug, -vv for trace)")]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create or refresh realization run paths")]
    Provision(ProvisionArgs),

    #[command(about = "Remove completed run paths according to the keep policy")]
    Finalize(FinalizeArgs),

    #[command(about = "List the exported run paths")]
    ListRunpaths(ListRunpathsArgs),

    #[command(about = "List the configured workflow jobs")]
    ListJobs,

    #[command(about = "Run a single workflow job")]
    RunJob(RunJobArgs),
}

#[derive(Args)]
pub struct ProvisionArgs {
    #[arg(short, long, default_value_t = 0, help = "Iteration to provision")]
    pub iteration: usize,

    #[arg(
        short,
        long,
        value_name = "SPEC",
        help = "Realizations to provision, e.g. '0-3,7'. Defaults to the whole ensemble."
    )]
    pub realizations: Option<String>,
}

#[derive(Args)]
pub struct FinalizeArgs {
    #[arg(short, long, default_value_t = 0, help = "Iteration whose run paths completed")]
    pub iteration: usize,

    #[arg(
        short,
        long,
        value_name = "SPEC",
        help = "Realizations that completed successfully. Defaults to the whole ensemble."
    )]
    pub realizations: Option<String>,
}

#[derive(Args)]
pub struct ListRunpathsArgs {
    #[arg(
        long,
        allow_hyphen_values = true,
        help = "Show only the row at this position (negative counts from the end)"
    )]
    pub index: Option<String>,
}

#[derive(Args)]
pub struct RunJobArgs {
    #[arg(value_name = "JOB_NAME")]
    pub name: String,

    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
