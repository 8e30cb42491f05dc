use clap::Parser;
use colored::Colorize;
use resim_core::logging;
use resim_runner::cli::Cli;

fn main() {
    let cli = Cli::parse();

    logging::set_log_level_from_env();
    logging::set_log_level_from_verbosity(cli.verbose);
    logging::init_stderr_logger();

    if let Err(e) = resim_runner::run(cli) {
        eprintln!("{}", format!("[ERROR] {}", e).red());
        std::process::exit(1);
    }
}
