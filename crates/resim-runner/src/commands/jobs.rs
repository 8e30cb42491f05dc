use crate::builtins::{workflow_context, Ensemble};
use crate::cli::RunJobArgs;
use crate::commands::exported_registry;
use crate::error::CliError;
use resim_core::config::Config;
use resim_executor::{RunResult, WorkflowJobList};
use std::sync::Arc;
use tokio::runtime::Runtime as TokioRuntime;

pub fn handle_run_job(args: RunJobArgs, config: &Config, verbose: bool) -> Result<(), CliError> {
    let jobs = Arc::new(WorkflowJobList::from_definitions(&config.jobs)?);
    let job = jobs
        .get(&args.name)
        .ok_or_else(|| CliError::JobNotFound(args.name.clone()))?;

    let runpaths = exported_registry(&config.runpath)?.iter().cloned().collect();
    let ctx = workflow_context(Ensemble::new(&config.runpath, runpaths)?);

    let handler_jobs = Arc::clone(&jobs);
    if let Err(e) = ctrlc::set_handler(move || handler_jobs.cancel_all()) {
        tracing::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let rt = TokioRuntime::new()?;
    let result = rt.block_on(job.run(&ctx, &args.args, verbose))?;

    match result {
        RunResult::Internal(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        RunResult::External(outcome) => {
            print!("{}", outcome.stdout);
            match outcome.failure {
                None => Ok(()),
                Some(failure) => Err(CliError::ExecutionFailed {
                    message: format!("workflow job '{}' failed", job.name()),
                    summary: failure.to_string(),
                }),
            }
        }
    }
}
