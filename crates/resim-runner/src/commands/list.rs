use crate::cli::ListRunpathsArgs;
use crate::commands::exported_registry;
use crate::error::CliError;
use resim_core::config::Config;
use resim_executor::WorkflowJobList;

pub fn handle_list_runpaths(args: ListRunpathsArgs, config: &Config) -> Result<(), CliError> {
    let registry = exported_registry(&config.runpath)?;

    if let Some(index) = args.index {
        let entry = registry.lookup(&index)?;
        println!("{}", entry.export_line());
        return Ok(());
    }

    if registry.is_empty() {
        println!(
            "No runpaths exported to '{}'.",
            registry.export_file().display()
        );
        return Ok(());
    }
    for entry in &registry {
        println!("{}", entry.export_line());
    }
    Ok(())
}

pub fn handle_list_jobs(config: &Config) -> Result<(), CliError> {
    let jobs = WorkflowJobList::from_definitions(&config.jobs)?;
    if jobs.is_empty() {
        println!("No workflow jobs configured.");
        return Ok(());
    }

    for job in jobs.iter() {
        let types: Vec<String> = job.argument_types().iter().map(|t| t.to_string()).collect();
        println!(
            "{:<24} {:<48} args {}..{} [{}]",
            job.name(),
            job.kind().to_string(),
            job.minimum_argument_count(),
            job.maximum_argument_count(),
            types.join(", ")
        );
    }
    Ok(())
}
