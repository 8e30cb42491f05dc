use crate::cli::{FinalizeArgs, ProvisionArgs};
use crate::commands::{exported_registry, open_registry};
use crate::error::CliError;
use crate::provision::RunPathProvisioner;
use colored::Colorize;
use resim_core::config::Config;
use std::sync::{Arc, Mutex};

pub fn handle_provision(args: ProvisionArgs, config: &Config) -> Result<(), CliError> {
    let rp = &config.runpath;
    let mask = match &args.realizations {
        Some(spec) => parse_realizations(spec, rp.ensemble_size)?,
        None => vec![true; rp.ensemble_size],
    };

    let registry = Arc::new(Mutex::new(open_registry(rp)?));
    let provisioner = RunPathProvisioner::from_config(rp, registry)?;
    let report = provisioner.create_run_path(&mask, args.iteration)?;

    println!(
        "Provisioned {} realization(s) for iteration {}:",
        report.provisioned.len(),
        report.iteration
    );
    for entry in &report.provisioned {
        println!("  {:>4}  {}", entry.realization(), entry.runpath());
    }
    if report.replaced_links > 0 {
        println!("Replaced {} stale symlink(s).", report.replaced_links);
    }
    for failure in &report.failures {
        eprintln!("{}", format!("  [FAILED] {}", failure).red());
    }

    if !report.is_complete() {
        return Err(CliError::ProvisionFailed {
            failed: report.failures.len(),
            total: report.attempted(),
        });
    }
    Ok(())
}

/// Applies the keep policy to the exported runpaths of the realizations that
/// completed. Rows stay in the runpath list.
pub fn handle_finalize(args: FinalizeArgs, config: &Config) -> Result<(), CliError> {
    let rp = &config.runpath;
    let mask = match &args.realizations {
        Some(spec) => parse_realizations(spec, rp.ensemble_size)?,
        None => vec![true; rp.ensemble_size],
    };

    let registry = exported_registry(rp)?;
    let completed: Vec<_> = registry
        .iter()
        .filter(|e| e.iteration() == args.iteration)
        .filter(|e| mask.get(e.realization()).copied().unwrap_or(false))
        .cloned()
        .collect();

    let provisioner = RunPathProvisioner::from_config(rp, Arc::new(Mutex::new(registry)))?;
    if !provisioner.options().keep.should_remove(rp.run_mode) {
        println!(
            "Keeping {} run path(s) for iteration {}.",
            completed.len(),
            args.iteration
        );
        return Ok(());
    }

    let mut removed = 0;
    for entry in &completed {
        if provisioner.finalize(entry, true)? {
            println!("  {:>4}  {}", entry.realization(), entry.runpath());
            removed += 1;
        }
    }
    println!(
        "Removed {} run path(s) for iteration {}.",
        removed, args.iteration
    );
    Ok(())
}

/// Parses a selection such as `0-3,7` into a mask over the ensemble.
pub fn parse_realizations(spec: &str, ensemble_size: usize) -> Result<Vec<bool>, CliError> {
    let invalid = |reason: String| CliError::InvalidRealizations {
        spec: spec.to_string(),
        reason,
    };
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| invalid(format!("'{}' is not a realization number", s.trim())))
    };

    let mut mask = vec![false; ensemble_size];
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid("empty element".to_string()));
        }
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse(a)?, parse(b)?),
            None => {
                let n = parse(part)?;
                (n, n)
            }
        };
        if start > end {
            return Err(invalid(format!("range {}-{} is reversed", start, end)));
        }
        if end >= ensemble_size {
            return Err(invalid(format!(
                "realization {} is outside an ensemble of {}",
                end, ensemble_size
            )));
        }
        for selected in &mut mask[start..=end] {
            *selected = true;
        }
    }
    Ok(mask)
}
