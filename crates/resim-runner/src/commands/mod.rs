use crate::error::CliError;
use resim_core::config::RunpathConfig;
use resim_core::model::RegistryPolicy;
use resim_core::runpath::read_export_file;
use resim_core::RunpathRegistry;

pub mod jobs;
pub mod list;
pub mod provision;

/// Opens the registry backing `cfg.export_file`.
///
/// With the append policy the rows already exported are loaded first, so a
/// later export keeps them.
pub(crate) fn open_registry(cfg: &RunpathConfig) -> Result<RunpathRegistry, CliError> {
    let mut registry = RunpathRegistry::new(cfg.export_file.clone());
    if cfg.registry == RegistryPolicy::Append && cfg.export_file.is_file() {
        for entry in read_export_file(&cfg.export_file)? {
            registry.push(entry);
        }
        tracing::debug!(
            "Loaded {} exported runpath(s) from '{}'",
            registry.len(),
            cfg.export_file.display()
        );
    }
    Ok(registry)
}

/// Reads the exported runpath list; a missing file is an empty list.
pub(crate) fn exported_registry(cfg: &RunpathConfig) -> Result<RunpathRegistry, CliError> {
    let mut registry = RunpathRegistry::new(cfg.export_file.clone());
    if cfg.export_file.is_file() {
        for entry in read_export_file(&cfg.export_file)? {
            registry.push(entry);
        }
    }
    Ok(registry)
}
