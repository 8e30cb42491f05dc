use crate::files::RealizationFile;
use rayon::prelude::*;
use resim_core::config::RunpathConfig;
use resim_core::errors::{ConfigError, RegistryError};
use resim_core::model::{KeepRunpath, RegistryPolicy, RunMode, RunpathEntry};
use resim_core::template::PathTemplate;
use resim_core::RunpathRegistry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Runpath export failed: {0}")]
    Export(#[from] RegistryError),
}

#[derive(Error, Debug)]
#[error("Realization {realization} (iteration {iteration}) at '{}': {source}", .runpath.display())]
pub struct RealizationFailure {
    pub realization: usize,
    pub iteration: usize,
    pub runpath: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    pub pre_clear: bool,
    pub registry_policy: RegistryPolicy,
    pub keep: KeepRunpath,
    pub run_mode: RunMode,
}

impl ProvisionOptions {
    pub fn from_config(cfg: &RunpathConfig) -> Self {
        Self {
            pre_clear: cfg.pre_clear,
            registry_policy: cfg.registry,
            keep: cfg.keep,
            run_mode: cfg.run_mode,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub iteration: usize,
    pub provisioned: Vec<RunpathEntry>,
    pub failures: Vec<RealizationFailure>,
    pub replaced_links: usize,
}

impl ProvisionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.provisioned.len() + self.failures.len()
    }
}

struct Provisioned {
    entry: RunpathEntry,
    replaced_links: usize,
}

/// Creates realization directories and records them in the runpath registry.
pub struct RunPathProvisioner {
    template: Arc<dyn PathTemplate>,
    files: Vec<RealizationFile>,
    options: ProvisionOptions,
    registry: Arc<Mutex<RunpathRegistry>>,
}

impl RunPathProvisioner {
    pub fn new(
        template: Arc<dyn PathTemplate>,
        files: Vec<RealizationFile>,
        options: ProvisionOptions,
        registry: Arc<Mutex<RunpathRegistry>>,
    ) -> Self {
        Self {
            template,
            files,
            options,
            registry,
        }
    }

    pub fn from_config(
        cfg: &RunpathConfig,
        registry: Arc<Mutex<RunpathRegistry>>,
    ) -> Result<Self, ConfigError> {
        let files = cfg
            .files
            .iter()
            .map(RealizationFile::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(
            Arc::new(cfg.runpath_format()?),
            files,
            ProvisionOptions::from_config(cfg),
            registry,
        ))
    }

    pub fn registry(&self) -> Arc<Mutex<RunpathRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    fn lock_registry(&self) -> MutexGuard<'_, RunpathRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Provisions every realization selected by `mask` for `iteration`.
    ///
    /// A filesystem error for one realization is collected in the report and
    /// does not stop the others. Only an export failure fails the call.
    pub fn create_run_path(
        &self,
        mask: &[bool],
        iteration: usize,
    ) -> Result<ProvisionReport, ProvisionError> {
        let selected = mask.iter().filter(|m| **m).count();
        tracing::info!(
            "Provisioning {} realization(s) for iteration {}",
            selected,
            iteration
        );

        let results: Vec<Result<Provisioned, RealizationFailure>> = mask
            .par_iter()
            .enumerate()
            .filter(|(_, selected)| **selected)
            .map(|(realization, _)| self.provision_realization(realization, iteration))
            .collect();

        let mut report = ProvisionReport {
            iteration,
            ..Default::default()
        };

        let mut registry = self.lock_registry();
        if self.options.registry_policy == RegistryPolicy::Clear {
            registry.clear();
        }

        for result in results {
            match result {
                Ok(done) => {
                    registry.push(done.entry.clone());
                    report.replaced_links += done.replaced_links;
                    report.provisioned.push(done.entry);
                }
                Err(failure) => {
                    tracing::warn!("{}", failure);
                    report.failures.push(failure);
                }
            }
        }

        registry.export()?;
        tracing::info!(
            "Provisioned {}/{} realization(s); runpath list written to '{}'",
            report.provisioned.len(),
            selected,
            registry.export_file().display()
        );
        Ok(report)
    }

    fn provision_realization(
        &self,
        realization: usize,
        iteration: usize,
    ) -> Result<Provisioned, RealizationFailure> {
        let (runpath, basename) = self.template.render(realization, iteration);
        let dir = PathBuf::from(&runpath);
        let fail = |source: std::io::Error| RealizationFailure {
            realization,
            iteration,
            runpath: dir.clone(),
            source,
        };

        let replaced_links = self.prepare_directory(&dir).map_err(fail)?;
        fs_err::create_dir_all(&dir).map_err(fail)?;

        for file in &self.files {
            let content = file
                .render(realization, iteration, &runpath, &basename)
                .map_err(fail)?;
            let target = dir.join(file.target());
            if let Some(parent) = target.parent() {
                fs_err::create_dir_all(parent).map_err(fail)?;
            }
            fs_err::write(&target, content).map_err(fail)?;
        }

        tracing::debug!(
            "Realization {} iteration {} ready at '{}'",
            realization,
            iteration,
            runpath
        );
        Ok(Provisioned {
            entry: RunpathEntry::new(realization, iteration, runpath, basename),
            replaced_links,
        })
    }

    /// Makes an existing runpath safe to write into. Returns the number of
    /// symlinks removed.
    fn prepare_directory(&self, dir: &Path) -> std::io::Result<usize> {
        let meta = match fs_err::symlink_metadata(dir) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        if meta.file_type().is_symlink() {
            tracing::debug!("Replacing symlinked runpath '{}'", dir.display());
            fs_err::remove_file(dir)?;
            return Ok(1);
        }

        if self.options.pre_clear {
            clear_directory(dir)?;
            return Ok(0);
        }

        remove_stale_links(dir, &self.expected_paths())
    }

    /// Relative paths of every expected file and of the directories leading to it.
    fn expected_paths(&self) -> HashSet<PathBuf> {
        let mut expected = HashSet::new();
        for file in &self.files {
            let mut path = file.target().to_path_buf();
            loop {
                if path.as_os_str().is_empty() {
                    break;
                }
                expected.insert(path.clone());
                if !path.pop() {
                    break;
                }
            }
        }
        expected
    }

    /// Removes a completed realization directory when the keep policy says so.
    pub fn finalize(&self, entry: &RunpathEntry, succeeded: bool) -> std::io::Result<bool> {
        if !succeeded || !self.options.keep.should_remove(self.options.run_mode) {
            return Ok(false);
        }
        let dir = Path::new(entry.runpath());
        if !dir.exists() {
            return Ok(false);
        }
        tracing::info!(
            "Removing runpath of realization {} at '{}'",
            entry.realization(),
            dir.display()
        );
        fs_err::remove_dir_all(dir)?;
        Ok(true)
    }
}

fn remove_stale_links(dir: &Path, expected: &HashSet<PathBuf>) -> std::io::Result<usize> {
    let relevant = |path: &Path| {
        path.strip_prefix(dir)
            .map(|rel| rel.as_os_str().is_empty() || expected.contains(rel))
            .unwrap_or(false)
    };

    let mut removed = 0;
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| relevant(e.path()));

    for entry in walker {
        let entry = entry?;
        if entry.depth() > 0 && entry.path_is_symlink() {
            tracing::debug!("Replacing stale symlink '{}'", entry.path().display());
            fs_err::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn clear_directory(dir: &Path) -> std::io::Result<()> {
    tracing::debug!("Clearing runpath '{}'", dir.display());
    for entry in fs_err::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs_err::remove_dir_all(&path)?;
        } else {
            fs_err::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioner_with(files: Vec<RealizationFile>) -> RunPathProvisioner {
        let template = |iens: usize, iter: usize| (format!("r{}/i{}", iens, iter), "B".to_string());
        RunPathProvisioner::new(
            Arc::new(template),
            files,
            ProvisionOptions::default(),
            Arc::new(Mutex::new(RunpathRegistry::new(""))),
        )
    }

    #[test]
    fn test_expected_paths_include_parents() {
        let provisioner = provisioner_with(vec![
            RealizationFile::inline("grid/permx.grdcel", "").unwrap(),
            RealizationFile::inline("top.txt", "").unwrap(),
        ]);
        let expected = provisioner.expected_paths();
        assert!(expected.contains(Path::new("grid/permx.grdcel")));
        assert!(expected.contains(Path::new("grid")));
        assert!(expected.contains(Path::new("top.txt")));
        assert_eq!(expected.len(), 3);
    }

    #[test]
    fn test_report_counts() {
        let report = ProvisionReport {
            iteration: 0,
            provisioned: vec![RunpathEntry::new(0, 0, "a", "b")],
            failures: vec![RealizationFailure {
                realization: 1,
                iteration: 0,
                runpath: PathBuf::from("x"),
                source: std::io::Error::other("boom"),
            }],
            replaced_links: 0,
        };
        assert!(!report.is_complete());
        assert_eq!(report.attempted(), 2);
        assert!(report.failures[0].to_string().contains("Realization 1"));
    }
}
