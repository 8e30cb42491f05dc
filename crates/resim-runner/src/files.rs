use resim_core::config::RealizationFileConfig;
use resim_core::constants::substitution;
use resim_core::errors::ConfigError;
use resim_core::template::substitute_keys;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Template(PathBuf),
    Inline(String),
}

/// A regular file every realization directory is expected to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizationFile {
    target: PathBuf,
    source: FileSource,
}

impl RealizationFile {
    /// `target` is stored without `.` components so it compares equal to the
    /// paths found when walking the runpath.
    pub fn new(target: impl Into<PathBuf>, source: FileSource) -> Result<Self, ConfigError> {
        let raw = target.into();
        let invalid = || {
            ConfigError::General(format!(
                "Realization file target '{}' must be a relative path inside the runpath",
                raw.display()
            ))
        };

        let mut target = PathBuf::new();
        for component in raw.components() {
            match component {
                Component::Normal(part) => target.push(part),
                Component::CurDir => {}
                _ => return Err(invalid()),
            }
        }
        if target.as_os_str().is_empty() {
            return Err(invalid());
        }
        Ok(Self { target, source })
    }

    pub fn inline(target: impl Into<PathBuf>, content: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(target, FileSource::Inline(content.into()))
    }

    pub fn from_config(cfg: &RealizationFileConfig) -> Result<Self, ConfigError> {
        let source = match (&cfg.source, &cfg.content) {
            (Some(path), None) => FileSource::Template(path.clone()),
            (None, Some(content)) => FileSource::Inline(content.clone()),
            _ => {
                return Err(ConfigError::General(format!(
                    "Realization file '{}' needs exactly one of 'source' or 'content'",
                    cfg.target.display()
                )))
            }
        };
        Self::new(&cfg.target, source)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn render(
        &self,
        realization: usize,
        iteration: usize,
        runpath: &str,
        basename: &str,
    ) -> std::io::Result<String> {
        let raw = match &self.source {
            FileSource::Template(path) => fs_err::read_to_string(path)?,
            FileSource::Inline(content) => content.clone(),
        };
        Ok(substitute_keys(
            &raw,
            &[
                (substitution::REALIZATION, realization.to_string()),
                (substitution::ITERATION, iteration.to_string()),
                (substitution::RUNPATH, runpath.to_string()),
                (substitution::BASENAME, basename.to_string()),
            ],
        ))
    }
}
