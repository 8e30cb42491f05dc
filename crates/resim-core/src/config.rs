use crate::constants::defaults;
use crate::errors::ConfigError;
use crate::model::{ContentType, KeepRunpath, RegistryPolicy, RunMode};
use crate::template::RunpathFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub max_files: usize,
    pub max_age_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_age_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RealizationFileConfig {
    pub target: PathBuf,
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunpathConfig {
    pub root: PathBuf,
    pub format: String,
    pub basename: String,
    pub export_file: PathBuf,
    pub ensemble_size: usize,
    pub pre_clear: bool,
    pub keep: KeepRunpath,
    pub run_mode: RunMode,
    pub registry: RegistryPolicy,
    pub files: Vec<RealizationFileConfig>,
}

impl Default for RunpathConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            format: defaults::RUNPATH_FORMAT.to_string(),
            basename: defaults::BASENAME_FORMAT.to_string(),
            export_file: PathBuf::from(defaults::EXPORT_FILE),
            ensemble_size: 1,
            pre_clear: false,
            keep: KeepRunpath::default(),
            run_mode: RunMode::default(),
            registry: RegistryPolicy::default(),
            files: Vec::new(),
        }
    }
}

impl RunpathConfig {
    pub fn runpath_format(&self) -> Result<RunpathFormat, ConfigError> {
        RunpathFormat::new(&self.root, &self.format, &self.basename)
    }
}

/// Raw workflow job definition as it appears in the configuration file.
///
/// The flags are not checked here; the executor resolves them into a job
/// kind and rejects inconsistent combinations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JobDefinition {
    pub name: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub script: Option<PathBuf>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default)]
    pub min_args: usize,
    #[serde(default)]
    pub max_args: usize,
    #[serde(default)]
    pub arg_types: Vec<ContentType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
    pub runpath: RunpathConfig,
    pub jobs: Vec<JobDefinition>,
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
    }
    tracing::debug!("Loading configuration from '{}'", path.display());

    let content = fs_err::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base_dir)?;
    Ok(config)
}

impl Config {
    /// Expands `~`/environment variables and anchors relative paths at `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) -> Result<(), ConfigError> {
        let rp = &mut self.runpath;
        rp.root = resolve(base_dir, &rp.root)?;
        rp.export_file = resolve(base_dir, &rp.export_file)?;
        for file in &mut rp.files {
            if let Some(source) = &file.source {
                file.source = Some(resolve(base_dir, source)?);
            }
        }
        for job in &mut self.jobs {
            if let Some(script) = &job.script {
                job.script = Some(resolve(base_dir, script)?);
            }
            if let Some(exe) = &job.executable {
                // Bare program names are looked up on PATH at spawn time.
                if exe.components().count() > 1 {
                    job.executable = Some(resolve(base_dir, exe)?);
                }
            }
        }
        Ok(())
    }
}

fn resolve(base_dir: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    if raw.is_empty() {
        return Ok(base_dir.to_path_buf());
    }
    let expanded = shellexpand::full(&raw).map_err(|e| ConfigError::PathExpansion {
        path: raw.to_string(),
        reason: e.to_string(),
    })?;
    let expanded = PathBuf::from(expanded.as_ref());
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base_dir.join(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("resim.toml");
        std::fs::write(
            &config_path,
            r#"
[runpath]
format = "sim/r%d/i%d"
export_file = "out/runpath_list.txt"
ensemble_size = 4
registry = "clear"

[[runpath.files]]
target = "permx.grdcel"
source = "templates/permx.tmpl"

[[jobs]]
name = "RANK"
internal = true
script = "scripts/rank.toml"
min_args = 1
max_args = 2
arg_types = ["string", "int"]

[[jobs]]
name = "ECHO"
executable = "echo"
max_args = 3
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.runpath.ensemble_size, 4);
        assert_eq!(config.runpath.registry, RegistryPolicy::Clear);
        assert_eq!(config.runpath.root, dir.path());
        assert_eq!(
            config.runpath.export_file,
            dir.path().join("out/runpath_list.txt")
        );
        assert_eq!(
            config.runpath.files[0].source.as_deref(),
            Some(dir.path().join("templates/permx.tmpl").as_path())
        );
        assert_eq!(config.jobs.len(), 2);
        assert!(config.jobs[0].internal);
        assert_eq!(
            config.jobs[0].script.as_deref(),
            Some(dir.path().join("scripts/rank.toml").as_path())
        );
        assert_eq!(config.jobs[1].executable.as_deref(), Some(Path::new("echo")));
        assert_eq!(config.logging.max_files, 10);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound(_)));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("resim.toml");
        std::fs::write(&config_path, "[runpath]\nformt = \"x\"\n").unwrap();
        assert!(matches!(
            load_config(&config_path),
            Err(ConfigError::Toml(_))
        ));
    }
}
