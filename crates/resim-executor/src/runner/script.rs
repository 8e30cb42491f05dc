use super::{ScriptResult, ScriptValue};
use crate::context::{ScriptContext, WorkflowContext};
use crate::error::{ExecutorError, Result};
use resim_core::model::ArgValue;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A script object executed inside the host process.
pub trait WorkflowScript: Send + Sync {
    fn run(&self, ctx: &ScriptContext<'_>, args: &[ArgValue]) -> ScriptResult;
}

impl<F> WorkflowScript for F
where
    F: Fn(&ScriptContext<'_>, &[ArgValue]) -> ScriptResult + Send + Sync,
{
    fn run(&self, ctx: &ScriptContext<'_>, args: &[ArgValue]) -> ScriptResult {
        self(ctx, args)
    }
}

/// Turns an internal script path into a callable script object.
pub trait ScriptLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn WorkflowScript>>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptDescriptor {
    entry: Option<String>,
}

/// Loader backed by scripts compiled into the host.
///
/// A script file is a small TOML descriptor naming the registered entry
/// point (`entry = "rank_realizations"`). An empty file, or one without
/// `entry`, selects the entry named after the file stem.
#[derive(Default, Clone)]
pub struct CatalogScriptLoader {
    scripts: BTreeMap<String, Arc<dyn WorkflowScript>>,
}

impl CatalogScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        entry: impl Into<String>,
        script: Arc<dyn WorkflowScript>,
    ) -> &mut Self {
        self.scripts.insert(entry.into(), script);
        self
    }

    fn entry_for(path: &Path) -> Result<String> {
        let load_error = |reason: String| ExecutorError::ScriptLoad {
            path: path.to_path_buf(),
            reason,
        };

        let content = fs_err::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let descriptor: ScriptDescriptor =
            toml::from_str(&content).map_err(|e| load_error(e.to_string()))?;

        match descriptor.entry {
            Some(entry) => Ok(entry),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .ok_or_else(|| load_error("script path has no file name".to_string())),
        }
    }
}

impl ScriptLoader for CatalogScriptLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn WorkflowScript>> {
        let entry = Self::entry_for(path)?;
        tracing::debug!(
            "Resolved script '{}' to entry '{}'",
            path.display(),
            entry
        );
        self.scripts
            .get(&entry)
            .cloned()
            .ok_or_else(|| ExecutorError::ScriptLoad {
                path: path.to_path_buf(),
                reason: format!("no script registered for entry '{}'", entry),
            })
    }
}

pub struct ScriptFileRunner {
    job: String,
    path: PathBuf,
    token: CancellationToken,
}

impl ScriptFileRunner {
    pub fn new(job: &str, path: &Path) -> Self {
        Self {
            job: job.to_string(),
            path: path.to_path_buf(),
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run(
        &self,
        ctx: &WorkflowContext,
        args: &[ArgValue],
        verbose: bool,
    ) -> Result<ScriptValue> {
        let script = ctx.scripts().load(&self.path)?;
        tracing::debug!(
            "Job '{}' running internal script '{}'",
            self.job,
            self.path.display()
        );
        let script_ctx = ScriptContext::new(&self.job, ctx.ensemble(), &self.token, verbose);
        script.run(&script_ctx, args).map_err(|e| ExecutorError::Script {
            job: self.job.clone(),
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for ScriptFileRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptFileRunner")
            .field("job", &self.job)
            .field("path", &self.path)
            .finish()
    }
}
