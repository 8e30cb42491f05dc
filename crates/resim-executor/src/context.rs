use crate::runner::function::FunctionRegistry;
use crate::runner::script::{CatalogScriptLoader, ScriptLoader};
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a workflow job run needs besides its arguments.
///
/// `ensemble` is opaque to the executor and handed to internal functions and
/// scripts unchanged.
#[derive(Clone)]
pub struct WorkflowContext {
    ensemble: Arc<dyn Any + Send + Sync>,
    functions: Arc<FunctionRegistry>,
    scripts: Arc<dyn ScriptLoader>,
}

impl WorkflowContext {
    pub fn new(ensemble: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            ensemble,
            functions: Arc::new(FunctionRegistry::default()),
            scripts: Arc::new(CatalogScriptLoader::default()),
        }
    }

    pub fn with_functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptLoader>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn ensemble(&self) -> &(dyn Any + Send + Sync) {
        self.ensemble.as_ref()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn scripts(&self) -> &dyn ScriptLoader {
        self.scripts.as_ref()
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// View of a running job handed to internal functions and scripts.
pub struct ScriptContext<'a> {
    job: &'a str,
    ensemble: &'a (dyn Any + Send + Sync),
    token: &'a CancellationToken,
    verbose: bool,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        job: &'a str,
        ensemble: &'a (dyn Any + Send + Sync),
        token: &'a CancellationToken,
        verbose: bool,
    ) -> Self {
        Self {
            job,
            ensemble,
            token,
            verbose,
        }
    }

    pub fn job_name(&self) -> &str {
        self.job
    }

    /// Downcasts the ensemble handle to the concrete type the caller provided.
    pub fn ensemble<T: Any>(&self) -> Option<&T> {
        self.ensemble.downcast_ref::<T>()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Internal code is expected to poll this between units of work.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
