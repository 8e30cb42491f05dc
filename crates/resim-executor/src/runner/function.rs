use super::{ScriptResult, ScriptValue};
use crate::context::{ScriptContext, WorkflowContext};
use crate::error::{ExecutorError, Result};
use resim_core::model::ArgValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type InternalFunction = dyn Fn(&ScriptContext<'_>, &[ArgValue]) -> ScriptResult + Send + Sync;

/// Named functions that internal workflow jobs may call.
///
/// A function registered under `module.name` is preferred over a bare
/// `name` when the job declares a module.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<InternalFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&ScriptContext<'_>, &[ArgValue]) -> ScriptResult + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn resolve(&self, module: Option<&str>, function: &str) -> Option<Arc<InternalFunction>> {
        module
            .and_then(|m| self.functions.get(&format!("{}.{}", m, function)))
            .or_else(|| self.functions.get(function))
            .cloned()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.functions.keys()).finish()
    }
}

#[derive(Debug)]
pub struct FunctionRunner {
    job: String,
    module: Option<String>,
    function: String,
    token: CancellationToken,
}

impl FunctionRunner {
    pub fn new(job: &str, module: Option<&str>, function: &str) -> Self {
        Self {
            job: job.to_string(),
            module: module.map(str::to_string),
            function: function.to_string(),
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn run(
        &self,
        ctx: &WorkflowContext,
        args: &[ArgValue],
        verbose: bool,
    ) -> Result<ScriptValue> {
        let function = ctx
            .functions()
            .resolve(self.module.as_deref(), &self.function)
            .ok_or_else(|| ExecutorError::FunctionNotFound {
                job: self.job.clone(),
                function: self.function.clone(),
            })?;

        tracing::debug!(
            "Job '{}' calling internal function '{}'",
            self.job,
            self.function
        );
        let script_ctx = ScriptContext::new(&self.job, ctx.ensemble(), &self.token, verbose);
        function(&script_ctx, args).map_err(|e| ExecutorError::Script {
            job: self.job.clone(),
            message: e.to_string(),
        })
    }
}
