use resim_core::config::RunpathConfig;
use resim_core::model::{ArgValue, RunpathEntry};
use resim_core::template::{PathTemplate, RunpathFormat};
use resim_executor::{
    CatalogScriptLoader, FunctionRegistry, ScriptContext, ScriptResult, ScriptValue,
    WorkflowContext,
};
use std::sync::Arc;

/// Ensemble state handed to internal jobs run from the command line.
#[derive(Debug)]
pub struct Ensemble {
    pub size: usize,
    pub format: RunpathFormat,
    pub runpaths: Vec<RunpathEntry>,
}

impl Ensemble {
    pub fn new(cfg: &RunpathConfig, runpaths: Vec<RunpathEntry>) -> Result<Self, resim_core::errors::ConfigError> {
        Ok(Self {
            size: cfg.ensemble_size,
            format: cfg.runpath_format()?,
            runpaths,
        })
    }
}

fn ensemble<'a>(ctx: &'a ScriptContext<'_>) -> Result<&'a Ensemble, Box<dyn std::error::Error + Send + Sync>> {
    ctx.ensemble::<Ensemble>()
        .ok_or_else(|| format!("job '{}' needs an ensemble", ctx.job_name()).into())
}

fn index_arg(args: &[ArgValue], position: usize) -> Option<usize> {
    args.get(position)
        .and_then(ArgValue::as_int)
        .and_then(|v| usize::try_from(v).ok())
}

fn ensemble_size(ctx: &ScriptContext<'_>, _args: &[ArgValue]) -> ScriptResult {
    Ok(ScriptValue::from(ensemble(ctx)?.size))
}

fn runpath_count(ctx: &ScriptContext<'_>, args: &[ArgValue]) -> ScriptResult {
    let ensemble = ensemble(ctx)?;
    let count = match index_arg(args, 0) {
        Some(iteration) => ensemble
            .runpaths
            .iter()
            .filter(|e| e.iteration() == iteration)
            .count(),
        None => ensemble.runpaths.len(),
    };
    Ok(ScriptValue::from(count))
}

fn realization_runpath(ctx: &ScriptContext<'_>, args: &[ArgValue]) -> ScriptResult {
    let ensemble = ensemble(ctx)?;
    let realization = index_arg(args, 0).ok_or("realization must be a non-negative integer")?;
    if realization >= ensemble.size {
        return Err(format!(
            "realization {} is outside an ensemble of {}",
            realization, ensemble.size
        )
        .into());
    }
    let iteration = index_arg(args, 1).unwrap_or(0);
    let (runpath, basename) = ensemble.format.render(realization, iteration);
    Ok(serde_json::json!({ "runpath": runpath, "basename": basename }))
}

fn list_runpaths(ctx: &ScriptContext<'_>, _args: &[ArgValue]) -> ScriptResult {
    let ensemble = ensemble(ctx)?;
    Ok(serde_json::to_value(&ensemble.runpaths)?)
}

pub fn builtin_functions() -> FunctionRegistry {
    let mut functions = FunctionRegistry::new();
    functions
        .register("ensemble_size", ensemble_size)
        .register("runpath_count", runpath_count)
        .register("realization_runpath", realization_runpath);
    functions
}

pub fn builtin_scripts() -> CatalogScriptLoader {
    let mut scripts = CatalogScriptLoader::new();
    scripts.register("list_runpaths", Arc::new(list_runpaths));
    scripts
}

pub fn workflow_context(ensemble: Ensemble) -> WorkflowContext {
    WorkflowContext::new(Arc::new(ensemble))
        .with_functions(Arc::new(builtin_functions()))
        .with_scripts(Arc::new(builtin_scripts()))
}
