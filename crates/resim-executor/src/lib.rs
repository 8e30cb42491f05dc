mod args;
mod context;
mod error;
mod job;
mod joblist;
pub mod runner;

pub use args::{coerce_value, ArgumentSpec};
pub use context::{ScriptContext, WorkflowContext};
pub use error::{ExecutorError, Result};
pub use job::{JobKind, JobState, WorkflowJob};
pub use joblist::WorkflowJobList;
pub use runner::{
    CatalogScriptLoader, ExternalOutcome, FunctionRegistry, RunResult, ScriptLoader,
    ScriptResult, ScriptRunner, ScriptValue, SubprocessFailure, WorkflowScript,
};
