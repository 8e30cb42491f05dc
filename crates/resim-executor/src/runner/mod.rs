pub mod external;
pub mod function;
pub mod script;

pub use external::{ExternalOutcome, ExternalRunner, SubprocessFailure};
pub use function::{FunctionRegistry, FunctionRunner};
pub use script::{CatalogScriptLoader, ScriptFileRunner, ScriptLoader, WorkflowScript};

use crate::context::WorkflowContext;
use crate::error::Result;
use resim_core::model::ArgValue;
use tokio_util::sync::CancellationToken;

pub type ScriptValue = serde_json::Value;
pub type ScriptResult =
    std::result::Result<ScriptValue, Box<dyn std::error::Error + Send + Sync>>;

/// Value produced by a finished workflow job.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    Internal(ScriptValue),
    External(ExternalOutcome),
}

impl RunResult {
    pub fn success(&self) -> bool {
        match self {
            RunResult::Internal(_) => true,
            RunResult::External(outcome) => outcome.success(),
        }
    }

    pub fn value(&self) -> Option<&ScriptValue> {
        match self {
            RunResult::Internal(v) => Some(v),
            RunResult::External(_) => None,
        }
    }

    pub fn external(&self) -> Option<&ExternalOutcome> {
        match self {
            RunResult::External(o) => Some(o),
            RunResult::Internal(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum ScriptRunner {
    InternalFunction(FunctionRunner),
    InternalScript(ScriptFileRunner),
    External(ExternalRunner),
}

impl ScriptRunner {
    fn token(&self) -> &CancellationToken {
        match self {
            ScriptRunner::InternalFunction(r) => r.token(),
            ScriptRunner::InternalScript(r) => r.token(),
            ScriptRunner::External(r) => r.token(),
        }
    }

    pub fn cancel(&self) {
        self.token().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token().is_cancelled()
    }

    /// Internal runners get the coerced values, the external runner the raw strings.
    pub async fn run(
        &self,
        ctx: &WorkflowContext,
        coerced: &[ArgValue],
        raw: &[String],
        verbose: bool,
    ) -> Result<RunResult> {
        match self {
            ScriptRunner::InternalFunction(r) => {
                r.run(ctx, coerced, verbose).map(RunResult::Internal)
            }
            ScriptRunner::InternalScript(r) => r.run(ctx, coerced, verbose).map(RunResult::Internal),
            ScriptRunner::External(r) => Ok(RunResult::External(r.run(raw, verbose).await)),
        }
    }
}
