use crate::args::ArgumentSpec;
use crate::context::WorkflowContext;
use crate::error::{ExecutorError, Result};
use crate::runner::{
    ExternalRunner, FunctionRunner, RunResult, ScriptFileRunner, ScriptRunner,
};
use resim_core::config::JobDefinition;
use resim_core::model::ContentType;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    InternalFunction {
        function: String,
        module: Option<String>,
    },
    InternalScript {
        path: PathBuf,
    },
    External {
        executable: PathBuf,
    },
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::InternalFunction { function, .. } => write!(f, "function:{}", function),
            JobKind::InternalScript { path } => write!(f, "script:{}", path.display()),
            JobKind::External { executable } => write!(f, "external:{}", executable.display()),
        }
    }
}

impl JobKind {
    pub fn from_definition(def: &JobDefinition) -> Result<Self> {
        let invalid = |reason: &str| ExecutorError::InvalidJobDefinition {
            job: def.name.clone(),
            reason: reason.to_string(),
        };

        match (
            def.internal,
            &def.script,
            &def.function,
            &def.executable,
        ) {
            (true, Some(path), None, None) => Ok(JobKind::InternalScript { path: path.clone() }),
            (true, None, Some(function), None) => Ok(JobKind::InternalFunction {
                function: function.clone(),
                module: def.module.clone(),
            }),
            (false, None, None, Some(executable)) => Ok(JobKind::External {
                executable: executable.clone(),
            }),
            (true, None, None, _) => {
                Err(invalid("internal job needs either a function or a script"))
            }
            (true, Some(_), Some(_), _) => {
                Err(invalid("internal job cannot have both a function and a script"))
            }
            (true, _, _, Some(_)) => Err(invalid("internal job cannot name an executable")),
            (false, None, None, None) => Err(invalid("external job needs an executable")),
            (false, _, _, _) => Err(invalid(
                "external job cannot name an internal function or script",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug)]
struct Slot {
    runner: Option<Arc<ScriptRunner>>,
    state: JobState,
}

/// A named workflow job and the runner of its most recent invocation.
#[derive(Debug)]
pub struct WorkflowJob {
    name: String,
    kind: JobKind,
    spec: ArgumentSpec,
    slot: Mutex<Slot>,
}

impl WorkflowJob {
    pub fn new(name: impl Into<String>, kind: JobKind, spec: ArgumentSpec) -> Self {
        Self {
            name: name.into(),
            kind,
            spec,
            slot: Mutex::new(Slot {
                runner: None,
                state: JobState::Idle,
            }),
        }
    }

    pub fn from_definition(def: &JobDefinition) -> Result<Self> {
        if def.name.trim().is_empty() {
            return Err(ExecutorError::InvalidJobDefinition {
                job: def.name.clone(),
                reason: "job name is empty".to_string(),
            });
        }
        let kind = JobKind::from_definition(def)?;
        let spec =
            ArgumentSpec::from_counts(&def.name, def.min_args, def.max_args, def.arg_types.clone())?;
        Ok(Self::new(def.name.clone(), kind, spec))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    pub fn is_internal(&self) -> bool {
        !matches!(self.kind, JobKind::External { .. })
    }

    pub fn is_internal_script(&self) -> bool {
        matches!(self.kind, JobKind::InternalScript { .. })
    }

    pub fn function_name(&self) -> Option<&str> {
        match &self.kind {
            JobKind::InternalFunction { function, .. } => Some(function),
            _ => None,
        }
    }

    pub fn module(&self) -> Option<&str> {
        match &self.kind {
            JobKind::InternalFunction { module, .. } => module.as_deref(),
            _ => None,
        }
    }

    pub fn internal_script_path(&self) -> Option<&Path> {
        match &self.kind {
            JobKind::InternalScript { path } => Some(path),
            _ => None,
        }
    }

    pub fn executable(&self) -> Option<&Path> {
        match &self.kind {
            JobKind::External { executable } => Some(executable),
            _ => None,
        }
    }

    pub fn argument_spec(&self) -> &ArgumentSpec {
        &self.spec
    }

    pub fn minimum_argument_count(&self) -> usize {
        self.spec.min_args()
    }

    pub fn maximum_argument_count(&self) -> usize {
        self.spec.max_args()
    }

    pub fn argument_types(&self) -> &[ContentType] {
        self.spec.types()
    }

    pub fn state(&self) -> JobState {
        self.slot
            .lock()
            .map(|slot| slot.state)
            .unwrap_or(JobState::Failed)
    }

    fn set_state(&self, state: JobState) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.state = state;
        }
    }

    fn build_runner(&self) -> ScriptRunner {
        match &self.kind {
            JobKind::InternalScript { path } => {
                ScriptRunner::InternalScript(ScriptFileRunner::new(&self.name, path))
            }
            JobKind::InternalFunction { function, module } => ScriptRunner::InternalFunction(
                FunctionRunner::new(&self.name, module.as_deref(), function),
            ),
            JobKind::External { executable } => {
                ScriptRunner::External(ExternalRunner::new(&self.name, executable))
            }
        }
    }

    /// Validates `arguments`, then runs the job with a fresh runner.
    ///
    /// Argument errors are raised before any runner exists. A failing
    /// external process is reported inside the returned [`RunResult`].
    pub async fn run(
        &self,
        ctx: &WorkflowContext,
        arguments: &[String],
        verbose: bool,
    ) -> Result<RunResult> {
        let coerced = self.spec.coerce(&self.name, arguments)?;

        let runner = Arc::new(self.build_runner());
        if let Ok(mut slot) = self.slot.lock() {
            slot.runner = Some(Arc::clone(&runner));
            slot.state = JobState::Running;
        }
        tracing::debug!("Running workflow job '{}' ({})", self.name, self.kind);

        let result = runner.run(ctx, &coerced, arguments, verbose).await;

        let state = match &result {
            _ if runner.is_cancelled() => JobState::Cancelled,
            Ok(r) if r.success() => JobState::Completed,
            _ => JobState::Failed,
        };
        self.set_state(state);

        match result {
            Err(_) if state == JobState::Cancelled => Err(ExecutorError::Cancelled(self.name.clone())),
            other => other,
        }
    }

    /// Requests cancellation of the active run. No-op when nothing runs.
    pub fn cancel(&self) {
        let Ok(slot) = self.slot.lock() else {
            return;
        };
        if slot.state != JobState::Running {
            return;
        }
        if let Some(runner) = &slot.runner {
            tracing::info!("Cancel requested for workflow job '{}'", self.name);
            runner.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str) -> JobDefinition {
        JobDefinition {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_resolution() {
        let mut script = def("S");
        script.internal = true;
        script.script = Some(PathBuf::from("rank.toml"));
        assert!(matches!(
            JobKind::from_definition(&script),
            Ok(JobKind::InternalScript { .. })
        ));

        let mut function = def("F");
        function.internal = true;
        function.function = Some("rank".into());
        assert!(matches!(
            JobKind::from_definition(&function),
            Ok(JobKind::InternalFunction { .. })
        ));

        let mut external = def("E");
        external.executable = Some(PathBuf::from("/bin/true"));
        assert!(matches!(
            JobKind::from_definition(&external),
            Ok(JobKind::External { .. })
        ));
    }

    #[test]
    fn test_inconsistent_flags_are_rejected() {
        let mut script_not_internal = def("A");
        script_not_internal.script = Some(PathBuf::from("x.toml"));
        script_not_internal.executable = Some(PathBuf::from("/bin/true"));

        let mut internal_without_target = def("B");
        internal_without_target.internal = true;

        let mut both = def("C");
        both.internal = true;
        both.script = Some(PathBuf::from("x.toml"));
        both.function = Some("f".into());

        let nothing = def("D");

        for d in [script_not_internal, internal_without_target, both, nothing] {
            let err = JobKind::from_definition(&d).unwrap_err();
            match err {
                ExecutorError::InvalidJobDefinition { job, .. } => assert_eq!(job, d.name),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_getters_follow_kind() {
        let mut d = def("RANK");
        d.internal = true;
        d.function = Some("rank".into());
        d.module = Some("stats".into());
        d.min_args = 1;
        d.max_args = 2;
        d.arg_types = vec![ContentType::String];
        let job = WorkflowJob::from_definition(&d).unwrap();

        assert!(job.is_internal());
        assert!(!job.is_internal_script());
        assert_eq!(job.function_name(), Some("rank"));
        assert_eq!(job.module(), Some("stats"));
        assert_eq!(job.executable(), None);
        assert_eq!(job.minimum_argument_count(), 1);
        assert_eq!(job.maximum_argument_count(), 2);
        assert_eq!(
            job.argument_types(),
            &[ContentType::String, ContentType::Untyped]
        );
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mut d = def("E");
        d.executable = Some(PathBuf::from("/bin/true"));
        let job = WorkflowJob::from_definition(&d).unwrap();
        job.cancel();
        assert_eq!(job.state(), JobState::Idle);
    }
}
