use crate::error::{ExecutorError, Result};
use crate::job::WorkflowJob;
use resim_core::config::JobDefinition;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Workflow jobs indexed by name.
#[derive(Debug, Default)]
pub struct WorkflowJobList {
    jobs: BTreeMap<String, Arc<WorkflowJob>>,
}

impl WorkflowJobList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: &[JobDefinition]) -> Result<Self> {
        let mut list = Self::new();
        for def in definitions {
            list.add(WorkflowJob::from_definition(def)?)?;
        }
        Ok(list)
    }

    pub fn add(&mut self, job: WorkflowJob) -> Result<()> {
        if self.jobs.contains_key(job.name()) {
            return Err(ExecutorError::DuplicateJob(job.name().to_string()));
        }
        self.jobs.insert(job.name().to_string(), Arc::new(job));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<WorkflowJob>> {
        self.jobs.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WorkflowJob>> {
        self.jobs.values()
    }

    /// Cancels every job that is currently running.
    pub fn cancel_all(&self) {
        for job in self.jobs.values() {
            job.cancel();
        }
    }
}
