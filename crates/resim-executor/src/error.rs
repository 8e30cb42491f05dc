use resim_core::model::ContentType;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Job '{job}' takes between {min} and {max} arguments, {found} given.")]
    ArgumentCount {
        job: String,
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("Job '{job}': argument {position} ('{value}') is not a valid {expected}.")]
    TypeMismatch {
        job: String,
        position: usize,
        expected: ContentType,
        value: String,
    },

    #[error("Invalid definition for job '{job}': {reason}")]
    InvalidJobDefinition { job: String, reason: String },

    #[error("A workflow job named '{0}' is already defined.")]
    DuplicateJob(String),

    #[error("Job '{job}': no internal function registered as '{function}'.")]
    FunctionNotFound { job: String, function: String },

    #[error("Failed to load workflow script '{path}': {reason}")]
    ScriptLoad { path: PathBuf, reason: String },

    #[error("Job '{job}' failed: {message}")]
    Script { job: String, message: String },

    #[error("Job '{0}' was cancelled.")]
    Cancelled(String),
}

impl ExecutorError {
    /// Argument count or argument type violations.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(
            self,
            ExecutorError::ArgumentCount { .. } | ExecutorError::TypeMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
