use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] resim_core::errors::ConfigError),

    #[error(transparent)]
    Registry(#[from] resim_core::errors::RegistryError),

    #[error(transparent)]
    Executor(#[from] resim_executor::ExecutorError),

    #[error(transparent)]
    Provision(#[from] crate::provision::ProvisionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Workflow job '{0}' is not defined in the configuration.")]
    JobNotFound(String),

    #[error("Invalid realization selection '{spec}': {reason}")]
    InvalidRealizations { spec: String, reason: String },

    #[error("Provisioning failed for {failed} of {total} realizations.")]
    ProvisionFailed { failed: usize, total: usize },

    #[error("Execution failed: {message}\nSummary: {summary}")]
    ExecutionFailed { message: String, summary: String },
}
