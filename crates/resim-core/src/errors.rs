use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("XDG Base Directory Error: {0}")]
    Xdg(String),

    #[error("Invalid configuration: {0}")]
    General(String),

    #[error("Configuration file not found at '{0}'.")]
    ConfigNotFound(PathBuf),

    #[error("Invalid path format '{format}': {reason}")]
    InvalidFormat { format: String, reason: String },

    #[error("Could not expand path '{path}': {reason}")]
    PathExpansion { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Runpath index {index} is out of range for a registry of {len} entries.")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Runpath registry is positional: key '{key}' is not an integer index.")]
    NotPositional { key: String },

    #[error("No runpath export file is configured.")]
    ExportNotConfigured,

    #[error("Failed to export runpath list to '{path}': {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    pub fn is_index_error(&self) -> bool {
        matches!(self, RegistryError::IndexOutOfRange { .. })
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, RegistryError::NotPositional { .. })
    }
}
