use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunpathEntry {
    realization: usize,
    iteration: usize,
    runpath: String,
    basename: String,
}

impl RunpathEntry {
    pub fn new(
        realization: usize,
        iteration: usize,
        runpath: impl Into<String>,
        basename: impl Into<String>,
    ) -> Self {
        Self {
            realization,
            iteration,
            runpath: runpath.into(),
            basename: basename.into(),
        }
    }

    pub fn realization(&self) -> usize {
        self.realization
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn runpath(&self) -> &str {
        &self.runpath
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Key used to order the export file: iteration first, then realization.
    pub fn sort_key(&self) -> (usize, usize) {
        (self.iteration, self.realization)
    }

    /// One line of the runpath export file, without the trailing newline:
    /// `<realization> <basename> <runpath> <iteration>`, with both indices
    /// zero-padded to at least three digits.
    pub fn export_line(&self) -> String {
        format!(
            "{:03} {} {} {:03}",
            self.realization, self.basename, self.runpath, self.iteration
        )
    }
}

impl fmt::Display for RunpathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RunpathEntry(realization = {}, iteration = {}, runpath = {}, basename = {})",
            self.realization, self.iteration, self.runpath, self.basename
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Bool,
    Float,
    Int,
    String,
    #[default]
    Untyped,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Bool => write!(f, "bool"),
            ContentType::Float => write!(f, "float"),
            ContentType::Int => write!(f, "int"),
            ContentType::String => write!(f, "string"),
            ContentType::Untyped => write!(f, "untyped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContentTypeError(pub String);

impl fmt::Display for ParseContentTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid argument type: '{}'. Valid values are: bool, float, int, string, untyped",
            self.0
        )
    }
}

impl std::error::Error for ParseContentTypeError {}

impl FromStr for ContentType {
    type Err = ParseContentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" => Ok(ContentType::Bool),
            "float" => Ok(ContentType::Float),
            "int" => Ok(ContentType::Int),
            "string" => Ok(ContentType::String),
            "untyped" => Ok(ContentType::Untyped),
            _ => Err(ParseContentTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ArgValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Str(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeepRunpath {
    #[default]
    Default,
    Keep,
    Delete,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Assimilation,
    #[default]
    Experiment,
}

impl KeepRunpath {
    /// Whether a successfully completed runpath should be removed.
    pub fn should_remove(self, mode: RunMode) -> bool {
        match self {
            KeepRunpath::Keep => false,
            KeepRunpath::Delete => true,
            KeepRunpath::Default => mode == RunMode::Assimilation,
        }
    }
}

/// What happens to existing registry rows when a provisioning pass starts.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistryPolicy {
    #[default]
    Append,
    Clear,
}
