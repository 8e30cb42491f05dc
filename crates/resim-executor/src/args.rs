use crate::error::{ExecutorError, Result};
use resim_core::model::{ArgValue, ContentType};

/// Argument contract of a workflow job.
///
/// `types` has one entry per accepted position, so its length is the
/// maximum argument count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgumentSpec {
    min_args: usize,
    types: Vec<ContentType>,
}

impl ArgumentSpec {
    pub fn new(job: &str, min_args: usize, types: Vec<ContentType>) -> Result<Self> {
        if min_args > types.len() {
            return Err(ExecutorError::InvalidJobDefinition {
                job: job.to_string(),
                reason: format!(
                    "minimum argument count {} exceeds maximum {}",
                    min_args,
                    types.len()
                ),
            });
        }
        Ok(Self { min_args, types })
    }

    /// Builds the contract from `min`/`max` counts, padding missing types
    /// with [`ContentType::Untyped`].
    pub fn from_counts(
        job: &str,
        min_args: usize,
        max_args: usize,
        mut types: Vec<ContentType>,
    ) -> Result<Self> {
        if types.len() > max_args {
            return Err(ExecutorError::InvalidJobDefinition {
                job: job.to_string(),
                reason: format!(
                    "{} argument types declared but at most {} arguments accepted",
                    types.len(),
                    max_args
                ),
            });
        }
        types.resize(max_args, ContentType::Untyped);
        Self::new(job, min_args, types)
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn max_args(&self) -> usize {
        self.types.len()
    }

    pub fn types(&self) -> &[ContentType] {
        &self.types
    }

    pub fn check_count(&self, job: &str, found: usize) -> Result<()> {
        if found < self.min_args || found > self.max_args() {
            return Err(ExecutorError::ArgumentCount {
                job: job.to_string(),
                min: self.min_args,
                max: self.max_args(),
                found,
            });
        }
        Ok(())
    }

    pub fn coerce(&self, job: &str, raw: &[String]) -> Result<Vec<ArgValue>> {
        self.check_count(job, raw.len())?;
        raw.iter()
            .zip(&self.types)
            .enumerate()
            .map(|(position, (value, expected))| {
                coerce_value(*expected, value).ok_or_else(|| ExecutorError::TypeMismatch {
                    job: job.to_string(),
                    position,
                    expected: *expected,
                    value: value.clone(),
                })
            })
            .collect()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

pub fn coerce_value(expected: ContentType, raw: &str) -> Option<ArgValue> {
    match expected {
        ContentType::Bool => parse_bool(raw).map(ArgValue::Bool),
        ContentType::Int => raw.trim().parse::<i64>().ok().map(ArgValue::Int),
        ContentType::Float => raw.trim().parse::<f64>().ok().map(ArgValue::Float),
        ContentType::String | ContentType::Untyped => Some(ArgValue::Str(raw.to_string())),
    }
}
