use crate::errors::ConfigError;
use std::path::{Path, PathBuf};

const PLACEHOLDER: &str = "%d";

/// Maps a (realization, iteration) pair to its runpath and basename.
pub trait PathTemplate: Send + Sync {
    fn render(&self, realization: usize, iteration: usize) -> (String, String);
}

impl<F> PathTemplate for F
where
    F: Fn(usize, usize) -> (String, String) + Send + Sync,
{
    fn render(&self, realization: usize, iteration: usize) -> (String, String) {
        self(realization, iteration)
    }
}

/// `%d` style runpath format, e.g. `simulations/realization-%d/iter-%d`.
///
/// The first `%d` receives the realization and the second the iteration.
/// A format with a single `%d` ignores the iteration. The runpath format needs
/// at least one `%d`, otherwise every realization would share one directory.
/// Basenames are an export column and may not contain whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunpathFormat {
    root: PathBuf,
    runpath: String,
    basename: String,
}

impl RunpathFormat {
    pub fn new(
        root: impl Into<PathBuf>,
        runpath: impl Into<String>,
        basename: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let runpath = runpath.into();
        let basename = basename.into();
        check_placeholders(&runpath, 1, 2)?;
        check_placeholders(&basename, 0, 1)?;
        if basename.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidFormat {
                format: basename,
                reason: "basename may not contain whitespace".to_string(),
            });
        }
        Ok(Self {
            root: root.into(),
            runpath,
            basename,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runpath_format(&self) -> &str {
        &self.runpath
    }

    pub fn basename_format(&self) -> &str {
        &self.basename
    }
}

impl PathTemplate for RunpathFormat {
    fn render(&self, realization: usize, iteration: usize) -> (String, String) {
        let relative = substitute(&self.runpath, &[realization, iteration]);
        let runpath = if Path::new(&relative).is_absolute() || self.root.as_os_str().is_empty() {
            relative
        } else {
            self.root.join(relative).to_string_lossy().into_owned()
        };
        let basename = substitute(&self.basename, &[realization]);
        (runpath, basename)
    }
}

fn check_placeholders(format: &str, min: usize, max: usize) -> Result<(), ConfigError> {
    let count = format.matches(PLACEHOLDER).count();
    if !(min..=max).contains(&count) {
        return Err(ConfigError::InvalidFormat {
            format: format.to_string(),
            reason: format!(
                "found {} '{}' placeholders, expected {} to {}",
                count, PLACEHOLDER, min, max
            ),
        });
    }
    Ok(())
}

fn substitute(format: &str, values: &[usize]) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut values = values.iter();
    let mut rest = format;
    while let Some(pos) = rest.find(PLACEHOLDER) {
        out.push_str(&rest[..pos]);
        match values.next() {
            Some(v) => out.push_str(&v.to_string()),
            None => out.push_str(PLACEHOLDER),
        }
        rest = &rest[pos + PLACEHOLDER.len()..];
    }
    out.push_str(rest);
    out
}

/// Keyword substitution used when instantiating realization files.
pub fn substitute_keys(content: &str, pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .fold(content.to_string(), |acc, (key, value)| acc.replace(key, value))
}
