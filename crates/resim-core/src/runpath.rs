use crate::errors::RegistryError;
use crate::model::RunpathEntry;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Ordered record of every runpath handed out to a realization.
///
/// Entries keep the order in which they were added. The export file is
/// written sorted by iteration and then realization, without touching that
/// order.
#[derive(Debug, Clone, Default)]
pub struct RunpathRegistry {
    entries: Vec<RunpathEntry>,
    export_file: PathBuf,
}

impl RunpathRegistry {
    pub fn new(export_file: impl Into<PathBuf>) -> Self {
        Self {
            entries: Vec::new(),
            export_file: export_file.into(),
        }
    }

    pub fn add(
        &mut self,
        realization: usize,
        iteration: usize,
        runpath: impl Into<String>,
        basename: impl Into<String>,
    ) {
        self.entries
            .push(RunpathEntry::new(realization, iteration, runpath, basename));
    }

    pub fn push(&mut self, entry: RunpathEntry) {
        self.entries.push(entry);
    }

    pub fn get(&self, index: isize) -> Result<&RunpathEntry, RegistryError> {
        let len = self.entries.len();
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index as usize).filter(|i| *i < len)
        };

        resolved
            .and_then(|i| self.entries.get(i))
            .ok_or(RegistryError::IndexOutOfRange { index, len })
    }

    /// Positional access from textual input such as a command line argument.
    pub fn lookup(&self, key: &str) -> Result<&RunpathEntry, RegistryError> {
        let index = key
            .trim()
            .parse::<isize>()
            .map_err(|_| RegistryError::NotPositional {
                key: key.to_string(),
            })?;
        self.get(index)
    }

    pub fn slice(&self, start: usize, stop: usize) -> &[RunpathEntry] {
        let stop = stop.min(self.entries.len());
        if start >= stop {
            return &[];
        }
        &self.entries[start..stop]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RunpathEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn export_file(&self) -> &Path {
        &self.export_file
    }

    pub fn sorted_entries(&self) -> Vec<&RunpathEntry> {
        let mut sorted: Vec<&RunpathEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|e| e.sort_key());
        sorted
    }

    /// Rewrites the export file, one [`RunpathEntry::export_line`] per entry.
    ///
    /// Realization and iteration are zero-padded to three digits; readers
    /// should parse them as integers rather than match the padding.
    pub fn export(&self) -> Result<(), RegistryError> {
        if self.export_file.as_os_str().is_empty() {
            return Err(RegistryError::ExportNotConfigured);
        }

        let to_export_error = |source: std::io::Error| RegistryError::Export {
            path: self.export_file.clone(),
            source,
        };

        let file = fs_err::File::create(&self.export_file).map_err(to_export_error)?;
        let mut writer = BufWriter::new(file);
        for entry in self.sorted_entries() {
            writeln!(writer, "{}", entry.export_line()).map_err(to_export_error)?;
        }
        writer.flush().map_err(to_export_error)?;

        tracing::debug!(
            "Exported {} runpath entries to '{}'",
            self.entries.len(),
            self.export_file.display()
        );
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RunpathRegistry {
    type Item = &'a RunpathEntry;
    type IntoIter = std::slice::Iter<'a, RunpathEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for RunpathRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RunpathRegistry(size = {}, export_file = {:?})",
            self.entries.len(),
            self.export_file
        )
    }
}

/// Reads a file written by [`RunpathRegistry::export`] back into entries.
///
/// The runpath column may itself contain whitespace: it is everything between
/// the basename and the trailing iteration.
pub fn read_export_file(path: &Path) -> Result<Vec<RunpathEntry>, crate::errors::ConfigError> {
    let content = fs_err::read_to_string(path)?;
    let mut entries = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = parse_export_line(line).ok_or_else(|| {
            crate::errors::ConfigError::General(format!(
                "Malformed runpath list '{}' at line {}: '{}'",
                path.display(),
                lineno + 1,
                line
            ))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_export_line(line: &str) -> Option<RunpathEntry> {
    let line = line.trim();
    let (realization, rest) = line.split_once(char::is_whitespace)?;
    let (basename, rest) = rest.trim_start().split_once(char::is_whitespace)?;
    let (runpath, iteration) = rest.trim().rsplit_once(char::is_whitespace)?;
    let runpath = runpath.trim_end();
    if runpath.is_empty() {
        return None;
    }
    Some(RunpathEntry::new(
        realization.parse().ok()?,
        iteration.parse().ok()?,
        runpath,
        basename,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn path(idx: usize) -> String {
        format!("path_{}", idx)
    }

    fn base(idx: usize) -> String {
        format!("base_{}", idx)
    }

    fn populated(export_file: impl Into<PathBuf>) -> RunpathRegistry {
        let mut registry = RunpathRegistry::new(export_file);
        for (iens, iter) in [(3, 1), (1, 1), (2, 1), (0, 0), (3, 0), (1, 0), (2, 0), (0, 1)] {
            registry.add(iens, iter, path(iens), base(iens));
        }
        registry
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut registry = RunpathRegistry::new("");
        assert_eq!(registry.len(), 0);

        let expected = [
            RunpathEntry::new(0, 0, "runpath0", "basename0"),
            RunpathEntry::new(1, 0, "runpath1", "basename0"),
        ];

        registry.add(0, 0, "runpath0", "basename0");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap(), &expected[0]);

        registry.add(1, 0, "runpath1", "basename0");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).unwrap(), &expected[1]);

        for (index, entry) in registry.iter().enumerate() {
            assert_eq!(entry, &expected[index]);
        }

        registry.clear();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut registry = RunpathRegistry::new("");
        registry.add(0, 0, "p", "b");
        registry.add(0, 0, "p", "b");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap(), registry.get(1).unwrap());
    }

    #[test]
    fn test_positional_access() {
        let registry = populated("EXPORT.txt");
        assert_eq!(registry.len(), 8);
        assert_eq!(
            registry.get(2).unwrap(),
            &RunpathEntry::new(2, 1, path(2), base(2))
        );
        assert_eq!(
            registry.get(-2).unwrap(),
            &RunpathEntry::new(2, 0, path(2), base(2))
        );
        assert_eq!(registry.get(-1).unwrap(), registry.get(7).unwrap());
        assert_eq!(registry.get(-8).unwrap(), registry.get(0).unwrap());

        assert!(registry.get(12).unwrap_err().is_index_error());
        assert!(registry.get(8).unwrap_err().is_index_error());
        assert!(registry.get(-9).unwrap_err().is_index_error());
    }

    #[test]
    fn test_lookup_rejects_non_integer_keys() {
        let registry = populated("EXPORT.txt");
        let err = registry.lookup("key").unwrap_err();
        assert!(err.is_type_error());
        assert!(err.to_string().contains("'key'"));

        assert_eq!(registry.lookup("-1").unwrap(), registry.get(7).unwrap());
        assert!(registry.lookup("42").unwrap_err().is_index_error());
    }

    #[test]
    fn test_slice_matches_direct_access() {
        let registry = populated("EXPORT.txt");
        let expected = vec![
            RunpathEntry::new(0, 0, path(0), base(0)),
            RunpathEntry::new(3, 0, path(3), base(3)),
            RunpathEntry::new(1, 0, path(1), base(1)),
            RunpathEntry::new(2, 0, path(2), base(2)),
        ];
        let slice = registry.slice(3, 7);
        assert_eq!(slice, expected.as_slice());
        for (offset, entry) in slice.iter().enumerate() {
            assert_eq!(entry, registry.get(3 + offset as isize).unwrap());
        }

        assert_eq!(registry.slice(6, 100).len(), 2);
        assert!(registry.slice(5, 5).is_empty());
        assert!(registry.slice(7, 3).is_empty());
    }

    #[test]
    fn test_clear_keeps_export_file() {
        let mut registry = populated("EXPORT.txt");
        registry.clear();
        assert_eq!(registry.len(), 0);
        assert!(registry.get(0).unwrap_err().is_index_error());
        assert_eq!(registry.export_file(), Path::new("EXPORT.txt"));
    }

    #[test]
    fn test_display_prefix() {
        let registry = populated("EXPORT.txt");
        let repr = registry.to_string();
        assert!(repr.starts_with("RunpathRegistry(size"));
        assert!(repr.contains("size = 8"));
    }

    #[test]
    fn test_sorted_export() {
        let dir = tempdir().unwrap();
        let export_file = dir.path().join("EXPORT.txt");
        let mut registry = RunpathRegistry::new(&export_file);
        for (iens, iter) in [(3, 1), (1, 1), (2, 1), (0, 0), (3, 0), (1, 0), (2, 0), (0, 1)] {
            registry.add(iens, iter, "path", "base");
        }

        registry.export().unwrap();

        let rows: Vec<(usize, usize)> = std::fs::read_to_string(&export_file)
            .unwrap()
            .lines()
            .map(|line| {
                let cols: Vec<&str> = line.split_whitespace().collect();
                (cols[0].parse().unwrap(), cols[3].parse().unwrap())
            })
            .collect();

        assert_eq!(rows.len(), 8);
        for iens in 0..4 {
            assert_eq!(rows[iens], (iens, 0));
            assert_eq!(rows[iens + 4], (iens, 1));
        }

        // Exporting must not reorder the registry itself.
        assert_eq!(registry.get(0).unwrap().realization(), 3);
        assert_eq!(registry.get(0).unwrap().iteration(), 1);
    }

    #[test]
    fn test_export_rewrites_file() {
        let dir = tempdir().unwrap();
        let export_file = dir.path().join("list.txt");
        let mut registry = populated(&export_file);
        registry.export().unwrap();
        registry.clear();
        registry.add(5, 0, "only", "one");
        registry.export().unwrap();

        let entries = read_export_file(&export_file).unwrap();
        assert_eq!(entries, vec![RunpathEntry::new(5, 0, "only", "one")]);
    }

    #[test]
    fn test_runpath_with_spaces_reads_back() {
        let dir = tempdir().unwrap();
        let export_file = dir.path().join("list.txt");
        let mut registry = RunpathRegistry::new(&export_file);
        registry.add(0, 0, "/data/My Sims/real  0/iter-0", "CASE_0");
        registry.add(1, 0, "/data/plain/real-1", "CASE_1");
        registry.export().unwrap();

        let entries = read_export_file(&export_file).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].runpath(), "/data/My Sims/real  0/iter-0");
        assert_eq!(entries[0].basename(), "CASE_0");
        assert_eq!(entries[1], RunpathEntry::new(1, 0, "/data/plain/real-1", "CASE_1"));
    }

    #[test]
    fn test_malformed_export_line_is_rejected() {
        let dir = tempdir().unwrap();
        let export_file = dir.path().join("list.txt");
        for line in ["000 CASE_0 000", "x CASE_0 /p 000", "000 CASE_0 /p last"] {
            std::fs::write(&export_file, format!("{}\n", line)).unwrap();
            assert!(read_export_file(&export_file).is_err(), "accepted '{}'", line);
        }
    }

    #[test]
    fn test_export_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let registry = populated(dir.path().join("missing/EXPORT.txt"));
        let err = registry.export().unwrap_err();
        assert!(matches!(err, RegistryError::Export { .. }));
    }

    #[test]
    fn test_export_without_file_configured() {
        let registry = populated("");
        assert!(matches!(
            registry.export(),
            Err(RegistryError::ExportNotConfigured)
        ));
    }
}
