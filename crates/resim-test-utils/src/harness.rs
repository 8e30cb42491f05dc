use resim_core::constants::defaults;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Temporary workspace holding a `resim.toml`, its templates and run paths.
pub struct TestContext {
    pub _temp_dir: tempfile::TempDir,
    pub root: PathBuf,
    pub config_path: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("resim-test-")
            .tempdir()
            .expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let config_path = root.join(defaults::CONFIG_FILE);

        Self {
            _temp_dir: temp_dir,
            root,
            config_path,
        }
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn export_file(&self) -> PathBuf {
        self.path(defaults::EXPORT_FILE)
    }

    pub fn write_config(&self, content: &str) -> &Path {
        fs::write(&self.config_path, content).expect("Failed to write resim.toml");
        &self.config_path
    }

    /// Writes a config with a `%d` runpath layout under `simulations/`.
    pub fn write_ensemble_config(&self, ensemble_size: usize, extra: &str) -> &Path {
        let content = format!(
            r#"
[runpath]
root = "simulations"
format = "realization-%d/iter-%d"
basename = "CASE_%d"
export_file = "{}"
ensemble_size = {}
{}
"#,
            defaults::EXPORT_FILE,
            ensemble_size,
            extra
        );
        self.write_config(&content)
    }

    pub fn write_template(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create template dir");
        }
        fs::write(&path, content).expect("Failed to write template");
        path
    }

    pub fn write_executable(&self, name: &str, body: &str) -> PathBuf {
        let path = self.write_template(name, &format!("#!/bin/sh\n{}\n", body));
        let mut perms = fs::metadata(&path)
            .expect("Failed to stat executable")
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("Failed to chmod executable");
        path
    }

    pub fn read_export(&self) -> Vec<String> {
        fs::read_to_string(self.export_file())
            .expect("Failed to read runpath list")
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
