use harness::TestHarness;
use resim_core::model::RunpathEntry;
use resim_core::RunpathRegistry;
use resim_runner::provision::RunPathProvisioner;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use std::sync::{Arc, Mutex};

const PERMX_FILE: &str = r#"
[[runpath.files]]
target = "permx.grdcel"
content = "PERMX <IENS> <ITER> <ECLBASE>"
"#;

fn provisioner(harness: &TestHarness) -> RunPathProvisioner {
    let config = harness.config();
    let registry = RunpathRegistry::new(config.runpath.export_file.clone());
    RunPathProvisioner::from_config(&config.runpath, Arc::new(Mutex::new(registry))).unwrap()
}

fn runpath(harness: &TestHarness, realization: usize, iteration: usize) -> std::path::PathBuf {
    harness.path(format!(
        "simulations/realization-{}/iter-{}",
        realization, iteration
    ))
}

fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_file())
        .unwrap_or(false)
}

#[test]
fn test_reprovisioning_replaces_symlinked_file() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(1, PERMX_FILE);
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true], 0).unwrap();
    let permx = runpath(&harness, 0, 0).join("permx.grdcel");
    assert!(is_regular_file(&permx));

    let elsewhere = harness.write_template("shared/permx.grdcel", "SHARED");
    fs::remove_file(&permx).unwrap();
    symlink(&elsewhere, &permx).unwrap();
    assert!(fs::symlink_metadata(&permx).unwrap().file_type().is_symlink());

    let report = provisioner.create_run_path(&[true], 0).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.replaced_links, 1);
    assert!(is_regular_file(&permx));
    assert_eq!(fs::read_to_string(&permx).unwrap(), "PERMX 0 0 CASE_0");
    assert_eq!(fs::read_to_string(&elsewhere).unwrap(), "SHARED");
}

#[test]
fn test_dot_prefixed_target_replaces_symlink() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(
        1,
        r#"
[[runpath.files]]
target = "./grid/./permx.grdcel"
content = "FRESH <IENS>"
"#,
    );
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true], 0).unwrap();
    let permx = runpath(&harness, 0, 0).join("grid/permx.grdcel");
    assert!(is_regular_file(&permx));

    let shared = harness.write_template("shared.txt", "SHARED");
    fs::remove_file(&permx).unwrap();
    symlink(&shared, &permx).unwrap();

    let report = provisioner.create_run_path(&[true], 0).unwrap();

    assert_eq!(report.replaced_links, 1);
    assert!(is_regular_file(&permx));
    assert_eq!(fs::read_to_string(&permx).unwrap(), "FRESH 0");
    assert_eq!(fs::read_to_string(&shared).unwrap(), "SHARED");
}

#[test]
fn test_symlinked_runpath_becomes_directory() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(1, PERMX_FILE);
    let provisioner = provisioner(&harness);

    let target_dir = harness.path("elsewhere");
    fs::create_dir_all(&target_dir).unwrap();
    let dir = runpath(&harness, 0, 0);
    fs::create_dir_all(dir.parent().unwrap()).unwrap();
    symlink(&target_dir, &dir).unwrap();

    provisioner.create_run_path(&[true], 0).unwrap();

    assert!(fs::symlink_metadata(&dir).unwrap().file_type().is_dir());
    assert!(is_regular_file(&dir.join("permx.grdcel")));
    assert!(!target_dir.join("permx.grdcel").exists());
}

#[test]
fn test_unrelated_files_survive_without_pre_clear() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(1, PERMX_FILE);
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true], 0).unwrap();
    let dir = runpath(&harness, 0, 0);
    fs::write(dir.join("simulator.log"), "previous run").unwrap();

    provisioner.create_run_path(&[true], 0).unwrap();
    assert!(dir.join("simulator.log").exists());
}

#[test]
fn test_pre_clear_empties_runpath() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(1, &format!("pre_clear = true\n{}", PERMX_FILE));
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true], 0).unwrap();
    let dir = runpath(&harness, 0, 0);
    fs::create_dir_all(dir.join("old")).unwrap();
    fs::write(dir.join("old/result.txt"), "stale").unwrap();

    provisioner.create_run_path(&[true], 0).unwrap();
    assert!(!dir.join("old").exists());
    assert!(is_regular_file(&dir.join("permx.grdcel")));
}

#[test]
fn test_one_failure_does_not_stop_other_realizations() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(3, PERMX_FILE);
    let provisioner = provisioner(&harness);

    // A regular file where realization 1 needs a directory.
    harness.write_template("simulations/realization-1", "blocker");

    let report = provisioner.create_run_path(&[true, true, true], 0).unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].realization, 1);
    let provisioned: Vec<usize> = report.provisioned.iter().map(|e| e.realization()).collect();
    assert_eq!(provisioned, vec![0, 2]);
    assert!(is_regular_file(&runpath(&harness, 2, 0).join("permx.grdcel")));

    let lines = harness.read_export();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("000 CASE_0 "));
    assert!(lines[1].starts_with("002 CASE_2 "));
}

#[test]
fn test_mask_selects_realizations() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(4, "");
    let provisioner = provisioner(&harness);

    let report = provisioner
        .create_run_path(&[false, true, false, true], 2)
        .unwrap();

    assert_eq!(report.attempted(), 2);
    assert!(runpath(&harness, 1, 2).is_dir());
    assert!(runpath(&harness, 3, 2).is_dir());
    assert!(!runpath(&harness, 0, 2).exists());
}

#[test]
fn test_export_is_sorted_across_iterations() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(2, "");
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true, true], 1).unwrap();
    provisioner.create_run_path(&[true, true], 0).unwrap();

    let expected: Vec<String> = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .iter()
        .map(|&(r, i)| {
            RunpathEntry::new(
                r,
                i,
                runpath(&harness, r, i).to_string_lossy(),
                format!("CASE_{}", r),
            )
            .export_line()
        })
        .collect();
    assert_eq!(harness.read_export(), expected);

    // Insertion order is kept in memory.
    let registry = provisioner.registry();
    let registry = registry.lock().unwrap();
    assert_eq!(registry.get(0).unwrap().iteration(), 1);
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_clear_policy_exports_only_latest_pass() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(2, r#"registry = "clear""#);
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true, true], 0).unwrap();
    provisioner.create_run_path(&[true, false], 1).unwrap();

    let lines = harness.read_export();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" 001"));
}

#[test]
fn test_append_policy_keeps_duplicates() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(1, "");
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true], 0).unwrap();
    provisioner.create_run_path(&[true], 0).unwrap();

    let lines = harness.read_export();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], lines[1]);
}

#[test]
fn test_finalize_follows_keep_policy() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(2, r#"keep = "delete""#);
    let provisioner = provisioner(&harness);

    let report = provisioner.create_run_path(&[true, true], 0).unwrap();
    let first = &report.provisioned[0];
    let second = &report.provisioned[1];

    assert!(!provisioner.finalize(first, false).unwrap());
    assert!(Path::new(first.runpath()).exists());

    assert!(provisioner.finalize(second, true).unwrap());
    assert!(!Path::new(second.runpath()).exists());
}

#[test]
fn test_default_keep_policy_retains_experiment_runpaths() {
    let harness = TestHarness::new();
    harness.write_ensemble_config(1, "");
    let provisioner = provisioner(&harness);

    let report = provisioner.create_run_path(&[true], 0).unwrap();
    assert!(!provisioner.finalize(&report.provisioned[0], true).unwrap());
    assert!(runpath(&harness, 0, 0).is_dir());
}

#[test]
fn test_template_file_source_is_instantiated() {
    let harness = TestHarness::new();
    harness.write_template("templates/data.tmpl", "RUNPATH <RUNPATH>\nBASE <ECLBASE>\n");
    harness.write_ensemble_config(
        1,
        r#"
[[runpath.files]]
target = "include/data.inc"
source = "templates/data.tmpl"
"#,
    );
    let provisioner = provisioner(&harness);

    provisioner.create_run_path(&[true], 3).unwrap();

    let dir = runpath(&harness, 0, 3);
    let content = fs::read_to_string(dir.join("include/data.inc")).unwrap();
    assert_eq!(
        content,
        format!("RUNPATH {}\nBASE CASE_0\n", dir.to_string_lossy())
    );
}
