use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runs the binary against a private data file inside a temporary directory
pub struct CliTestHarness {
    temp_dir: TempDir,
    data_path: PathBuf,
    backend: &'static str,
}

impl CliTestHarness {
    pub fn new() -> Self {
        Self::with_backend("json")
    }

    pub fn with_backend(backend: &'static str) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let file_name = if backend == "sqlite" { "test.db" } else { "test.json" };
        let data_path = temp_dir.path().join(file_name);

        Self {
            temp_dir,
            data_path,
            backend,
        }
    }

    /// A command isolated from any cadence.toml or CADENCE_* settings of the host
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cadence").expect("Failed to find cadence binary");
        cmd.current_dir(self.temp_dir.path())
            .env_remove("RUST_LOG")
            .env_remove("CADENCE_RECURRENCE__HORIZON_DAYS")
            .env_remove("CADENCE_LEGACY_IMPORT")
            .env("CADENCE_BACKEND", self.backend)
            .env("CADENCE_DATA_PATH", &self.data_path);
        cmd
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Every stored row, templates included, as parsed JSON
    pub fn all_tasks(&self) -> Vec<Value> {
        let output = self
            .command()
            .args(["list", "--templates", "--json"])
            .output()
            .expect("Failed to run list");
        assert!(output.status.success(), "list failed: {:?}", output);
        serde_json::from_slice(&output.stdout).expect("list --json printed invalid JSON")
    }

    pub fn instances_of(&self, template_id: i64) -> Vec<Value> {
        self.all_tasks()
            .into_iter()
            .filter(|task| task["template_id"].as_i64() == Some(template_id))
            .collect()
    }
}

pub mod assertions {
    use predicates::prelude::*;

    pub fn has_task_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Title"))
            .and(predicate::str::contains("Status"))
    }

    pub fn task_created_successfully() -> impl Predicate<str> {
        predicate::str::contains("✓").and(predicate::str::contains("Created"))
    }

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }
}
