//! Project tasks run against one selected network.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compiler::{apply_license_identifier, LicenseEdit};
use crate::config::Config;
use crate::harness::{self, HarnessError, LocalSimulation, ScenarioReport};
use crate::network::NetworkProfile;
use crate::preprocess::{remove_console_log, strips_console_log};

/// Subdirectory of the cache that receives preprocessed sources
pub const PREPROCESSED_DIR: &str = "preprocessed";

const SOURCE_EXTENSION: &str = "sol";

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown task: {0}. Must be: compile, test, or clean")]
    UnknownTask(String),

    #[error(transparent)]
    Harness(#[from] HarnessError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TaskError + '_ {
    move |source| TaskError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Compile,
    Test,
    Clean,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Compile => "compile",
            Task::Test => "test",
            Task::Clean => "clean",
        }
    }
}

impl FromStr for Task {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compile" => Ok(Task::Compile),
            "test" => Ok(Task::Test),
            "clean" => Ok(Task::Clean),
            other => Err(TaskError::UnknownTask(other.to_string())),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Totals from one `compile` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub files: usize,
    pub licenses_inserted: usize,
    pub licenses_replaced: usize,
    pub console_lines_removed: usize,
    pub output_dir: PathBuf,
}

/// What a task produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Compiled(CompileReport),
    Tested(ScenarioReport),
    Cleaned(Vec<PathBuf>),
}

/// Runs tasks with one configuration bound to one network
pub struct TaskRunner<'a> {
    config: &'a Config,
    network: &'a NetworkProfile,
}

impl<'a> TaskRunner<'a> {
    pub fn new(config: &'a Config, network: &'a NetworkProfile) -> Self {
        Self { config, network }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn network(&self) -> &'a NetworkProfile {
        self.network
    }

    pub fn run(&self, task: Task) -> Result<TaskOutcome, TaskError> {
        info!(task = %task, network = %self.network.name, "running task");
        match task {
            Task::Compile => self.compile().map(TaskOutcome::Compiled),
            Task::Test => self.test().map(TaskOutcome::Tested),
            Task::Clean => self.clean().map(TaskOutcome::Cleaned),
        }
    }

    /// Run tasks in order, stopping at the first failure.
    pub fn run_all(&self, tasks: &[Task]) -> Result<Vec<TaskOutcome>, TaskError> {
        tasks.iter().map(|task| self.run(*task)).collect()
    }

    /// Normalize license identifiers in the sources, then write preprocessed
    /// copies for the selected network into the cache.
    pub fn compile(&self) -> Result<CompileReport, TaskError> {
        let sources_dir = &self.config.paths.sources;
        let output_dir = self.config.paths.cache.join(PREPROCESSED_DIR);
        let strip = strips_console_log(self.network);
        let spdx = &self.config.spdx;

        let mut sources = Vec::new();
        if sources_dir.exists() {
            find_sources(sources_dir, &mut sources)?;
        } else {
            warn!(path = %sources_dir.display(), "sources directory not found");
        }
        sources.sort();

        let mut report = CompileReport {
            output_dir: output_dir.clone(),
            ..Default::default()
        };

        for path in &sources {
            let mut text = std::fs::read_to_string(path).map_err(io_error(path))?;

            if spdx.run_on_compile {
                let edit = apply_license_identifier(&text, &spdx.license, spdx.overwrite);
                match &edit {
                    LicenseEdit::Unchanged => {}
                    LicenseEdit::Inserted(_) => report.licenses_inserted += 1,
                    LicenseEdit::Replaced(_) => report.licenses_replaced += 1,
                }
                if let Some(updated) = edit.text() {
                    std::fs::write(path, updated).map_err(io_error(path))?;
                    debug!(path = %path.display(), "license identifier updated");
                    text = updated.to_string();
                }
            }

            if strip {
                let processed = remove_console_log(&text);
                report.console_lines_removed += processed.removed;
                text = processed.text;
            }

            let relative = path.strip_prefix(sources_dir).unwrap_or(path);
            let target = output_dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            std::fs::write(&target, text).map_err(io_error(&target))?;
            report.files += 1;
        }

        info!(
            files = report.files,
            licenses_inserted = report.licenses_inserted,
            licenses_replaced = report.licenses_replaced,
            console_lines_removed = report.console_lines_removed,
            "sources prepared for {} {}",
            self.config.solidity.version,
            if self.config.solidity.optimizer.enabled {
                "with optimizer"
            } else {
                "without optimizer"
            }
        );
        Ok(report)
    }

    /// Run the deploy-and-assert scenario on the selected network.
    pub fn test(&self) -> Result<ScenarioReport, TaskError> {
        let simulation = LocalSimulation::for_profile(self.network)?;
        Ok(harness::run_default_scenario(&simulation)?)
    }

    /// Remove the cache and artifacts directories.
    pub fn clean(&self) -> Result<Vec<PathBuf>, TaskError> {
        let mut removed = Vec::new();
        for dir in [&self.config.paths.cache, &self.config.paths.artifacts] {
            if dir.exists() {
                std::fs::remove_dir_all(dir).map_err(io_error(dir))?;
                removed.push(dir.clone());
            }
        }
        Ok(removed)
    }
}

fn find_sources(dir: &Path, sources: &mut Vec<PathBuf>) -> Result<(), TaskError> {
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if path.is_dir() {
            find_sources(&path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
            sources.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, ProjectFile};
    use std::fs;

    const SOURCE: &str = "\
pragma solidity ^0.8.1;
import \"hardhat/console.sol\";

contract Contract {
    function f() public { console.log(\"x\"); }
}
";

    fn project(spdx: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/token")).unwrap();
        fs::write(dir.path().join("src/Contract.sol"), SOURCE).unwrap();
        fs::write(
            dir.path().join("src/token/Launch.sol"),
            format!("// SPDX-License-Identifier: GPL-3.0\n{SOURCE}"),
        )
        .unwrap();
        fs::write(dir.path().join("src/README.md"), "not a source").unwrap();
        let file = ProjectFile::parse(spdx).unwrap();
        let config = Config::resolve(&Environment::default(), Some(&file), dir.path()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_task_names() {
        assert_eq!("compile".parse::<Task>().unwrap(), Task::Compile);
        assert_eq!("test".parse::<Task>().unwrap(), Task::Test);
        assert_eq!("clean".parse::<Task>().unwrap(), Task::Clean);
        assert!(matches!("deploy".parse::<Task>(), Err(TaskError::UnknownTask(_))));
    }

    #[test]
    fn test_compile_on_local_network_keeps_console() {
        let (dir, config) = project("");
        let runner = TaskRunner::new(&config, config.network(None).unwrap());
        let report = runner.compile().unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(report.licenses_inserted, 1);
        assert_eq!(report.licenses_replaced, 0);
        assert_eq!(report.console_lines_removed, 0);

        let normalized = fs::read_to_string(dir.path().join("src/Contract.sol")).unwrap();
        assert!(normalized.starts_with("// SPDX-License-Identifier: MIT\n"));
        let kept = fs::read_to_string(dir.path().join("src/token/Launch.sol")).unwrap();
        assert!(kept.starts_with("// SPDX-License-Identifier: GPL-3.0\n"));

        let output = dir.path().join("build/cache/preprocessed/token/Launch.sol");
        assert!(fs::read_to_string(output).unwrap().contains("console.log"));
    }

    #[test]
    fn test_compile_for_live_network_strips_console() {
        let (dir, config) = project("[spdx]\noverwrite = true\n");
        let runner = TaskRunner::new(&config, config.network(Some("alfajores")).unwrap());
        let report = runner.compile().unwrap();

        assert_eq!(report.licenses_inserted, 1);
        assert_eq!(report.licenses_replaced, 1);
        assert_eq!(report.console_lines_removed, 4);

        let output_path = dir.path().join("build/cache/preprocessed/Contract.sol");
        let output = fs::read_to_string(output_path).unwrap();
        assert!(!output.contains("console"));
        assert!(output.contains("contract Contract {"));
        let launch = fs::read_to_string(dir.path().join("src/token/Launch.sol")).unwrap();
        assert!(launch.starts_with("// SPDX-License-Identifier: MIT\n"));
    }

    #[test]
    fn test_compile_without_license_normalization() {
        let (dir, config) = project("[spdx]\nrun_on_compile = false\n");
        let runner = TaskRunner::new(&config, config.network(None).unwrap());
        let report = runner.compile().unwrap();

        assert_eq!(report.licenses_inserted, 0);
        assert_eq!(fs::read_to_string(dir.path().join("src/Contract.sol")).unwrap(), SOURCE);
    }

    #[test]
    fn test_compile_without_sources_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::resolve(&Environment::default(), None, dir.path()).unwrap();
        let runner = TaskRunner::new(&config, config.network(None).unwrap());
        assert_eq!(runner.compile().unwrap().files, 0);
    }

    #[test]
    fn test_clean_removes_build_dirs() {
        let (dir, config) = project("");
        let runner = TaskRunner::new(&config, config.network(None).unwrap());
        runner.compile().unwrap();
        fs::create_dir_all(dir.path().join("build/artifacts")).unwrap();

        let removed = runner.clean().unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!dir.path().join("build/cache").exists());
        assert!(runner.clean().unwrap().is_empty());
    }

    #[test]
    fn test_test_task_on_local_network() {
        let (_dir, config) = project("");
        let runner = TaskRunner::new(&config, config.network(None).unwrap());
        match runner.run(Task::Test).unwrap() {
            TaskOutcome::Tested(report) => assert_eq!(report.amount, 10),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_test_task_rejects_live_network() {
        let (_dir, config) = project("");
        let runner = TaskRunner::new(&config, config.network(Some("mainnet")).unwrap());
        assert!(matches!(
            runner.test(),
            Err(TaskError::Harness(HarnessError::UnsupportedNetwork(_)))
        ));
    }

    #[test]
    fn test_run_all_stops_at_first_failure() {
        let (dir, config) = project("");
        let runner = TaskRunner::new(&config, config.network(Some("mainnet")).unwrap());
        let result = runner.run_all(&[Task::Test, Task::Compile]);
        assert!(result.is_err());
        assert!(!dir.path().join("build/cache").exists());
    }
}
