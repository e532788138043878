//! File watcher that re-runs tasks when watched sources change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::tasks::{Task, TaskError, TaskRunner};

/// Which tasks to run when which files change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub tasks: Vec<String>,
    pub files: Vec<PathBuf>,
    pub verbose: bool,
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            tasks: vec!["compile".to_string()],
            files: vec![PathBuf::from("./contracts")],
            verbose: true,
            poll_interval_ms: 500,
        }
    }
}

impl WatcherConfig {
    /// Parse the configured task names up front so typos fail before watching.
    pub fn parsed_tasks(&self) -> Result<Vec<Task>, TaskError> {
        self.tasks.iter().map(|name| name.parse()).collect()
    }
}

/// Modification times of every file under the watched paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot(BTreeMap<PathBuf, SystemTime>);

impl Snapshot {
    /// Missing or unreadable paths contribute nothing.
    pub fn capture(paths: &[PathBuf]) -> Self {
        let mut files = BTreeMap::new();
        for path in paths {
            collect(path, &mut files);
        }
        Snapshot(files)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paths added, removed or modified since `earlier`
    pub fn changed_since(&self, earlier: &Snapshot) -> Vec<PathBuf> {
        let mut changed: Vec<PathBuf> = self
            .0
            .iter()
            .filter(|(path, modified)| earlier.0.get(*path) != Some(*modified))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            earlier
                .0
                .keys()
                .filter(|path| !self.0.contains_key(*path))
                .cloned(),
        );
        changed.sort();
        changed
    }
}

fn collect(path: &Path, files: &mut BTreeMap<PathBuf, SystemTime>) {
    let Ok(metadata) = std::fs::metadata(path) else {
        return;
    };
    if metadata.is_file() {
        if let Ok(modified) = metadata.modified() {
            files.insert(path.to_path_buf(), modified);
        }
        return;
    }
    let Ok(entries) = std::fs::read_dir(path) else {
        return;
    };
    for entry in entries.flatten() {
        collect(&entry.path(), files);
    }
}

/// Watch the configured files until Ctrl-C, running the configured tasks in
/// order after every change. Task failures are logged, not fatal.
pub async fn watch(runner: &TaskRunner<'_>, config: &WatcherConfig) -> Result<(), TaskError> {
    watch_until(runner, config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Same as [`watch`], stopping once `shutdown` completes.
///
/// `shutdown` is created and polled once for the whole run, so a signal that
/// arrives while tasks are running is not lost.
pub async fn watch_until<F>(
    runner: &TaskRunner<'_>,
    config: &WatcherConfig,
    shutdown: F,
) -> Result<(), TaskError>
where
    F: Future<Output = ()>,
{
    let tasks = config.parsed_tasks()?;
    let root = &runner.config().paths.root;
    let paths: Vec<PathBuf> = config
        .files
        .iter()
        .map(|path| if path.is_absolute() { path.clone() } else { root.join(path) })
        .collect();

    let mut previous = Snapshot::capture(&paths);
    info!(
        files = previous.len(),
        tasks = ?config.tasks,
        "watching for changes, press Ctrl-C to stop"
    );

    let period = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("watcher stopped");
                return Ok(());
            }
            _ = interval.tick() => {}
        }

        let current = Snapshot::capture(&paths);
        let changed = current.changed_since(&previous);
        if changed.is_empty() {
            continue;
        }
        previous = current;

        if config.verbose {
            for path in &changed {
                info!(path = %path.display(), "changed");
            }
        } else {
            debug!(count = changed.len(), "files changed");
        }

        if let Err(err) = runner.run_all(&tasks) {
            error!("task failed: {err}");
        }
    }
}
