//! File watching for the `dev` task.
//!
//! Runs happen synchronously on the event-loop thread, so a process never has
//! more than one run in flight. Changes that arrive while a run is in progress
//! queue up in the channel; once the run finishes they are drained and folded
//! into a single follow-up run.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use glob::Pattern;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};

use crate::error::{PipelineError, Result};
use crate::ui;

/// Directory to watch for a glob: every leading component without glob syntax.
pub fn pattern_root(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(pattern).components() {
        if let Component::Normal(part) = component {
            if part.to_string_lossy().contains(['*', '?', '[', '{']) {
                break;
            }
        }
        root.push(component.as_os_str());
    }
    if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    }
}

/// Watched globs resolved against the project root
#[derive(Debug, Clone)]
pub struct WatchSet {
    roots: Vec<PathBuf>,
    patterns: Vec<Pattern>,
}

impl WatchSet {
    pub fn new(root: &Path, globs: &[String]) -> Result<Self> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let mut roots: Vec<PathBuf> = Vec::new();
        let mut patterns = Vec::new();

        for glob in globs {
            let glob = glob.trim_start_matches("./");
            let absolute = root.join(glob);
            let pattern = Pattern::new(&absolute.to_string_lossy()).map_err(|e| {
                PipelineError::config(format!("Invalid watch pattern '{}': {}", glob, e))
            })?;
            patterns.push(pattern);

            let dir = root.join(pattern_root(glob));
            if !roots.contains(&dir) {
                roots.push(dir);
            }
        }

        Ok(WatchSet { roots, patterns })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path(path))
    }

    fn relevant(&self, result: DebounceEventResult) -> Vec<PathBuf> {
        match result {
            Ok(events) => events
                .into_iter()
                .map(|e| e.path)
                .filter(|p| self.matches(p))
                .collect(),
            Err(error) => {
                tracing::warn!("watch error: {:?}", error);
                Vec::new()
            }
        }
    }

    /// Everything that queued up while the last run was busy.
    fn drain(&self, rx: &Receiver<DebounceEventResult>) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        while let Ok(result) = rx.try_recv() {
            changed.extend(self.relevant(result));
        }
        changed
    }
}

/// Watch until the channel closes, calling `on_change` once per batch of
/// matching changes. A failing run is reported and watching continues.
pub fn watch<F>(set: &WatchSet, debounce: Duration, mut on_change: F) -> Result<()>
where
    F: FnMut(&[PathBuf]) -> Result<()>,
{
    let (tx, rx) = mpsc::channel();
    let mut debouncer =
        new_debouncer(debounce, tx).map_err(|e| PipelineError::watch(e.to_string()))?;

    for dir in set.roots() {
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "watch directory does not exist; skipping");
            continue;
        }
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| PipelineError::watch(format!("{}: {}", dir.display(), e)))?;
        tracing::debug!(dir = %dir.display(), "watching");
    }

    ui::display_status("Waiting for changes...");
    process_events(set, &rx, &mut on_change);
    Err(PipelineError::watch("file watcher stopped"))
}

/// Call `on_change` for each batch of matching changes until the channel
/// closes, and return the number of runs. Everything that queued up during a
/// run is folded into the next one.
pub fn process_events<F>(
    set: &WatchSet,
    rx: &Receiver<DebounceEventResult>,
    on_change: &mut F,
) -> usize
where
    F: FnMut(&[PathBuf]) -> Result<()>,
{
    let mut runs = 0;
    while let Ok(result) = rx.recv() {
        let mut changed = set.relevant(result);

        while !changed.is_empty() {
            changed.sort();
            changed.dedup();
            ui::display_status(&format!("Detected {} change(s)", changed.len()));
            runs += 1;
            if let Err(e) = on_change(&changed) {
                ui::display_error(&e.to_string());
            }
            changed = set.drain(rx);
        }
    }
    runs
}
