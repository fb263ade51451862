//! Rebuild on change.
//!
//! Filesystem events are mapped to the build job that owns the changed path;
//! a burst of events runs each affected job once.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::builder::{run_job, BuildJob, BuildStats, BuildStatus};
use crate::config::{Config, SETTINGS_FILE};
use crate::error::BuildError;
use crate::junk::is_junk;
use crate::theme::Section;

/// Quiet period that ends a burst of events
const DEBOUNCE: Duration = Duration::from_millis(100);

/// How often the shutdown flag is checked while idle
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Maps changed paths to build jobs
pub struct ChangeClassifier {
    styles_dir: PathBuf,
    source_dir: PathBuf,
    vendor_files: Vec<PathBuf>,
    project_root: PathBuf,
    root_patterns: Vec<glob::Pattern>,
}

impl ChangeClassifier {
    pub fn new(config: &Config) -> Self {
        let root_patterns = config
            .settings
            .root
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring root pattern \"{}\": {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            styles_dir: config.styles_dir(),
            source_dir: config.source_dir.clone(),
            vendor_files: config
                .settings
                .css_vendor
                .iter()
                .map(|p| config.project_path(p))
                .collect(),
            project_root: config.project_root.clone(),
            root_patterns,
        }
    }

    /// Directories to register with the watcher
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.source_dir.clone()];
        for vendor in &self.vendor_files {
            if let Some(parent) = vendor.parent() {
                if !roots.iter().any(|r| parent.starts_with(r)) {
                    roots.push(parent.to_path_buf());
                }
            }
        }
        if !self.root_patterns.is_empty() && !roots.contains(&self.project_root) {
            roots.push(self.project_root.clone());
        }
        roots
    }

    /// Job responsible for `path`, if any
    pub fn classify(&self, path: &Path) -> Option<BuildJob> {
        if is_junk(path) {
            return None;
        }

        if path.starts_with(&self.styles_dir) {
            return Some(BuildJob::Stylesheet);
        }

        if let Ok(relative) = path.strip_prefix(&self.source_dir) {
            let first = relative.components().next()?;
            let section = Section::parse(&first.as_os_str().to_string_lossy())?;
            return Some(BuildJob::Section(section));
        }

        if self.vendor_files.iter().any(|v| v == path) {
            return Some(BuildJob::VendorStyles);
        }

        let relative = path.strip_prefix(&self.project_root).ok()?;
        if self.root_patterns.iter().any(|p| p.matches_path(relative)) {
            return Some(BuildJob::RootFiles);
        }

        None
    }
}

/// Convenience wrapper around [`ChangeClassifier::classify`]
pub fn classify_change(config: &Config, path: &Path) -> Option<BuildJob> {
    ChangeClassifier::new(config).classify(path)
}

/// Add the jobs affected by `event` to `pending`, keeping first-seen order
fn collect_jobs(classifier: &ChangeClassifier, event: &Event, pending: &mut Vec<BuildJob>) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    for path in &event.paths {
        if path.parent() == Some(classifier.project_root.as_path())
            && path.file_name().is_some_and(|n| n == SETTINGS_FILE)
        {
            tracing::warn!("{} changed, restart to apply it", SETTINGS_FILE);
            continue;
        }
        if let Some(job) = classifier.classify(path) {
            if !pending.contains(&job) {
                pending.push(job);
            }
        }
    }
}

/// Watch the project and rebuild affected jobs until `shutdown` is set
pub fn watch(config: &Config, shutdown: &AtomicBool, stats: &BuildStats) -> Result<(), BuildError> {
    let classifier = ChangeClassifier::new(config);
    let (tx, rx) = mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    for root in classifier.watch_roots() {
        if root.exists() {
            // Only the top level of the project root; sources are covered above
            let mode = if root == classifier.project_root {
                RecursiveMode::NonRecursive
            } else {
                RecursiveMode::Recursive
            };
            watcher.watch(&root, mode)?;
            tracing::debug!("Watching {}", root.display());
        }
    }

    tracing::info!("Watching for changes, press Ctrl+C to stop");

    let mut pending: Vec<BuildJob> = Vec::new();
    while !shutdown.load(Ordering::Relaxed) {
        let timeout = if pending.is_empty() {
            POLL_INTERVAL
        } else {
            DEBOUNCE
        };

        match rx.recv_timeout(timeout) {
            Ok(event) => collect_jobs(&classifier, &event, &mut pending),
            Err(RecvTimeoutError::Timeout) => {
                for job in pending.drain(..) {
                    rebuild(job, config, shutdown, stats);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

fn rebuild(job: BuildJob, config: &Config, shutdown: &AtomicBool, stats: &BuildStats) {
    let result = run_job(job, config, shutdown, stats);
    match &result.status {
        BuildStatus::Success => tracing::info!(
            "Rebuilt {} ({} files, {:.2}s)",
            job,
            result.file_count,
            result.duration.as_secs_f64()
        ),
        BuildStatus::Skipped => tracing::info!("Nothing to build for {}", job),
        BuildStatus::Failed(e) => tracing::error!("Rebuilding {} failed: {}", job, e),
        BuildStatus::Cancelled => {}
    }
}
