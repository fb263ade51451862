//! Theme build orchestration.
//!
//! Handles the build directory lifecycle and independent build jobs:
//! - Stale output cleanup before a full build
//! - Stylesheet and vendor stylesheet generation
//! - Section and root file copies
//! - Progress tracking with cache-aligned atomic counters

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::copier::copy_files;
use crate::error::BuildError;
use crate::scanner::{scan_root_files, scan_section};
use crate::stylesheet::{build_stylesheet, build_vendor_styles, VENDOR_STYLESHEET};
use crate::theme::Section;

/// An independent unit of build work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildJob {
    /// Merged theme stylesheet from the fragment tree
    Stylesheet,
    /// vendor.css from the configured vendor list
    VendorStyles,
    /// Copy of one theme section
    Section(Section),
    /// Copy of configured root files
    RootFiles,
}

impl fmt::Display for BuildJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildJob::Stylesheet => f.write_str("stylesheet"),
            BuildJob::VendorStyles => f.write_str("vendor styles"),
            BuildJob::Section(section) => write!(f, "{section}"),
            BuildJob::RootFiles => f.write_str("root files"),
        }
    }
}

/// Result of a build job
#[derive(Debug)]
pub struct BuildResult {
    /// Which job this result belongs to
    pub job: BuildJob,
    /// Outcome
    pub status: BuildStatus,
    /// Number of files written
    pub file_count: u64,
    /// Time taken for this job
    pub duration: Duration,
}

/// Build outcome
#[derive(Debug)]
pub enum BuildStatus {
    /// Output written
    Success,
    /// Nothing to do for this project
    Skipped,
    /// Failed with error
    Failed(BuildError),
    /// Cancelled by user (SIGINT)
    Cancelled,
}

/// Cache-line aligned atomic counter to prevent false sharing
/// Each counter is on its own 64-byte cache line
#[repr(align(64))]
pub struct CacheAlignedAtomic(pub AtomicU64);

impl CacheAlignedAtomic {
    pub const fn new(val: u64) -> Self {
        Self(AtomicU64::new(val))
    }
}

/// Counters shared by parallel jobs
pub struct BuildStats {
    pub files_written: CacheAlignedAtomic,
    pub bytes_written: CacheAlignedAtomic,
    pub errors: CacheAlignedAtomic,
}

impl BuildStats {
    pub fn new() -> Self {
        Self {
            files_written: CacheAlignedAtomic::new(0),
            bytes_written: CacheAlignedAtomic::new(0),
            errors: CacheAlignedAtomic::new(0),
        }
    }

    fn record(&self, files: u64, bytes: u64) {
        self.files_written.0.fetch_add(files, Ordering::Relaxed);
        self.bytes_written.0.fetch_add(bytes, Ordering::Relaxed);
    }
}

impl Default for BuildStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Every job of a full build
pub fn job_list() -> Vec<BuildJob> {
    let mut jobs = Vec::with_capacity(Section::ALL.len() + 3);
    jobs.push(BuildJob::Stylesheet);
    jobs.push(BuildJob::VendorStyles);
    jobs.extend(Section::ALL.into_iter().map(BuildJob::Section));
    jobs.push(BuildJob::RootFiles);
    jobs
}

/// Remove stale build output, returns the number of files removed.
///
/// In `assets/` only `stylesheet` and vendor.css are removed; scripts and
/// other assets belong to other tools. Section directories lose their
/// `.liquid`/`.json` files.
pub fn clean_build_dir(build_dir: &Path, stylesheet: &str) -> Result<u64, BuildError> {
    let mut removed = 0u64;

    let assets = build_dir.join("assets");
    for name in [stylesheet, VENDOR_STYLESHEET] {
        let path = assets.join(name);
        if path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    for section in Section::ALL {
        let dir_path = build_dir.join(section.as_str());
        if !dir_path.exists() {
            continue;
        }

        for entry in fs::read_dir(&dir_path).map_err(|e| BuildError::file_system(&dir_path, e))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if section.matches(&entry.file_name().to_string_lossy()) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
    }

    Ok(removed)
}

/// Run a single build job
pub fn run_job(
    job: BuildJob,
    config: &Config,
    shutdown: &AtomicBool,
    stats: &BuildStats,
) -> BuildResult {
    let start = Instant::now();

    if shutdown.load(Ordering::Relaxed) {
        return BuildResult {
            job,
            status: BuildStatus::Cancelled,
            file_count: 0,
            duration: start.elapsed(),
        };
    }

    match execute(job, config, shutdown) {
        Ok(Some((files, bytes))) => {
            stats.record(files, bytes);
            BuildResult {
                job,
                status: BuildStatus::Success,
                file_count: files,
                duration: start.elapsed(),
            }
        }
        Ok(None) => BuildResult {
            job,
            status: BuildStatus::Skipped,
            file_count: 0,
            duration: start.elapsed(),
        },
        Err(BuildError::Cancelled) => BuildResult {
            job,
            status: BuildStatus::Cancelled,
            file_count: 0,
            duration: start.elapsed(),
        },
        Err(e) => {
            stats.errors.0.fetch_add(1, Ordering::Relaxed);
            BuildResult {
                job,
                status: BuildStatus::Failed(e),
                file_count: 0,
                duration: start.elapsed(),
            }
        }
    }
}

/// Returns (files, bytes) written, or None if the job had nothing to do
fn execute(
    job: BuildJob,
    config: &Config,
    shutdown: &AtomicBool,
) -> Result<Option<(u64, u64)>, BuildError> {
    match job {
        BuildJob::Stylesheet => {
            if !config.styles_dir().exists() {
                tracing::warn!(
                    "No stylesheet sources at {}, skipping",
                    config.styles_dir().display()
                );
                return Ok(None);
            }
            let output = build_stylesheet(config)?;
            tracing::debug!(
                "Wrote {} from {} fragment(s)",
                output.path.display(),
                output.fragments
            );
            Ok(Some((1, output.bytes)))
        }
        BuildJob::VendorStyles => Ok(build_vendor_styles(config)?.map(|output| (1, output.bytes))),
        BuildJob::Section(section) => {
            let files = scan_section(&config.source_dir, section);
            if files.is_empty() {
                return Ok(None);
            }
            let dst = config.build_dir.join(section.as_str());
            copy_files(&files, &dst, shutdown).map(Some)
        }
        BuildJob::RootFiles => {
            let files = scan_root_files(&config.project_root, &config.settings.root)?;
            if files.is_empty() {
                return Ok(None);
            }
            copy_files(&files, &config.build_dir, shutdown).map(Some)
        }
    }
}

/// Collect and aggregate results from parallel jobs
pub fn collect_results(results: Vec<BuildResult>) -> (Vec<BuildResult>, bool, bool) {
    let mut all_results = Vec::with_capacity(results.len());
    let mut has_success = false;
    let mut has_failure = false;

    for result in results {
        match &result.status {
            BuildStatus::Success | BuildStatus::Skipped => has_success = true,
            BuildStatus::Failed(_) => has_failure = true,
            BuildStatus::Cancelled => {}
        }
        all_results.push(result);
    }

    (all_results, has_success, has_failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cli, Command, ProjectSettings};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn make_config(root: &Path, settings: ProjectSettings) -> Config {
        let cli = Cli {
            command: Command::Build { dist: false },
            project: root.to_path_buf(),
            source: PathBuf::from("src"),
            build: PathBuf::from("dist"),
            jobs: 2,
            verbose: false,
        };
        Config::with_settings(&cli, root.to_path_buf(), settings)
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn make_result(status: BuildStatus) -> BuildResult {
        BuildResult {
            job: BuildJob::Stylesheet,
            status,
            file_count: 0,
            duration: Duration::from_secs(1),
        }
    }

    // ==================== CacheAlignedAtomic tests ====================

    #[test]
    fn test_cache_aligned_atomic_alignment() {
        assert_eq!(std::mem::align_of::<CacheAlignedAtomic>(), 64);
    }

    #[test]
    fn test_build_stats_record() {
        let stats = BuildStats::default();
        stats.record(3, 1024);
        stats.record(1, 1);
        assert_eq!(stats.files_written.0.load(Ordering::Relaxed), 4);
        assert_eq!(stats.bytes_written.0.load(Ordering::Relaxed), 1025);
        assert_eq!(stats.errors.0.load(Ordering::Relaxed), 0);
    }

    // ==================== job_list tests ====================

    #[test]
    fn test_job_list_covers_everything_once() {
        let jobs = job_list();
        assert_eq!(jobs.len(), 8);
        assert_eq!(jobs[0], BuildJob::Stylesheet);
        for section in Section::ALL {
            assert_eq!(jobs.iter().filter(|j| **j == BuildJob::Section(section)).count(), 1);
        }
        assert!(jobs.contains(&BuildJob::RootFiles));
    }

    #[test]
    fn test_build_job_display() {
        assert_eq!(BuildJob::Section(Section::Snippets).to_string(), "snippets");
        assert_eq!(BuildJob::VendorStyles.to_string(), "vendor styles");
    }

    // ==================== clean_build_dir tests ====================

    #[test]
    fn test_clean_build_dir_removes_only_build_output() {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        write(&dist.join("assets").join("theme.scss.liquid"), "");
        write(&dist.join("assets").join("vendor.css"), "");
        write(&dist.join("assets").join("main.js"), "");
        write(&dist.join("assets").join("fonts.css"), "");
        write(&dist.join("assets").join("logo.png"), "");
        write(&dist.join("snippets").join("card.liquid"), "");
        write(&dist.join("config").join("settings_data.json"), "");
        write(&dist.join("README.md"), "");

        let removed = clean_build_dir(&dist, "theme.scss.liquid").unwrap();

        assert_eq!(removed, 4);
        assert!(!dist.join("assets").join("theme.scss.liquid").exists());
        assert!(!dist.join("assets").join("vendor.css").exists());
        assert!(dist.join("assets").join("main.js").exists());
        assert!(dist.join("assets").join("fonts.css").exists());
        assert!(dist.join("assets").join("logo.png").exists());
        assert!(dist.join("README.md").exists());
        assert!(!dist.join("snippets").join("card.liquid").exists());
    }

    #[test]
    fn test_clean_build_dir_missing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(clean_build_dir(&temp.path().join("dist"), "theme.css").unwrap(), 0);
    }

    #[test]
    fn test_full_build_keeps_foreign_assets() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/scss/base.scss"), "body { margin: 0; }");
        write(&temp.path().join("dist/assets/app.js.liquid"), "bundle");
        write(&temp.path().join("dist/assets/fonts.css"), "@font-face {}");
        let config = make_config(temp.path(), ProjectSettings::default());
        let shutdown = AtomicBool::new(false);
        let stats = BuildStats::new();

        clean_build_dir(&config.build_dir, &config.settings.stylesheet).unwrap();
        for job in job_list() {
            run_job(job, &config, &shutdown, &stats);
        }

        let assets = temp.path().join("dist/assets");
        assert_eq!(fs::read_to_string(assets.join("app.js.liquid")).unwrap(), "bundle");
        assert_eq!(fs::read_to_string(assets.join("fonts.css")).unwrap(), "@font-face {}");
        assert!(assets.join("theme.scss.liquid").exists());
    }

    // ==================== run_job tests ====================

    #[test]
    fn test_run_job_section_copies_files() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/layout/theme.liquid"), "{{ content_for_layout }}");
        let config = make_config(temp.path(), ProjectSettings::default());
        let shutdown = AtomicBool::new(false);
        let stats = BuildStats::new();

        let result = run_job(BuildJob::Section(Section::Layout), &config, &shutdown, &stats);

        assert!(matches!(result.status, BuildStatus::Success));
        assert_eq!(result.file_count, 1);
        assert!(temp.path().join("dist/layout/theme.liquid").exists());
        assert_eq!(stats.files_written.0.load(Ordering::Relaxed), 1);
        assert!(stats.bytes_written.0.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_run_job_empty_section_skipped() {
        let temp = TempDir::new().unwrap();
        let config = make_config(temp.path(), ProjectSettings::default());
        let shutdown = AtomicBool::new(false);
        let stats = BuildStats::new();

        let result = run_job(BuildJob::Section(Section::Locales), &config, &shutdown, &stats);

        assert!(matches!(result.status, BuildStatus::Skipped));
    }

    #[test]
    fn test_run_job_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/layout/theme.liquid"), "x");
        let config = make_config(temp.path(), ProjectSettings::default());
        let shutdown = AtomicBool::new(true);
        let stats = BuildStats::new();

        let result = run_job(BuildJob::Section(Section::Layout), &config, &shutdown, &stats);

        assert!(matches!(result.status, BuildStatus::Cancelled));
        assert!(!temp.path().join("dist/layout/theme.liquid").exists());
    }

    #[test]
    fn test_run_job_stylesheet_failure_counted() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/scss/order.json"), "{broken");
        let config = make_config(temp.path(), ProjectSettings::default());
        let shutdown = AtomicBool::new(false);
        let stats = BuildStats::new();

        let result = run_job(BuildJob::Stylesheet, &config, &shutdown, &stats);

        assert!(matches!(
            result.status,
            BuildStatus::Failed(BuildError::Configuration { .. })
        ));
        assert_eq!(stats.errors.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_run_job_stylesheet_without_sources_skipped() {
        let temp = TempDir::new().unwrap();
        let config = make_config(temp.path(), ProjectSettings::default());
        let shutdown = AtomicBool::new(false);
        let stats = BuildStats::new();

        let result = run_job(BuildJob::Stylesheet, &config, &shutdown, &stats);

        assert!(matches!(result.status, BuildStatus::Skipped));
    }

    #[test]
    fn test_run_job_root_files() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("README.md"), "readme");
        let settings = ProjectSettings {
            root: vec!["*.md".to_string()],
            ..Default::default()
        };
        let config = make_config(temp.path(), settings);
        let shutdown = AtomicBool::new(false);
        let stats = BuildStats::new();

        let result = run_job(BuildJob::RootFiles, &config, &shutdown, &stats);

        assert!(matches!(result.status, BuildStatus::Success));
        assert_eq!(
            fs::read_to_string(temp.path().join("dist/README.md")).unwrap(),
            "readme"
        );
    }

    #[test]
    fn test_full_build_then_clean_round() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/scss/base.scss"), "body { margin: 0; }");
        write(&temp.path().join("src/snippets/card.liquid"), "card");
        write(&temp.path().join("src/templates/index.liquid"), "index");
        let config = make_config(temp.path(), ProjectSettings::default());
        let shutdown = AtomicBool::new(false);
        let stats = BuildStats::new();

        let results: Vec<_> = job_list()
            .into_iter()
            .map(|job| run_job(job, &config, &shutdown, &stats))
            .collect();
        let (results, has_success, has_failure) = collect_results(results);

        assert_eq!(results.len(), 8);
        assert!(has_success);
        assert!(!has_failure);
        assert_eq!(stats.files_written.0.load(Ordering::Relaxed), 3);
        assert!(temp.path().join("dist/assets/theme.scss.liquid").exists());

        assert_eq!(
            clean_build_dir(&config.build_dir, &config.settings.stylesheet).unwrap(),
            3
        );
    }

    // ==================== collect_results tests ====================

    #[test]
    fn test_collect_results_mixed() {
        let results = vec![
            make_result(BuildStatus::Success),
            make_result(BuildStatus::Failed(BuildError::Cancelled)),
            make_result(BuildStatus::Skipped),
        ];

        let (collected, has_success, has_failure) = collect_results(results);

        assert_eq!(collected.len(), 3);
        assert!(has_success);
        assert!(has_failure);
    }

    #[test]
    fn test_collect_results_all_failure() {
        let results = vec![make_result(BuildStatus::Failed(BuildError::Cancelled))];
        let (_, has_success, has_failure) = collect_results(results);
        assert!(!has_success);
        assert!(has_failure);
    }

    #[test]
    fn test_collect_results_cancelled_no_success_no_failure() {
        let results = vec![make_result(BuildStatus::Cancelled)];
        let (_, has_success, has_failure) = collect_results(results);
        assert!(!has_success);
        assert!(!has_failure);
    }

    #[test]
    fn test_collect_results_empty() {
        let (collected, has_success, has_failure) = collect_results(Vec::new());
        assert!(collected.is_empty());
        assert!(!has_success);
        assert!(!has_failure);
    }
}
