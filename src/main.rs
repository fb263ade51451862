use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopify_theme_build::builder::{
    clean_build_dir, collect_results, job_list, run_job, BuildStats, BuildStatus,
};
use shopify_theme_build::config::{BumpArgs, Cli, Command, Config};
use shopify_theme_build::order::resolve_order_fs;
use shopify_theme_build::version::{bump_files, stamp_version_data};
use shopify_theme_build::watcher::watch;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = Config::from_cli(&cli)?;

    if !config.project_root.exists() {
        bail!("Project root not found: {}", config.project_root.display());
    }

    match &cli.command {
        Command::Build { .. } => {
            let shutdown = install_shutdown_handler()?;
            build(&config, &shutdown)
        }
        Command::Watch { .. } => {
            let shutdown = install_shutdown_handler()?;
            let code = build(&config, &shutdown)?;
            if shutdown.load(Ordering::Relaxed) {
                return Ok(code);
            }
            watch(&config, &shutdown, &BuildStats::new()).context("Watcher stopped")?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Bump(args) => bump(&config, args),
        Command::Order { dir } => {
            let dir = dir
                .as_ref()
                .map(|d| config.project_path(d))
                .unwrap_or_else(|| config.styles_dir());
            let order = resolve_order_fs(&dir, &config.resolve_options())
                .with_context(|| format!("Failed to resolve order of {}", dir.display()))?;
            for entry in &order {
                println!("{entry}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;
    Ok(shutdown)
}

fn build(config: &Config, shutdown: &AtomicBool) -> Result<ExitCode> {
    if !config.source_dir.exists() {
        bail!("Source directory not found: {}", config.source_dir.display());
    }

    // Configure Rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build_global()
        .ok();

    let removed = clean_build_dir(&config.build_dir, &config.settings.stylesheet)
        .with_context(|| format!("Failed to clean {}", config.build_dir.display()))?;
    tracing::debug!("Removed {} stale file(s) from {}", removed, config.build_dir.display());

    let jobs = job_list();
    let total_jobs = jobs.len();
    if config.verbose {
        eprintln!(
            "Building {} job(s) in {} mode with {} worker(s)",
            total_jobs,
            config.mode.as_str(),
            config.jobs
        );
    }

    let start = Instant::now();
    let stats = BuildStats::new();

    // Progress bar only in verbose mode
    let progress = if config.verbose {
        let pb = ProgressBar::new(total_jobs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let results: Vec<_> = jobs
        .par_iter()
        .map(|job| {
            let result = run_job(*job, config, shutdown, &stats);
            if let Some(ref pb) = progress {
                pb.set_message(job.to_string());
                pb.inc(1);
            }
            result
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    if shutdown.load(Ordering::Relaxed) {
        eprintln!("\nBuild cancelled");
        return Ok(ExitCode::from(130));
    }

    let (results, has_success, has_failure) = collect_results(results);
    let duration = start.elapsed();
    let total_files = stats.files_written.0.load(Ordering::Relaxed);
    let total_bytes = stats.bytes_written.0.load(Ordering::Relaxed);

    println!(
        "Built {} files ({} KiB) in {:.2}s",
        total_files,
        total_bytes / 1024,
        duration.as_secs_f64()
    );

    for result in &results {
        let status_str = match &result.status {
            BuildStatus::Success => format!("{} files", result.file_count),
            BuildStatus::Skipped => "skipped".to_string(),
            BuildStatus::Failed(e) => format!("FAILED: {e}"),
            BuildStatus::Cancelled => "cancelled".to_string(),
        };
        println!("  {}: {}", result.job, status_str);
    }

    if has_failure && !has_success {
        Ok(ExitCode::from(2))
    } else if has_failure {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn bump(config: &Config, args: &BumpArgs) -> Result<ExitCode> {
    let bump_type = args.bump_type();

    let changes = bump_files(&config.project_root, &config.settings.version_files, bump_type)
        .with_context(|| format!("Failed to apply {bump_type} bump"))?;

    if changes.is_empty() {
        bail!("No version files found in {}", config.project_root.display());
    }

    if let Some(ref data) = config.settings.version_data {
        let path = config.project_path(data);
        if path.exists() {
            stamp_version_data(&path, &chrono::Local::now())
                .with_context(|| format!("Failed to stamp {}", path.display()))?;
        } else {
            tracing::warn!("Skipping timestamp: {} not found", path.display());
        }
    }

    for change in &changes {
        println!("{}: {} -> {}", change.path.display(), change.from, change.to);
    }

    Ok(ExitCode::SUCCESS)
}
