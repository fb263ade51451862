//! CLI configuration, project settings, and runtime configuration.

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::order::{
    ResolveOptions, DEFAULT_FRAGMENT_EXTENSIONS, DEFAULT_MANIFEST_NAME, DEFAULT_MAX_DEPTH,
};
use crate::theme::BuildMode;
use crate::version::BumpType;

/// Project settings file, looked up in the project root
pub const SETTINGS_FILE: &str = "config.json";

/// Default version data file, bumped and timestamped
const DEFAULT_VERSION_DATA: &str = "src/scripts/data/version.json";

/// Build pipeline for Shopify storefront themes
#[derive(Parser, Debug)]
#[command(name = "theme-build")]
#[command(version)]
#[command(about = "Build pipeline for Shopify storefront themes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Theme project root (where config.json lives)
    #[arg(short, long, default_value = ".", global = true)]
    pub project: PathBuf,

    /// Source directory, relative to the project root
    #[arg(short, long, default_value = "src", global = true)]
    pub source: PathBuf,

    /// Build directory, relative to the project root
    #[arg(short, long, default_value = "dist", global = true)]
    pub build: PathBuf,

    /// Number of parallel workers
    #[arg(short, long, default_value_t = num_cpus::get(), global = true)]
    pub jobs: usize,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Clean the build directory and build the theme
    Build {
        /// Compress stylesheets for production
        #[arg(long)]
        dist: bool,
    },

    /// Build the theme, then rebuild whatever changes
    Watch {
        /// Compress stylesheets for production
        #[arg(long)]
        dist: bool,
    },

    /// Bump the theme version in the configured JSON files
    Bump(BumpArgs),

    /// Print the resolved stylesheet concatenation order
    Order {
        /// Directory to resolve (defaults to the configured styles directory)
        dir: Option<PathBuf>,
    },
}

impl Command {
    /// Build mode requested by the command
    pub fn mode(&self) -> BuildMode {
        match self {
            Command::Build { dist } | Command::Watch { dist } => BuildMode::from_dist_flag(*dist),
            Command::Bump(_) | Command::Order { .. } => BuildMode::Development,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct BumpArgs {
    /// Bump the major version
    #[arg(long)]
    pub major: bool,

    /// Bump the minor version
    #[arg(long)]
    pub minor: bool,

    /// Bump the patch version
    #[arg(long)]
    pub patch: bool,
}

impl BumpArgs {
    pub fn bump_type(&self) -> BumpType {
        if self.major {
            BumpType::Major
        } else if self.minor {
            BumpType::Minor
        } else {
            BumpType::Patch
        }
    }
}

/// Contents of config.json. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    /// Glob patterns (relative to the project root) copied to the build root
    pub root: Vec<String>,
    /// Load paths for `@import` when compiling stylesheets
    pub scss_include_paths: Vec<PathBuf>,
    /// Vendor stylesheets concatenated into vendor.css, in order
    pub css_vendor: Vec<PathBuf>,
    /// Output name of the merged theme stylesheet in assets/
    pub stylesheet: String,
    /// Stylesheet fragment tree, relative to the source directory
    pub styles_dir: PathBuf,
    /// File name of per-directory ordering manifests
    pub order_manifest: String,
    /// Fragment extensions used for unordered directories
    pub fragment_extensions: Vec<String>,
    /// JSON files whose `version` field is bumped
    pub version_files: Vec<PathBuf>,
    /// JSON file receiving the bump timestamp
    pub version_data: Option<PathBuf>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            root: Vec::new(),
            scss_include_paths: Vec::new(),
            css_vendor: Vec::new(),
            stylesheet: "theme.scss.liquid".to_string(),
            styles_dir: PathBuf::from("scss"),
            order_manifest: DEFAULT_MANIFEST_NAME.to_string(),
            fragment_extensions: DEFAULT_FRAGMENT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            version_files: vec![
                PathBuf::from("bower.json"),
                PathBuf::from("package.json"),
                PathBuf::from("test/package.json"),
                PathBuf::from(DEFAULT_VERSION_DATA),
            ],
            version_data: Some(PathBuf::from(DEFAULT_VERSION_DATA)),
        }
    }
}

impl ProjectSettings {
    /// Load settings from `<project_root>/config.json`, falling back to
    /// defaults when the file does not exist
    pub fn load(project_root: &Path) -> Result<Self, BuildError> {
        let path = project_root.join(SETTINGS_FILE);
        if !path.exists() {
            tracing::debug!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| BuildError::file_system(&path, e))?;
        Self::parse(&content, &path)
    }

    /// Parse and validate settings; `path` is only used for error reporting
    pub fn parse(content: &str, path: &Path) -> Result<Self, BuildError> {
        let mut settings: ProjectSettings = serde_json::from_str(content)
            .map_err(|e| BuildError::configuration(path, e.to_string()))?;

        if settings.stylesheet.trim().is_empty() || settings.stylesheet.contains(['/', '\\']) {
            return Err(BuildError::configuration(
                path,
                "stylesheet must be a plain file name",
            ));
        }

        let manifest = &settings.order_manifest;
        if manifest.trim().is_empty() || manifest.contains(['/', '\\']) {
            return Err(BuildError::configuration(
                path,
                "orderManifest must be a plain file name",
            ));
        }

        // Accept ".scss" as well as "scss"
        for ext in &mut settings.fragment_extensions {
            *ext = ext.trim_start_matches('.').to_string();
        }
        if settings.fragment_extensions.iter().any(String::is_empty) {
            return Err(BuildError::configuration(path, "empty fragment extension"));
        }
        if settings.fragment_extensions.is_empty() {
            return Err(BuildError::configuration(
                path,
                "fragmentExtensions must not be empty",
            ));
        }

        Ok(settings)
    }
}

/// Runtime configuration parsed from CLI and project settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory
    pub project_root: PathBuf,
    /// Theme source directory
    pub source_dir: PathBuf,
    /// Build output directory
    pub build_dir: PathBuf,
    /// Development or dist build
    pub mode: BuildMode,
    /// Number of parallel workers
    pub jobs: usize,
    /// Enable verbose output
    pub verbose: bool,
    /// Settings from config.json
    pub settings: ProjectSettings,
}

impl Config {
    /// Create Config from CLI arguments, loading config.json from the project root
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let project_root = cli.project.canonicalize().unwrap_or_else(|_| cli.project.clone());
        let settings = ProjectSettings::load(&project_root)?;
        Ok(Self::with_settings(cli, project_root, settings))
    }

    /// Assemble a Config from already loaded settings
    pub fn with_settings(cli: &Cli, project_root: PathBuf, settings: ProjectSettings) -> Self {
        Config {
            source_dir: project_root.join(&cli.source),
            build_dir: project_root.join(&cli.build),
            project_root,
            mode: cli.command.mode(),
            jobs: cli.jobs.max(1),
            verbose: cli.verbose,
            settings,
        }
    }

    /// Root of the stylesheet fragment tree
    pub fn styles_dir(&self) -> PathBuf {
        self.source_dir.join(&self.settings.styles_dir)
    }

    /// Build directory for compiled assets
    pub fn assets_dir(&self) -> PathBuf {
        self.build_dir.join("assets")
    }

    /// Resolve a settings path against the project root
    pub fn project_path(&self, path: &Path) -> PathBuf {
        self.project_root.join(path)
    }

    /// Order resolution settings derived from config.json
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            manifest_name: self.settings.order_manifest.clone(),
            extensions: self.settings.fragment_extensions.clone(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
