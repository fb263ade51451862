//! Stylesheet assembly: concatenation of resolved fragments and vendor CSS.
//!
//! `.scss` and `.scss.liquid` outputs are written as merged source since
//! Shopify compiles them when serving. `.css` outputs are compiled with grass.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use grass::{Options, OutputStyle};

use crate::config::Config;
use crate::copier::write_file;
use crate::error::BuildError;
use crate::junk::is_junk_name;
use crate::order::{list_error, resolve_order_fs, DirectoryListing, FsListing, OrderEntry};
use crate::theme::BuildMode;

/// Output name of the vendor stylesheet
pub const VENDOR_STYLESHEET: &str = "vendor.css";

/// A written stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOutput {
    pub path: PathBuf,
    /// Number of source files merged into it
    pub fragments: usize,
    pub bytes: u64,
}

/// Expand a resolved order into concrete files.
///
/// Globs match non-junk files named `*.{extension}` directly inside their
/// directory, sorted by name. A file is emitted only once.
pub fn expand_entries(
    entries: &[OrderEntry],
    listing: &dyn DirectoryListing,
) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for entry in entries {
        match entry {
            OrderEntry::File(path) => {
                if seen.insert(path.clone()) {
                    files.push(path.clone());
                }
            }
            OrderEntry::Glob { dir, extension } => {
                let suffix = format!(".{extension}");
                let mut names: Vec<String> = listing
                    .list(dir)
                    .map_err(|e| list_error(dir, e))?
                    .into_iter()
                    .filter(|entry| !entry.is_dir() && !is_junk_name(&entry.name))
                    .map(|entry| entry.name)
                    .filter(|name| name.len() > suffix.len() && name.ends_with(&suffix))
                    .collect();
                names.sort();

                for name in names {
                    let path = dir.join(name);
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
            }
        }
    }

    Ok(files)
}

/// Concatenate files in order, each followed by a line break
pub fn concatenate(files: &[PathBuf]) -> Result<String, BuildError> {
    let mut merged = String::new();

    for path in files {
        let content = fs::read_to_string(path).map_err(|e| BuildError::file_system(path, e))?;
        merged.push_str(&content);
        if !content.ends_with('\n') {
            merged.push('\n');
        }
    }

    Ok(merged)
}

/// Compile SCSS (or plain CSS) to CSS. `origin` is only used in errors.
pub fn compile_css(
    source: &str,
    origin: &Path,
    load_paths: &[PathBuf],
    mode: BuildMode,
) -> Result<String, BuildError> {
    let style = if mode.is_dist() {
        OutputStyle::Compressed
    } else {
        OutputStyle::Expanded
    };

    let options = Options::default().load_paths(load_paths).style(style);

    grass::from_string(source, &options).map_err(|e| BuildError::StyleCompile {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

/// Whether an output name needs compiling rather than passing through
#[inline]
pub fn needs_compile(stylesheet: &str) -> bool {
    stylesheet.ends_with(".css")
}

/// Build the merged theme stylesheet into the assets directory
pub fn build_stylesheet(config: &Config) -> Result<StyleOutput, BuildError> {
    let styles_dir = config.styles_dir();
    let order = resolve_order_fs(&styles_dir, &config.resolve_options())?;
    for entry in &order {
        tracing::debug!("order: {}", entry);
    }

    let files = expand_entries(&order, &FsListing)?;
    let merged = concatenate(&files)?;

    let stylesheet = &config.settings.stylesheet;
    let output = if needs_compile(stylesheet) {
        let load_paths: Vec<PathBuf> = config
            .settings
            .scss_include_paths
            .iter()
            .map(|p| config.project_path(p))
            .chain(std::iter::once(styles_dir.clone()))
            .collect();
        compile_css(&merged, &styles_dir, &load_paths, config.mode)?
    } else {
        merged
    };

    let path = config.assets_dir().join(stylesheet);
    let bytes = write_file(&path, &output)?;

    Ok(StyleOutput {
        path,
        fragments: files.len(),
        bytes,
    })
}

/// Build vendor.css from the configured vendor list, in listed order.
/// Returns None when no vendor stylesheets are configured.
pub fn build_vendor_styles(config: &Config) -> Result<Option<StyleOutput>, BuildError> {
    if config.settings.css_vendor.is_empty() {
        return Ok(None);
    }

    let files: Vec<PathBuf> = config
        .settings
        .css_vendor
        .iter()
        .map(|p| config.project_path(p))
        .collect();
    let merged = concatenate(&files)?;

    let path = config.assets_dir().join(VENDOR_STYLESHEET);
    let output = if config.mode.is_dist() {
        compile_css(&merged, &path, &[], BuildMode::Dist)?
    } else {
        merged
    };
    let bytes = write_file(&path, &output)?;

    Ok(Some(StyleOutput {
        path,
        fragments: files.len(),
        bytes,
    }))
}
