use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::BuildError;
use crate::junk::is_junk;
use crate::theme::Section;

/// A source file and its location relative to the directory it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the scanned directory, preserved in the build
    pub relative: PathBuf,
}

/// Scan `<source_dir>/<section>` recursively for the section's files.
/// A missing section directory yields no files.
pub fn scan_section(source_dir: &Path, section: Section) -> Vec<SourceFile> {
    let section_dir = source_dir.join(section.as_str());
    if !section_dir.exists() {
        return Vec::new();
    }

    let mut files: Vec<SourceFile> = WalkDir::new(&section_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_junk(e.path()))
        .filter(|e| section.matches(&e.file_name().to_string_lossy()))
        .map(|e| {
            let path = e.into_path();
            let relative = path
                .strip_prefix(&section_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            SourceFile { path, relative }
        })
        .collect();

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

/// Expand root file glob patterns (relative to `project_root`) into files.
/// Each file lands in the build root under its own name.
pub fn scan_root_files(
    project_root: &Path,
    patterns: &[String],
) -> Result<Vec<SourceFile>, BuildError> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for pattern in patterns {
        let full_pattern = project_root.join(pattern);
        let full_pattern = full_pattern.to_string_lossy();

        let paths = glob::glob(&full_pattern).map_err(|e| {
            BuildError::configuration(
                project_root.join(crate::config::SETTINGS_FILE),
                format!("invalid root pattern \"{pattern}\": {e}"),
            )
        })?;

        let mut matched = false;
        for path in paths.filter_map(|p| p.ok()) {
            if !path.is_file() || is_junk(&path) {
                continue;
            }
            matched = true;
            let Some(name) = path.file_name() else {
                continue;
            };
            let relative = PathBuf::from(name);
            if seen.insert(path.clone()) {
                files.push(SourceFile { path, relative });
            }
        }

        if !matched {
            tracing::warn!("Root pattern \"{}\" matched no files", pattern);
        }
    }

    Ok(files)
}
