//! Semantic version bumping for theme package files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde_json::Value;

use crate::error::BuildError;

/// Which semver component to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpType {
    Major,
    Minor,
    Patch,
}

impl BumpType {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpType::Major => "major",
            BumpType::Minor => "minor",
            BumpType::Patch => "patch",
        }
    }
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version field rewritten by [`bump_files`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChange {
    pub path: PathBuf,
    pub from: String,
    pub to: String,
}

/// Increment `version` ("MAJOR.MINOR.PATCH", optional `-pre`/`+build` suffix
/// which is dropped). Returns None if the version is not valid semver.
pub fn bump_version(version: &str, bump: BumpType) -> Option<String> {
    let core = version
        .trim()
        .split(['-', '+'])
        .next()
        .unwrap_or_default();

    let mut parts = core.split('.');
    let major: u64 = parse_component(parts.next()?)?;
    let minor: u64 = parse_component(parts.next()?)?;
    let patch: u64 = parse_component(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    let (major, minor, patch) = match bump {
        BumpType::Major => (major.checked_add(1)?, 0, 0),
        BumpType::Minor => (major, minor.checked_add(1)?, 0),
        BumpType::Patch => (major, minor, patch.checked_add(1)?),
    };

    Some(format!("{major}.{minor}.{patch}"))
}

#[inline]
fn parse_component(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Bump the `version` field of one JSON file. Key order is preserved.
pub fn bump_file(path: &Path, bump: BumpType) -> Result<VersionChange, BuildError> {
    let (change, document) = prepare_bump(path, bump)?;
    write_json(path, &document)?;
    Ok(change)
}

/// Read and validate one file, returning the change and the rewritten document
fn prepare_bump(path: &Path, bump: BumpType) -> Result<(VersionChange, Value), BuildError> {
    let mut document = read_json(path)?;

    let Some(current) = document.get("version").and_then(Value::as_str) else {
        return Err(BuildError::configuration(path, "no string \"version\" field"));
    };
    let current = current.to_string();

    let Some(next) = bump_version(&current, bump) else {
        return Err(BuildError::configuration(
            path,
            format!("\"{current}\" is not a semantic version"),
        ));
    };

    document["version"] = Value::String(next.clone());

    let change = VersionChange {
        path: path.to_path_buf(),
        from: current,
        to: next,
    };
    Ok((change, document))
}

/// Bump every listed file (relative to `project_root`). Missing files are
/// skipped with a warning.
///
/// Every file is validated before any is written, so an invalid file leaves
/// all of them untouched.
pub fn bump_files(
    project_root: &Path,
    files: &[PathBuf],
    bump: BumpType,
) -> Result<Vec<VersionChange>, BuildError> {
    let mut pending = Vec::with_capacity(files.len());

    for file in files {
        let path = project_root.join(file);
        if !path.exists() {
            tracing::warn!("Skipping {}: file not found", path.display());
            continue;
        }
        pending.push(prepare_bump(&path, bump)?);
    }

    let mut changes = Vec::with_capacity(pending.len());
    for (change, document) in pending {
        write_json(&change.path, &document)?;
        changes.push(change);
    }

    Ok(changes)
}

/// Format a bump timestamp, e.g. `16.10.2026 14:03:59 (+0200)`
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    time.format("%d.%m.%Y %H:%M:%S (%z)").to_string()
}

/// Write the bump timestamp into the `time` field of a JSON data file
pub fn stamp_version_data<Tz: TimeZone>(path: &Path, time: &DateTime<Tz>) -> Result<(), BuildError>
where
    Tz::Offset: fmt::Display,
{
    let mut document = read_json(path)?;

    let Some(object) = document.as_object_mut() else {
        return Err(BuildError::configuration(path, "expected a JSON object"));
    };
    object.insert("time".to_string(), Value::String(format_timestamp(time)));

    write_json(path, &document)
}

fn read_json(path: &Path) -> Result<Value, BuildError> {
    let content = fs::read_to_string(path).map_err(|e| BuildError::file_system(path, e))?;
    serde_json::from_str(&content).map_err(|e| BuildError::configuration(path, e.to_string()))
}

fn write_json(path: &Path, document: &Value) -> Result<(), BuildError> {
    let mut content = serde_json::to_string_pretty(document)
        .map_err(|e| BuildError::configuration(path, e.to_string()))?;
    content.push('\n');
    fs::write(path, content).map_err(|e| BuildError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
