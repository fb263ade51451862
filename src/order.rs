//! Concatenation order resolution for stylesheet fragment trees.
//!
//! A directory is resolved by one of three rules:
//!
//! 1. An ordering manifest (`order.json` by default) lists its direct children
//!    in the order they must be concatenated. Unlisted files are left out.
//! 2. Without a manifest, a directory with no subdirectories is a leaf group
//!    and becomes one glob pattern per fragment extension.
//! 3. Otherwise the direct children are taken sorted by name.
//!
//! Subdirectories are resolved recursively and spliced in at the position
//! their name occupied. Filesystem access goes through [`DirectoryListing`]
//! so the algorithm can run against an in-memory tree.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::junk::is_junk_name;

/// Default name of the per-directory ordering manifest
pub const DEFAULT_MANIFEST_NAME: &str = "order.json";

/// Default fragment extensions, without the leading dot
pub const DEFAULT_FRAGMENT_EXTENSIONS: &[&str] = &["scss", "scss.liquid"];

/// Default recursion limit
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Kind of a directory child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A direct child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl ListedEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Read access to a directory tree
pub trait DirectoryListing {
    /// List the direct children of `dir`, in whatever order the backend yields
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>>;

    /// Read a file as UTF-8
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Stable identity of a directory. Two paths reaching the same directory
    /// through links must return the same identity.
    fn identity(&self, dir: &Path) -> io::Result<PathBuf>;
}

/// [`DirectoryListing`] backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsListing;

impl DirectoryListing for FsListing {
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().into_string().map_err(|name| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name {name:?} is not valid UTF-8"),
                )
            })?;
            // is_dir() follows symlinks so linked directories are recursed into
            let kind = if entry.path().is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(ListedEntry { name, kind });
        }
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn identity(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(dir)
    }
}

/// One element of a resolved concatenation order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderEntry {
    /// A single fragment file
    File(PathBuf),
    /// Every fragment in `dir` ending in `.{extension}`
    Glob { dir: PathBuf, extension: String },
}

impl OrderEntry {
    /// Glob pattern string for this entry (`dir/*.ext` or the file path)
    pub fn pattern(&self) -> String {
        match self {
            OrderEntry::File(path) => path.display().to_string(),
            OrderEntry::Glob { dir, extension } => {
                dir.join(format!("*.{extension}")).display().to_string()
            }
        }
    }
}

impl fmt::Display for OrderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern())
    }
}

/// Settings for order resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// File name of the per-directory ordering manifest
    pub manifest_name: String,
    /// Fragment extensions used for leaf-group globs
    pub extensions: Vec<String>,
    /// Maximum directory nesting below the root
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            extensions: DEFAULT_FRAGMENT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Resolve the concatenation order of the tree rooted at `root`.
///
/// Paths in the result are `root` joined with child names, so pass an
/// absolute root to get absolute entries.
pub fn resolve_order(
    root: &Path,
    listing: &dyn DirectoryListing,
    options: &ResolveOptions,
) -> Result<Vec<OrderEntry>, BuildError> {
    let mut resolver = Resolver {
        listing,
        options,
        ancestors: Vec::with_capacity(8),
        order: Vec::new(),
    };
    resolver.resolve_dir(root)?;
    Ok(resolver.order)
}

/// Resolve the order of an on-disk tree. The root is canonicalized first.
pub fn resolve_order_fs(
    root: &Path,
    options: &ResolveOptions,
) -> Result<Vec<OrderEntry>, BuildError> {
    let root = fs::canonicalize(root).map_err(|e| BuildError::file_system(root, e))?;
    resolve_order(&root, &FsListing, options)
}

/// Map a listing failure of `dir`. Undecodable entry names are a
/// configuration problem of the tree, not an I/O failure.
pub(crate) fn list_error(dir: &Path, e: io::Error) -> BuildError {
    if e.kind() == io::ErrorKind::InvalidData {
        BuildError::configuration(dir, e.to_string())
    } else {
        BuildError::file_system(dir, e)
    }
}

struct Resolver<'a> {
    listing: &'a dyn DirectoryListing,
    options: &'a ResolveOptions,
    /// Identities of the directories currently being resolved
    ancestors: Vec<PathBuf>,
    order: Vec<OrderEntry>,
}

impl Resolver<'_> {
    fn resolve_dir(&mut self, dir: &Path) -> Result<(), BuildError> {
        if self.ancestors.len() > self.options.max_depth {
            return Err(BuildError::structural(
                dir,
                format!("nesting exceeds {} levels", self.options.max_depth),
            ));
        }

        let identity = self
            .listing
            .identity(dir)
            .map_err(|e| BuildError::file_system(dir, e))?;
        if self.ancestors.contains(&identity) {
            return Err(BuildError::structural(
                dir,
                format!("directory cycle back to {}", identity.display()),
            ));
        }

        let children: Vec<ListedEntry> = self
            .listing
            .list(dir)
            .map_err(|e| list_error(dir, e))?
            .into_iter()
            .filter(|entry| !is_junk_name(&entry.name))
            .collect();

        let has_manifest = children
            .iter()
            .any(|entry| !entry.is_dir() && entry.name == self.options.manifest_name);

        self.ancestors.push(identity);
        let result = if has_manifest {
            self.resolve_manifest_dir(dir, &children)
        } else if children.iter().any(ListedEntry::is_dir) {
            self.resolve_sorted_dir(dir, children)
        } else {
            self.push_leaf_group(dir);
            Ok(())
        };
        self.ancestors.pop();

        result
    }

    fn resolve_manifest_dir(
        &mut self,
        dir: &Path,
        children: &[ListedEntry],
    ) -> Result<(), BuildError> {
        let manifest_path = dir.join(&self.options.manifest_name);
        let names = read_manifest(self.listing, &manifest_path, &self.options.manifest_name)?;

        for name in &names {
            let Some(child) = children.iter().find(|entry| entry.name == *name) else {
                return Err(BuildError::configuration(
                    &manifest_path,
                    format!("lists \"{name}\" which does not exist"),
                ));
            };
            self.push_child(dir, child)?;
        }

        for entry in children {
            if !entry.is_dir()
                && entry.name != self.options.manifest_name
                && !names.contains(&entry.name)
            {
                tracing::debug!(
                    "{} is not listed in {} and is left out",
                    dir.join(&entry.name).display(),
                    manifest_path.display()
                );
            }
        }

        Ok(())
    }

    fn resolve_sorted_dir(
        &mut self,
        dir: &Path,
        mut children: Vec<ListedEntry>,
    ) -> Result<(), BuildError> {
        children.sort_by(|a, b| a.name.cmp(&b.name));
        for child in &children {
            if !child.is_dir() && !self.is_fragment(&child.name) {
                tracing::debug!(
                    "{} is not a style fragment and is left out",
                    dir.join(&child.name).display()
                );
                continue;
            }
            self.push_child(dir, child)?;
        }
        Ok(())
    }

    /// Whether `name` carries one of the configured fragment extensions
    fn is_fragment(&self, name: &str) -> bool {
        self.options.extensions.iter().any(|ext| {
            name.strip_suffix(ext.as_str())
                .and_then(|stem| stem.strip_suffix('.'))
                .is_some_and(|stem| !stem.is_empty())
        })
    }

    fn push_child(&mut self, dir: &Path, child: &ListedEntry) -> Result<(), BuildError> {
        let path = dir.join(&child.name);
        if child.is_dir() {
            self.resolve_dir(&path)
        } else {
            self.order.push(OrderEntry::File(path));
            Ok(())
        }
    }

    fn push_leaf_group(&mut self, dir: &Path) {
        for extension in &self.options.extensions {
            self.order.push(OrderEntry::Glob {
                dir: dir.to_path_buf(),
                extension: extension.clone(),
            });
        }
    }
}

/// Parse and validate an ordering manifest
fn read_manifest(
    listing: &dyn DirectoryListing,
    path: &Path,
    manifest_name: &str,
) -> Result<Vec<String>, BuildError> {
    let content = listing
        .read_to_string(path)
        .map_err(|e| BuildError::file_system(path, e))?;

    let names: Vec<String> = serde_json::from_str(&content).map_err(|e| {
        BuildError::configuration(path, format!("expected a JSON array of names: {e}"))
    })?;

    let mut seen = HashSet::with_capacity(names.len());
    for name in &names {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(BuildError::configuration(
                path,
                format!("\"{name}\" is not a plain child name"),
            ));
        }
        if name == manifest_name {
            return Err(BuildError::configuration(path, "manifest lists itself"));
        }
        if !seen.insert(name.as_str()) {
            return Err(BuildError::configuration(
                path,
                format!("\"{name}\" is listed more than once"),
            ));
        }
    }

    Ok(names)
}
