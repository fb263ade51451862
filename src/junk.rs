//! Detection of OS and editor generated files that are never theme content.

use std::ffi::OsStr;
use std::path::Path;

/// Exact file names produced by operating systems and tools
const JUNK_NAMES: &[&str] = &[
    ".DS_Store",        // macOS Finder metadata
    ".AppleDouble",     // macOS resource forks on foreign volumes
    ".LSOverride",      // macOS Launch Services
    ".Spotlight-V100",  // macOS Spotlight index
    ".Trashes",         // macOS volume trash
    "__MACOSX",         // macOS zip artifacts
    "Icon\r",           // macOS custom folder icon
    "Thumbs.db",        // Windows thumbnail cache
    "ehthumbs.db",      // Windows Media Center thumbnails
    "Desktop.ini",      // Windows folder settings
    "desktop.ini",      // Windows folder settings (lowercase variant)
    "npm-debug.log",    // npm crash log
];

/// Returns true if a file name is junk
#[inline]
pub fn is_junk_name(name: &str) -> bool {
    if JUNK_NAMES.contains(&name) {
        return true;
    }

    // AppleDouble companions: ._name
    if name.starts_with("._") {
        return true;
    }

    // Vim swap files: .name.swp
    if name.starts_with('.') && name.ends_with(".swp") {
        return true;
    }

    // Editor backups and Synology metadata
    name.ends_with('~') || name.ends_with("@eaDir")
}

/// Returns true if the last component of `path` is junk
#[inline]
pub fn is_junk(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(is_junk_name)
}
