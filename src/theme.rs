//! Theme section and build mode types for Shopify theme builds.
//!
//! A Shopify theme is a fixed set of top-level directories. Sections are the
//! ones copied verbatim from the source tree; `assets/` is produced by the
//! stylesheet builders instead.

use std::fmt;

/// A theme directory whose files are copied unchanged into the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Snippets,
    Templates,
    Layout,
    Config,
    Locales,
}

impl Section {
    /// Every section, in build order
    pub const ALL: [Section; 5] = [
        Section::Snippets,
        Section::Templates,
        Section::Layout,
        Section::Config,
        Section::Locales,
    ];

    /// Directory name, identical in the source and build trees
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Snippets => "snippets",
            Section::Templates => "templates",
            Section::Layout => "layout",
            Section::Config => "config",
            Section::Locales => "locales",
        }
    }

    #[inline]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "snippets" => Some(Section::Snippets),
            "templates" => Some(Section::Templates),
            "layout" => Some(Section::Layout),
            "config" => Some(Section::Config),
            "locales" => Some(Section::Locales),
            _ => None,
        }
    }

    /// File suffix of this section's files
    #[inline]
    pub fn suffix(&self) -> &'static str {
        match self {
            Section::Snippets | Section::Templates | Section::Layout => ".liquid",
            Section::Config | Section::Locales => ".json",
        }
    }

    /// Whether a file name belongs to this section
    #[inline]
    pub fn matches(&self, file_name: &str) -> bool {
        let suffix = self.suffix();
        file_name.len() > suffix.len() && file_name.ends_with(suffix)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Development builds keep output readable, dist builds compress it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Development,
    Dist,
}

impl BuildMode {
    #[inline]
    pub fn from_dist_flag(dist: bool) -> Self {
        if dist {
            BuildMode::Dist
        } else {
            BuildMode::Development
        }
    }

    #[inline]
    pub fn is_dist(&self) -> bool {
        *self == BuildMode::Dist
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Dist => "dist",
        }
    }
}
