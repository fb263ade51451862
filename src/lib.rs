//! # Shopify Theme Build
//!
//! Build pipeline for Shopify storefront themes.
//!
//! Theme sources live in a `src/` tree and are assembled into an uploadable
//! `dist/` tree. The stylesheet is merged from a directory of fragments whose
//! concatenation order is declared per directory with ordering manifests.
//!
//! ## Features
//!
//! - Manifest driven stylesheet ordering with cycle and depth checks
//! - Parallel build jobs using Rayon
//! - Optional SCSS compilation and compression with grass
//! - Incremental rebuilds on file change
//! - Semantic version bumping of package files
//!
//! ## Usage
//!
//! ```ignore
//! use shopify_theme_build::order::{resolve_order_fs, ResolveOptions};
//!
//! let order = resolve_order_fs(&styles_dir, &ResolveOptions::default())?;
//! ```

/// Build jobs and build directory cleanup
pub mod builder;

/// CLI configuration and project settings
pub mod config;

/// File copying and writing
pub mod copier;

/// Error types for build operations
pub mod error;

/// Operating system and editor junk files
pub mod junk;

/// Stylesheet concatenation order resolution
pub mod order;

/// Theme source scanning
pub mod scanner;

/// Stylesheet assembly
pub mod stylesheet;

/// Theme sections and build modes
pub mod theme;

/// Version bumping
pub mod version;

/// Rebuild on change
pub mod watcher;
