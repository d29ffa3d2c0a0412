//! book-previews: cover and preview page extraction for ebook libraries.
//!
//! Walks a directory of book folders, picks one book file per folder and
//! writes a cropped cover (`1.jpg`) plus randomly sampled preview pages
//! (`2.jpg`, `3.jpg`, ...) into a matching output folder.
//!
//! # Formats
//!
//! - PDF, rendered page by page with `pdftoppm`
//! - CBZ and CBR comic archives
//! - EPUB and MOBI, converted to PDF with Calibre's `ebook-convert`
//!
//! Runs are incremental: folders that already hold enough numbered images
//! are skipped, and partially filled folders only get the missing images.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration and CLI.
pub mod config;
/// Whitespace cropping.
pub mod crop;
/// Error types.
pub mod error;
/// Book format handlers.
pub mod formats;
/// Book folder and batch processing.
pub mod library;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config, Settings};
pub use error::{AppError, Result};
pub use library::{BatchSummary, FolderOutcome, Previewer};
