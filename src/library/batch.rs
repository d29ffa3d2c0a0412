use super::{FolderOutcome, Previewer};
use crate::error::{AppError, Result};
use std::path::Path;
use walkdir::WalkDir;

/// Counts gathered over one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Book folders visited, whatever their outcome.
    pub visited: usize,
    /// Folders that already had enough images.
    pub complete: usize,
    /// Folders where extraction ran.
    pub extracted: usize,
    /// Folders without a book file.
    pub no_book: usize,
    /// Folders whose book format has no extractor.
    pub unsupported: usize,
    /// Folders whose conversion to PDF failed.
    pub conversion_failed: usize,
    /// Images written across all folders.
    pub images_written: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &FolderOutcome) {
        self.visited += 1;
        match outcome {
            FolderOutcome::Complete { .. } => self.complete += 1,
            FolderOutcome::NoBookFile => self.no_book += 1,
            FolderOutcome::Unsupported { .. } => self.unsupported += 1,
            FolderOutcome::ConversionFailed { .. } => self.conversion_failed += 1,
            FolderOutcome::Extracted { written, .. } => {
                self.extracted += 1;
                self.images_written += written.len();
            }
        }
    }
}

impl Previewer {
    /// Process every immediate subdirectory of `books_dir`, one at a time.
    ///
    /// Per-folder problems (no book, unsupported format, failed conversion)
    /// are counted; decode and I/O errors abort the run.
    pub fn run(&mut self, books_dir: &Path) -> Result<BatchSummary> {
        if !books_dir.is_dir() {
            return Err(AppError::NotFound(format!(
                "books directory {}",
                books_dir.display()
            )));
        }

        let mut summary = BatchSummary::default();
        for entry in WalkDir::new(books_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| AppError::Io(e.into()))?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let outcome = self.process_folder(entry.path())?;
            summary.record(&outcome);
        }

        tracing::info!(
            visited = summary.visited,
            extracted = summary.extracted,
            images = summary.images_written,
            "Processing complete"
        );
        Ok(summary)
    }
}
