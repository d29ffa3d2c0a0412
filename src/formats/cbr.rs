//! CBR (Comic Book RAR) format handler.

use crate::error::{AppError, Result};
use crate::formats::{ExtractedPages, PageSource, PreviewRequest, extract_previews};
use image::DynamicImage;
use rand::Rng;
use std::path::Path;
use tempfile::TempDir;
use unrar::Archive;

/// RAR comic unpacked into a scratch directory.
///
/// RAR archives are decompressed in full before any page is read.
pub struct CbrSource {
    pages: ExtractedPages,
    _scratch: TempDir,
}

impl CbrSource {
    /// Extract every file entry and index the page images.
    pub fn open(path: &Path) -> Result<Self> {
        let scratch = tempfile::tempdir()?;

        let mut archive = Archive::new(path)
            .open_for_processing()
            .map_err(|e| AppError::Rar(format!("{}: {}", path.display(), e)))?;
        let mut entries = 0usize;
        while let Some(header) = archive
            .read_header()
            .map_err(|e| AppError::Rar(e.to_string()))?
        {
            archive = if header.entry().is_file() {
                entries += 1;
                header
                    .extract_with_base(scratch.path())
                    .map_err(|e| AppError::Rar(e.to_string()))?
            } else {
                header.skip().map_err(|e| AppError::Rar(e.to_string()))?
            };
        }

        let pages = ExtractedPages::scan(scratch.path())?;
        tracing::debug!(
            archive = %path.display(),
            entries,
            pages = pages.page_count(),
            "Extracted CBR"
        );

        Ok(Self {
            pages,
            _scratch: scratch,
        })
    }
}

impl PageSource for CbrSource {
    fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    fn render_page(&mut self, index: usize) -> Result<DynamicImage> {
        self.pages.render_page(index)
    }
}

/// Write the cover and sampled previews of a CBR file.
pub fn extract_cbr_pages<R: Rng + ?Sized>(
    path: &Path,
    request: &PreviewRequest<'_>,
    rng: &mut R,
) -> Result<Vec<i64>> {
    let mut source = CbrSource::open(path)?;
    extract_previews(&mut source, request, rng)
}
