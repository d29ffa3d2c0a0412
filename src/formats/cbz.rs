//! CBZ (Comic Book ZIP) format handler.

use crate::error::Result;
use crate::formats::{ExtractedPages, PageSource, PreviewRequest, extract_previews};
use image::DynamicImage;
use rand::Rng;
use std::fs::File;
use std::path::Path;
use tempfile::TempDir;
use zip::ZipArchive;

/// Comic archive unpacked into a scratch directory.
///
/// The directory is removed when the source is dropped.
pub struct CbzSource {
    pages: ExtractedPages,
    _scratch: TempDir,
}

impl CbzSource {
    /// Extract the whole archive and index its page images.
    pub fn open(path: &Path) -> Result<Self> {
        let scratch = tempfile::tempdir()?;
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        archive.extract(scratch.path())?;

        let pages = ExtractedPages::scan(scratch.path())?;
        tracing::debug!(
            archive = %path.display(),
            entries = archive.len(),
            pages = pages.page_count(),
            "Extracted CBZ"
        );

        Ok(Self {
            pages,
            _scratch: scratch,
        })
    }
}

impl PageSource for CbzSource {
    fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    fn render_page(&mut self, index: usize) -> Result<DynamicImage> {
        self.pages.render_page(index)
    }
}

/// Write the cover and sampled previews of a CBZ file.
pub fn extract_cbz_pages<R: Rng + ?Sized>(
    path: &Path,
    request: &PreviewRequest<'_>,
    rng: &mut R,
) -> Result<Vec<i64>> {
    let mut source = CbzSource::open(path)?;
    extract_previews(&mut source, request, rng)
}
