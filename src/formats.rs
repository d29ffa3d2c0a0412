mod cbr;
mod cbz;
pub mod convert;
mod pdf;

pub use cbr::{CbrSource, extract_cbr_pages};
pub use cbz::{CbzSource, extract_cbz_pages};
pub use convert::convert_to_pdf;
pub use pdf::{PdfRenderer, PdfSource, extract_pdf_pages};

use crate::crop::crop_white_margins;
use crate::error::{AppError, Result};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use rand::Rng;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default JPEG quality for written previews.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// An ordered sequence of pages that can be rasterised one at a time.
pub trait PageSource {
    /// Number of extractable pages.
    fn page_count(&self) -> usize;

    /// Decode the page at zero-based `index`.
    fn render_page(&mut self, index: usize) -> Result<DynamicImage>;
}

/// What to extract for one book.
#[derive(Debug, Clone)]
pub struct PreviewRequest<'a> {
    /// Directory receiving `{n}.jpg` files.
    pub output_dir: &'a Path,
    /// Images still needed, cover included.
    pub remaining: usize,
    /// Numbers already present in `output_dir`.
    pub existing: &'a BTreeSet<i64>,
    /// JPEG encoder quality (1-100).
    pub jpeg_quality: u8,
}

/// Hands out output numbers, smallest unused first.
#[derive(Debug, Clone)]
pub struct NumberAllocator {
    taken: BTreeSet<i64>,
}

impl NumberAllocator {
    /// Start from the numbers already on disk.
    pub fn new(existing: &BTreeSet<i64>) -> Self {
        Self {
            taken: existing.clone(),
        }
    }

    /// Reserve a specific number.
    pub fn claim(&mut self, n: i64) {
        self.taken.insert(n);
    }

    /// Reserve and return the smallest positive number not yet taken.
    pub fn next_free(&mut self) -> i64 {
        let mut n = 1;
        while self.taken.contains(&n) {
            n += 1;
        }
        self.taken.insert(n);
        n
    }
}

/// Write the cover and a random sample of pages from `source`.
///
/// The cover (page 0) becomes `1.jpg` unless `1` already exists, and counts
/// toward `request.remaining`. Previews are drawn without replacement from
/// pages `1..count` whose index is not in `request.existing`, and saved under
/// the smallest unused numbers in the order they were drawn.
///
/// Returns the numbers written.
pub fn extract_previews<S, R>(
    source: &mut S,
    request: &PreviewRequest<'_>,
    rng: &mut R,
) -> Result<Vec<i64>>
where
    S: PageSource + ?Sized,
    R: Rng + ?Sized,
{
    let count = source.page_count();
    let mut written = Vec::new();
    if count == 0 {
        tracing::debug!(output = %request.output_dir.display(), "No pages to extract");
        return Ok(written);
    }

    let mut numbers = NumberAllocator::new(request.existing);
    let mut remaining = request.remaining;

    if !request.existing.contains(&1) {
        let cover = source.render_page(0)?;
        save_jpeg(
            &crop_white_margins(&cover),
            &request.output_dir.join("1.jpg"),
            request.jpeg_quality,
        )?;
        numbers.claim(1);
        written.push(1);
        remaining = remaining.saturating_sub(1);
    }

    if count <= 1 || remaining == 0 {
        return Ok(written);
    }

    let pool = candidate_pages(count, request.existing);
    if pool.is_empty() {
        return Ok(written);
    }

    let amount = remaining.min(pool.len());
    for drawn in rand::seq::index::sample(rng, pool.len(), amount) {
        let index = pool[drawn];
        let page = source.render_page(index)?;
        let n = numbers.next_free();
        save_jpeg(
            &crop_white_margins(&page),
            &request.output_dir.join(format!("{n}.jpg")),
            request.jpeg_quality,
        )?;
        tracing::debug!(page = index, image = n, "Saved preview");
        written.push(n);
    }

    Ok(written)
}

/// Non-cover page indices whose position is not already an output number.
pub fn candidate_pages(count: usize, existing: &BTreeSet<i64>) -> Vec<usize> {
    (1..count)
        .filter(|&i| i64::try_from(i).map_or(true, |i| !existing.contains(&i)))
        .collect()
}

/// Encode `img` as an RGB JPEG at `path`.
pub fn save_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    let rgb = img.to_rgb8();
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, quality).encode_image(&rgb)?;
    writer.flush()?;
    Ok(())
}

/// Check if a filename is a page image.
fn is_image_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png")
}

/// Page images below an extracted archive root, sorted case-insensitively.
pub(crate) fn list_page_images(root: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<(String, PathBuf)> = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != "__MACOSX"); // Skip macOS metadata

    for entry in walker {
        let entry = entry.map_err(|e| AppError::Io(e.into()))?;
        if !entry.file_type().is_file() || !is_image_file(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let key = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_lowercase();
        images.push((key, entry.into_path()));
    }

    images.sort();
    Ok(images.into_iter().map(|(_, path)| path).collect())
}

/// Pages already unpacked on disk, decoded lazily.
#[derive(Debug, Clone)]
pub(crate) struct ExtractedPages {
    files: Vec<PathBuf>,
}

impl ExtractedPages {
    pub(crate) fn scan(root: &Path) -> Result<Self> {
        Ok(Self {
            files: list_page_images(root)?,
        })
    }
}

impl PageSource for ExtractedPages {
    fn page_count(&self) -> usize {
        self.files.len()
    }

    fn render_page(&mut self, index: usize) -> Result<DynamicImage> {
        Ok(image::open(&self.files[index])?)
    }
}
