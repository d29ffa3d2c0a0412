use super::Previewer;
use crate::config::BookFormat;
use crate::error::{AppError, Result};
use crate::formats::{
    PreviewRequest, convert_to_pdf, extract_cbr_pages, extract_cbz_pages, extract_pdf_pages,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The book file chosen from a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFile {
    /// Path to the book file.
    pub path: PathBuf,
    /// Detected format.
    pub format: BookFormat,
}

/// What happened to one book folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    /// Enough images already existed; nothing was done.
    Complete {
        /// Numbered images found.
        existing: usize,
    },
    /// No supported book file in the folder.
    NoBookFile,
    /// A book file was selected but its format has no extractor.
    Unsupported {
        /// The selected file.
        book: PathBuf,
    },
    /// `ebook-convert` did not produce a PDF.
    ConversionFailed {
        /// The selected file.
        book: PathBuf,
    },
    /// Extraction ran.
    Extracted {
        /// The selected file.
        book: PathBuf,
        /// Image numbers written, in write order.
        written: Vec<i64>,
    },
}

/// Numbers of the `N.jpg` images in `dir`.
pub fn existing_indices(dir: &Path) -> Result<BTreeSet<i64>> {
    let entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    Ok(image_numbers(entries.iter().map(|e| e.path())))
}

/// Keep the paths named `<integer>.jpg` and return their numbers.
///
/// Any other name is ignored.
pub fn image_numbers<I, P>(paths: I) -> BTreeSet<i64>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .filter_map(|p| image_number(p.as_ref()))
        .collect()
}

fn image_number(path: &Path) -> Option<i64> {
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case("jpg") {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Pick the book file of a folder.
///
/// Formats are tried in [`BookFormat::PRIORITY`] order; within a format the
/// first file by name wins. Extensions match case-insensitively.
pub fn select_book_file(folder: &Path) -> Result<Option<BookFile>> {
    let mut files: Vec<(PathBuf, BookFormat)> = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        // Follows symlinks; dangling links are skipped.
        if !path.is_file() {
            continue;
        }
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(BookFormat::from_extension);
        if let Some(format) = format {
            files.push((path, format));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(BookFormat::PRIORITY.into_iter().find_map(|wanted| {
        files
            .iter()
            .find(|(_, format)| *format == wanted)
            .map(|(path, format)| BookFile {
                path: path.clone(),
                format: *format,
            })
    }))
}

impl Previewer {
    /// Bring one book folder up to the required number of images.
    pub fn process_folder(&mut self, folder: &Path) -> Result<FolderOutcome> {
        tracing::info!(folder = %folder.display(), "Processing folder");

        let name = folder.file_name().ok_or_else(|| {
            AppError::NotFound(format!("folder has no name: {}", folder.display()))
        })?;
        let output_dir = self.settings.book_meta_dir.join(name);
        std::fs::create_dir_all(&output_dir)?;

        let existing = existing_indices(&output_dir)?;
        let required = self.required_images();
        if existing.len() >= required {
            tracing::info!(
                existing = existing.len(),
                required,
                "Enough images already, skipping"
            );
            return Ok(FolderOutcome::Complete {
                existing: existing.len(),
            });
        }

        let Some(book) = select_book_file(folder)? else {
            tracing::warn!(folder = %folder.display(), "No book files found");
            return Ok(FolderOutcome::NoBookFile);
        };
        tracing::info!(book = %book.path.display(), "Selected book");

        let remaining = required - existing.len();
        tracing::info!(remaining, "Extracting additional images");

        let request = PreviewRequest {
            output_dir: &output_dir,
            remaining,
            existing: &existing,
            jpeg_quality: self.settings.jpeg_quality,
        };

        let written = if book.format.needs_conversion() {
            let scratch = tempfile::tempdir()?;
            let temp_pdf = scratch.path().join("temp.pdf");
            if !convert_to_pdf(&book.path, &temp_pdf, &self.settings.calibre_convert_path) {
                return Ok(FolderOutcome::ConversionFailed { book: book.path });
            }
            extract_pdf_pages(&temp_pdf, &request, &self.renderer, &mut self.rng)?
        } else {
            match book.format {
                BookFormat::Pdf => {
                    extract_pdf_pages(&book.path, &request, &self.renderer, &mut self.rng)?
                }
                BookFormat::Cbz => extract_cbz_pages(&book.path, &request, &mut self.rng)?,
                BookFormat::Cbr => extract_cbr_pages(&book.path, &request, &mut self.rng)?,
                BookFormat::Epub | BookFormat::Mobi | BookFormat::Ppt => {
                    tracing::warn!(book = %book.path.display(), "Unsupported file type");
                    return Ok(FolderOutcome::Unsupported { book: book.path });
                }
            }
        };

        tracing::info!(
            book = %book.path.display(),
            written = written.len(),
            "Extraction finished"
        );
        Ok(FolderOutcome::Extracted {
            book: book.path,
            written,
        })
    }
}
