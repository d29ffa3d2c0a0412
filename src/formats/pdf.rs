use crate::error::{AppError, Result};
use crate::formats::{PageSource, PreviewRequest, extract_previews};
use image::DynamicImage;
use lopdf::Document;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Resolution pdftoppm treats as scale 1.0.
const BASE_DPI: f32 = 72.0;

/// Rasterises single PDF pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    /// Path or name of the `pdftoppm` executable.
    pub executable: PathBuf,
    /// Zoom factor relative to 72 DPI.
    pub scale: f32,
}

impl PdfRenderer {
    /// Create a renderer.
    pub fn new(executable: impl Into<PathBuf>, scale: f32) -> Self {
        Self {
            executable: executable.into(),
            scale,
        }
    }

    /// Render the zero-based page `index` of `pdf` to a JPEG inside `dir`.
    pub fn render_to_file(&self, pdf: &Path, index: usize, dir: &Path) -> Result<PathBuf> {
        let page = (index + 1).to_string();
        let prefix = dir.join(format!("page-{page}"));
        let dpi = format!("{}", BASE_DPI * self.scale);

        let output = Command::new(&self.executable)
            .args(["-jpeg", "-singlefile", "-r", &dpi, "-f", &page, "-l", &page])
            .arg(pdf)
            .arg(&prefix)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let raster = prefix.with_extension("jpg");
                if raster.exists() {
                    Ok(raster)
                } else {
                    Err(AppError::Render(format!(
                        "no image generated for page {} of {}",
                        page,
                        pdf.display()
                    )))
                }
            }
            Ok(out) => Err(AppError::Render(format!(
                "{} failed on page {} of {}: {}",
                self.executable.display(),
                page,
                pdf.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::Render(format!(
                "{} not found; install poppler-utils or pass --pdftoppm-path",
                self.executable.display()
            ))),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// PDF document rendered page by page through a scratch directory.
pub struct PdfSource {
    path: PathBuf,
    pages: usize,
    renderer: PdfRenderer,
    scratch: TempDir,
}

impl PdfSource {
    /// Load the page tree of `path`.
    pub fn open(path: &Path, renderer: PdfRenderer) -> Result<Self> {
        let doc = Document::load(path)?;
        let pages = doc.get_pages().len();

        Ok(Self {
            path: path.to_path_buf(),
            pages,
            renderer,
            scratch: tempfile::tempdir()?,
        })
    }
}

impl PageSource for PdfSource {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn render_page(&mut self, index: usize) -> Result<DynamicImage> {
        let raster = self
            .renderer
            .render_to_file(&self.path, index, self.scratch.path())?;
        let img = image::open(&raster)?;
        std::fs::remove_file(&raster)?;
        Ok(img)
    }
}

/// Write the cover and sampled previews of a PDF file.
pub fn extract_pdf_pages<R: Rng + ?Sized>(
    path: &Path,
    request: &PreviewRequest<'_>,
    renderer: &PdfRenderer,
    rng: &mut R,
) -> Result<Vec<i64>> {
    let mut source = PdfSource::open(path, renderer.clone())?;
    tracing::debug!(pdf = %path.display(), pages = source.page_count(), "Opened PDF");
    extract_previews(&mut source, request, rng)
}
