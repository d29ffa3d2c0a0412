//! EPUB/MOBI to PDF conversion through Calibre's `ebook-convert`.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

/// Longest stderr excerpt carried into the failure log.
const STDERR_TAIL: usize = 500;

/// Convert `input` to a PDF at `output` with `converter`.
///
/// Returns `false` when the converter is missing, cannot be started, or
/// exits with a non-zero status. A failed run may leave a partial file at
/// `output`.
pub fn convert_to_pdf(input: &Path, output: &Path, converter: &Path) -> bool {
    tracing::info!(book = %input.display(), "Converting to PDF");

    match Command::new(converter).arg(input).arg(output).output() {
        Ok(out) if out.status.success() => true,
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let stderr = stderr.trim();
            let start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL - 1)
                .map_or(0, |(i, _)| i);
            let tail = &stderr[start..];
            tracing::error!(
                book = %input.display(),
                status = %out.status,
                stderr = %tail,
                "Error converting to PDF"
            );
            false
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::error!(
                converter = %converter.display(),
                "ebook-convert not found; install Calibre or pass --calibre-convert-path"
            );
            false
        }
        Err(e) => {
            tracing::error!(
                converter = %converter.display(),
                error = %e,
                "Failed to start ebook-convert"
            );
            false
        }
    }
}
