use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input path not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// RAR archive error.
    #[error("RAR error: {0}")]
    Rar(String),

    /// PDF parsing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Page rasterisation error.
    #[error("Render error: {0}")]
    Render(String),

    /// Image processing error.
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
