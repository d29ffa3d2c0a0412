use crate::error::{AppError, Result};
use crate::formats::DEFAULT_JPEG_QUALITY;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extract cover and preview images from books (PDF, EPUB, MOBI, CBZ, CBR).
///
/// Each folder under the books directory is expected to hold one book file.
/// Images are written as `1.jpg` (cover), `2.jpg`, ... into a folder of the
/// same name under the output directory. EPUB and MOBI are converted to PDF
/// with Calibre first.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "book-previews")]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "BOOK_PREVIEWS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Number of preview images to extract, excluding the cover [default: 3].
    #[arg(long)]
    pub num_previews: Option<usize>,

    /// Directory containing book folders [default: books].
    #[arg(long)]
    pub books_dir: Option<PathBuf>,

    /// Output directory for preview images [default: book_metadata].
    #[arg(long)]
    pub book_meta_dir: Option<PathBuf>,

    /// Path to Calibre's ebook-convert executable [default: platform dependent].
    #[arg(long)]
    pub calibre_convert_path: Option<PathBuf>,

    /// Path to poppler's pdftoppm executable [default: pdftoppm].
    #[arg(long)]
    pub pdftoppm_path: Option<PathBuf>,

    /// Seed for page sampling (random if omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write a default config file to the current directory.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Extraction settings.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// External executables.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory containing one folder per book.
    #[serde(default = "default_books_dir")]
    pub books_dir: PathBuf,

    /// Directory receiving one image folder per book.
    #[serde(default = "default_book_meta_dir")]
    pub book_meta_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            books_dir: default_books_dir(),
            book_meta_dir: default_book_meta_dir(),
        }
    }
}

fn default_books_dir() -> PathBuf {
    PathBuf::from("books")
}

fn default_book_meta_dir() -> PathBuf {
    PathBuf::from("book_metadata")
}

/// Extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Previews per book, not counting the cover.
    #[serde(default = "default_num_previews")]
    pub num_previews: usize,

    /// JPEG quality of written images (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// PDF zoom factor relative to 72 DPI.
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            num_previews: default_num_previews(),
            jpeg_quality: default_jpeg_quality(),
            render_scale: default_render_scale(),
        }
    }
}

fn default_num_previews() -> usize {
    3
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_render_scale() -> f32 {
    2.0
}

/// External executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Calibre's `ebook-convert`; resolved per platform when unset.
    #[serde(default)]
    pub calibre_convert_path: Option<PathBuf>,

    /// Poppler's `pdftoppm`.
    #[serde(default = "default_pdftoppm_path")]
    pub pdftoppm_path: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            calibre_convert_path: None,
            pdftoppm_path: default_pdftoppm_path(),
        }
    }
}

fn default_pdftoppm_path() -> PathBuf {
    PathBuf::from("pdftoppm")
}

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "book-previews.toml";

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("book-previews").join("config.toml"));
        }

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# book-previews configuration

[paths]
books_dir = "books"
book_meta_dir = "book_metadata"

[extract]
# Previews per book, not counting the cover
num_previews = 3
jpeg_quality = 75
# PDF pages are rendered at 72 DPI times this factor
render_scale = 2.0

[tools]
# Defaults to the usual Calibre install location for this OS
# calibre_convert_path = "/usr/bin/ebook-convert"
pdftoppm_path = "pdftoppm"
"#
        .to_string()
    }
}

/// Operating system family, for locating Calibre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
    /// Linux and everything else.
    Linux,
}

const MACOS_CALIBRE: &str = "/Applications/calibre.app/Contents/MacOS/ebook-convert";
const LINUX_CALIBRE: &str = "/usr/bin/ebook-convert";
const WINDOWS_CALIBRE: [&str; 4] = [
    r"C:\Program Files\Calibre2\ebook-convert.exe",
    r"C:\Program Files (x86)\Calibre2\ebook-convert.exe",
    r"C:\Program Files\Calibre\ebook-convert.exe",
    r"C:\Program Files (x86)\Calibre\ebook-convert.exe",
];

impl Platform {
    /// Platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Usual location of `ebook-convert`, shown in hints.
    pub fn common_calibre_path(&self) -> &'static str {
        match self {
            Platform::MacOs => MACOS_CALIBRE,
            Platform::Windows => WINDOWS_CALIBRE[0],
            Platform::Linux => LINUX_CALIBRE,
        }
    }

    /// Resolve the default `ebook-convert` path.
    ///
    /// On Windows the first candidate for which `exists` returns true wins,
    /// falling back to the Calibre2 location.
    pub fn default_calibre_path(&self, exists: impl Fn(&Path) -> bool) -> PathBuf {
        match self {
            Platform::MacOs => PathBuf::from(MACOS_CALIBRE),
            Platform::Windows => WINDOWS_CALIBRE
                .iter()
                .map(PathBuf::from)
                .find(|p| exists(p.as_path()))
                .unwrap_or_else(|| PathBuf::from(WINDOWS_CALIBRE[0])),
            Platform::Linux => PathBuf::from(LINUX_CALIBRE),
        }
    }
}

/// Supported book formats, in file selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// PDF format (Portable Document Format).
    Pdf,
    /// MOBI format (Mobipocket eBook).
    Mobi,
    /// EPUB format (Electronic Publication).
    Epub,
    /// CBZ format (Comic Book ZIP archive).
    Cbz,
    /// CBR format (Comic Book RAR archive).
    Cbr,
    /// PowerPoint; recognised but never extracted.
    Ppt,
}

impl BookFormat {
    /// All formats, highest selection priority first.
    pub const PRIORITY: [BookFormat; 6] = [
        BookFormat::Pdf,
        BookFormat::Mobi,
        BookFormat::Epub,
        BookFormat::Cbz,
        BookFormat::Cbr,
        BookFormat::Ppt,
    ];

    /// Lowercase file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            BookFormat::Pdf => "pdf",
            BookFormat::Mobi => "mobi",
            BookFormat::Epub => "epub",
            BookFormat::Cbz => "cbz",
            BookFormat::Cbr => "cbr",
            BookFormat::Ppt => "ppt",
        }
    }

    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        Self::PRIORITY.into_iter().find(|f| f.extension() == ext)
    }

    /// Check if this format goes through `ebook-convert` first.
    pub fn needs_conversion(&self) -> bool {
        matches!(self, BookFormat::Epub | BookFormat::Mobi)
    }
}

/// Effective settings after merging CLI flags over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Previews per book, not counting the cover.
    pub num_previews: usize,
    /// Directory containing one folder per book.
    pub books_dir: PathBuf,
    /// Directory receiving one image folder per book.
    pub book_meta_dir: PathBuf,
    /// Calibre's `ebook-convert`.
    pub calibre_convert_path: PathBuf,
    /// Poppler's `pdftoppm`.
    pub pdftoppm_path: PathBuf,
    /// PDF zoom factor relative to 72 DPI.
    pub render_scale: f32,
    /// JPEG quality of written images.
    pub jpeg_quality: u8,
    /// Sampling seed, random when unset.
    pub seed: Option<u64>,
}

impl Settings {
    /// Merge `cli` over `config`, resolving the Calibre path for `platform`.
    pub fn resolve(cli: &Cli, config: Config, platform: Platform) -> Result<Self> {
        let scale = config.extract.render_scale;
        if scale.is_nan() || scale <= 0.0 {
            return Err(AppError::Config(format!(
                "render_scale must be positive, got {}",
                scale
            )));
        }

        let calibre_convert_path = cli
            .calibre_convert_path
            .clone()
            .or(config.tools.calibre_convert_path)
            .unwrap_or_else(|| platform.default_calibre_path(|p| p.exists()));

        Ok(Self {
            num_previews: cli.num_previews.unwrap_or(config.extract.num_previews),
            books_dir: cli.books_dir.clone().unwrap_or(config.paths.books_dir),
            book_meta_dir: cli
                .book_meta_dir
                .clone()
                .unwrap_or(config.paths.book_meta_dir),
            calibre_convert_path,
            pdftoppm_path: cli
                .pdftoppm_path
                .clone()
                .unwrap_or(config.tools.pdftoppm_path),
            render_scale: scale,
            jpeg_quality: config.extract.jpeg_quality.clamp(1, 100),
            seed: cli.seed,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            num_previews: config.extract.num_previews,
            books_dir: config.paths.books_dir,
            book_meta_dir: config.paths.book_meta_dir,
            calibre_convert_path: Platform::current().default_calibre_path(|p| p.exists()),
            pdftoppm_path: config.tools.pdftoppm_path,
            render_scale: config.extract.render_scale,
            jpeg_quality: config.extract.jpeg_quality,
            seed: None,
        }
    }
}
