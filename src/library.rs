//! Book folder processing.

mod batch;
mod folder;

pub use batch::BatchSummary;
pub use folder::{BookFile, FolderOutcome, existing_indices, image_numbers, select_book_file};

use crate::config::Settings;
use crate::formats::PdfRenderer;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Runs preview extraction over book folders with one set of settings.
///
/// Holds the sampling RNG, so a fixed seed reproduces a whole batch.
pub struct Previewer {
    settings: Settings,
    renderer: PdfRenderer,
    rng: StdRng,
    seed: u64,
}

impl Previewer {
    /// Create a previewer, drawing a random seed if none is configured.
    pub fn new(settings: Settings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let renderer = PdfRenderer::new(settings.pdftoppm_path.clone(), settings.render_scale);

        Self {
            settings,
            renderer,
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed used for page sampling.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Effective settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Images wanted per book: the cover plus the previews.
    pub fn required_images(&self) -> usize {
        self.settings.num_previews + 1
    }
}
