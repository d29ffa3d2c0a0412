//! book-previews entry point.

use book_previews::{
    Previewer,
    config::{CONFIG_FILE_NAME, Cli, Command, Config, Platform, Settings},
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "book_previews=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        tracing::debug!(config = %path.display(), "Loading config");
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force),
        None => {
            let settings = Settings::resolve(&cli, config, Platform::current())?;
            cmd_run(settings)
        }
    }
}

/// Write the default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    Ok(())
}

/// Extract previews for every book folder.
fn cmd_run(settings: Settings) -> anyhow::Result<()> {
    if !settings.calibre_convert_path.exists() {
        tracing::warn!(
            path = %settings.calibre_convert_path.display(),
            "Calibre path not found; EPUB and MOBI files will not be processed"
        );
        println!(
            "Install Calibre or pass --calibre-convert-path. Common location: {}",
            Platform::current().common_calibre_path()
        );
    }

    if !settings.books_dir.exists() {
        anyhow::bail!(
            "Directory {} does not exist. Create it or pass --books-dir.",
            settings.books_dir.display()
        );
    }

    let books_dir = settings.books_dir.clone();
    let mut previewer = Previewer::new(settings);
    let settings = previewer.settings();

    println!("Processing books from: {}", books_dir.display());
    println!("Output directory: {}", settings.book_meta_dir.display());
    println!("Calibre path: {}", settings.calibre_convert_path.display());
    println!("Number of previews per book: {}", settings.num_previews);
    println!("Sampling seed: {}", previewer.seed());
    println!("{}", "-".repeat(50));

    let summary = previewer.run(&books_dir)?;

    println!("{}", "-".repeat(50));
    println!(
        "Processing complete! Processed {} book folders.",
        summary.visited
    );
    println!(
        "  extracted: {} ({} images), already complete: {}",
        summary.extracted, summary.images_written, summary.complete
    );
    if summary.no_book + summary.unsupported + summary.conversion_failed > 0 {
        println!(
            "  no book file: {}, unsupported: {}, conversion failed: {}",
            summary.no_book, summary.unsupported, summary.conversion_failed
        );
    }

    Ok(())
}
