use crate::config::{BookFormat, Cli, Config, Platform, Settings};
use crate::library::{FolderOutcome, Previewer, existing_indices};
use image::{ImageFormat, Rgb, RgbImage};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A books root and an output root inside one scratch directory.
struct Workspace {
    _tmp: TempDir,
    books: PathBuf,
    meta: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let books = tmp.path().join("books");
        let meta = tmp.path().join("book_metadata");
        std::fs::create_dir_all(&books).unwrap();
        Self {
            _tmp: tmp,
            books,
            meta,
        }
    }

    fn folder(&self, name: &str) -> PathBuf {
        let dir = self.books.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn output(&self, name: &str) -> PathBuf {
        self.meta.join(name)
    }

    fn previewer(&self, num_previews: usize) -> Previewer {
        Previewer::new(Settings {
            num_previews,
            books_dir: self.books.clone(),
            book_meta_dir: self.meta.clone(),
            calibre_convert_path: PathBuf::from("/nonexistent/ebook-convert"),
            seed: Some(42),
            ..Settings::default()
        })
    }
}

/// White page with a dark block, so cropping has something to keep.
fn png_page(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for x in width / 4..width / 2 {
        for y in height / 4..height / 2 {
            img.put_pixel(x, y, Rgb([10, 10, 10]));
        }
    }
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .unwrap();
    data
}

fn write_cbz(path: &Path, pages: usize) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for i in 0..pages {
        zip.start_file(format!("page{:03}.png", i), options).unwrap();
        zip.write_all(&png_page(200 + i as u32, 300)).unwrap();
    }
    zip.finish().unwrap();
}

fn jpg_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn cbz_fresh_folder_gets_cover_and_previews() {
    let ws = Workspace::new();
    write_cbz(&ws.folder("comic").join("comic.cbz"), 10);

    let outcome = ws.previewer(3).process_folder(&ws.folder("comic")).unwrap();

    match outcome {
        FolderOutcome::Extracted { written, .. } => assert_eq!(written, vec![1, 2, 3, 4]),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        jpg_names(&ws.output("comic")),
        ["1.jpg", "2.jpg", "3.jpg", "4.jpg"]
    );

    // Page 0 is 200px wide: 50px block plus 50px padding either side.
    let cover = image::open(ws.output("comic").join("1.jpg")).unwrap();
    assert_eq!((cover.width(), cover.height()), (150, 175));
}

#[test]
fn existing_cover_and_preview_are_kept() {
    let ws = Workspace::new();
    write_cbz(&ws.folder("comic").join("comic.cbz"), 10);
    let out = ws.output("comic");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("1.jpg"), b"cover").unwrap();
    std::fs::write(out.join("2.jpg"), b"preview").unwrap();

    let outcome = ws.previewer(3).process_folder(&ws.folder("comic")).unwrap();

    assert!(matches!(
        outcome,
        FolderOutcome::Extracted { ref written, .. } if *written == vec![3, 4]
    ));
    assert_eq!(jpg_names(&out), ["1.jpg", "2.jpg", "3.jpg", "4.jpg"]);
    assert_eq!(std::fs::read(out.join("1.jpg")).unwrap(), b"cover");
    assert_eq!(std::fs::read(out.join("2.jpg")).unwrap(), b"preview");
}

#[test]
fn complete_folder_is_left_alone() {
    let ws = Workspace::new();
    let folder = ws.folder("done");
    // Not a valid archive: touching it would fail the run.
    std::fs::write(folder.join("book.cbz"), b"garbage").unwrap();
    let out = ws.output("done");
    std::fs::create_dir_all(&out).unwrap();
    for n in 1..=4 {
        std::fs::write(out.join(format!("{n}.jpg")), b"x").unwrap();
    }
    std::fs::write(out.join("notes.jpg"), b"x").unwrap();

    let outcome = ws.previewer(3).process_folder(&folder).unwrap();

    assert_eq!(outcome, FolderOutcome::Complete { existing: 4 });
    assert_eq!(
        jpg_names(&out),
        ["1.jpg", "2.jpg", "3.jpg", "4.jpg", "notes.jpg"]
    );
}

#[test]
fn negative_and_large_stems_count_toward_complete() {
    let ws = Workspace::new();
    let folder = ws.folder("odd");
    std::fs::write(folder.join("book.cbz"), b"garbage").unwrap();
    let out = ws.output("odd");
    std::fs::create_dir_all(&out).unwrap();
    for name in ["-1.jpg", "1.jpg", "2.jpg", "99999999999.jpg"] {
        std::fs::write(out.join(name), b"x").unwrap();
    }

    let outcome = ws.previewer(3).process_folder(&folder).unwrap();

    assert_eq!(outcome, FolderOutcome::Complete { existing: 4 });
}

#[test]
fn single_image_comic_gives_only_cover() {
    let ws = Workspace::new();
    write_cbz(&ws.folder("short").join("short.cbz"), 1);

    let outcome = ws.previewer(3).process_folder(&ws.folder("short")).unwrap();

    assert!(matches!(
        outcome,
        FolderOutcome::Extracted { ref written, .. } if *written == vec![1]
    ));
    assert_eq!(jpg_names(&ws.output("short")), ["1.jpg"]);
}

#[test]
fn rerun_fills_only_the_gap() {
    let ws = Workspace::new();
    write_cbz(&ws.folder("comic").join("comic.cbz"), 10);
    let out = ws.output("comic");

    ws.previewer(2).process_folder(&ws.folder("comic")).unwrap();
    assert_eq!(existing_indices(&out).unwrap(), [1, 2, 3].into());
    let cover = std::fs::read(out.join("1.jpg")).unwrap();

    let outcome = ws.previewer(4).process_folder(&ws.folder("comic")).unwrap();

    assert!(matches!(
        outcome,
        FolderOutcome::Extracted { ref written, .. } if *written == vec![4, 5]
    ));
    assert_eq!(existing_indices(&out).unwrap(), [1, 2, 3, 4, 5].into());
    assert_eq!(std::fs::read(out.join("1.jpg")).unwrap(), cover);
}

#[test]
fn folder_without_book_is_skipped() {
    let ws = Workspace::new();
    let folder = ws.folder("empty");
    std::fs::write(folder.join("readme.txt"), b"no book here").unwrap();

    let outcome = ws.previewer(3).process_folder(&folder).unwrap();

    assert_eq!(outcome, FolderOutcome::NoBookFile);
    assert!(ws.output("empty").is_dir());
    assert!(jpg_names(&ws.output("empty")).is_empty());
}

#[test]
fn ppt_is_selected_but_not_extracted() {
    let ws = Workspace::new();
    let folder = ws.folder("slides");
    std::fs::write(folder.join("deck.ppt"), b"ppt").unwrap();

    let outcome = ws.previewer(3).process_folder(&folder).unwrap();

    assert_eq!(
        outcome,
        FolderOutcome::Unsupported {
            book: folder.join("deck.ppt")
        }
    );
    assert!(jpg_names(&ws.output("slides")).is_empty());
}

#[test]
fn failed_conversion_skips_the_book() {
    let ws = Workspace::new();
    let folder = ws.folder("novel");
    std::fs::write(folder.join("novel.epub"), b"epub").unwrap();

    let outcome = ws.previewer(3).process_folder(&folder).unwrap();

    assert_eq!(
        outcome,
        FolderOutcome::ConversionFailed {
            book: folder.join("novel.epub")
        }
    );
    assert!(jpg_names(&ws.output("novel")).is_empty());
}

#[test]
fn mobi_goes_through_conversion() {
    let ws = Workspace::new();
    let folder = ws.folder("kindle");
    std::fs::write(folder.join("kindle.MOBI"), b"mobi").unwrap();

    let outcome = ws.previewer(3).process_folder(&folder).unwrap();

    assert_eq!(
        outcome,
        FolderOutcome::ConversionFailed {
            book: folder.join("kindle.MOBI")
        }
    );
    assert!(jpg_names(&ws.output("kindle")).is_empty());
}

#[test]
fn corrupt_archive_aborts() {
    let ws = Workspace::new();
    let folder = ws.folder("broken");
    std::fs::write(folder.join("broken.cbz"), b"not a zip").unwrap();

    assert!(ws.previewer(3).process_folder(&folder).is_err());
}

#[test]
fn batch_visits_each_subfolder_once() {
    let ws = Workspace::new();
    write_cbz(&ws.folder("a_comic").join("a.cbz"), 5);
    write_cbz(&ws.folder("b_comic").join("b.cbz"), 1);
    ws.folder("c_empty");
    std::fs::write(ws.books.join("stray.cbz"), b"not a folder").unwrap();
    let nested = ws.folder("c_empty").join("nested");
    std::fs::create_dir_all(&nested).unwrap();
    write_cbz(&nested.join("nested.cbz"), 3);

    let summary = ws.previewer(2).run(&ws.books).unwrap();

    assert_eq!(summary.visited, 3);
    assert_eq!(summary.extracted, 2);
    assert_eq!(summary.no_book, 1);
    assert_eq!(summary.images_written, 3 + 1);
    assert!(!ws.output("nested").exists());
    assert!(!ws.output("stray.cbz").exists());

    let again = ws.previewer(2).run(&ws.books).unwrap();
    assert_eq!(again.visited, 3);
    assert_eq!(again.complete, 1);
    assert_eq!(again.images_written, 0);
}

#[test]
fn batch_requires_books_dir() {
    let ws = Workspace::new();
    assert!(ws.previewer(3).run(&ws.books.join("missing")).is_err());
}

#[test]
fn same_seed_same_pages() {
    let first = Workspace::new();
    let second = Workspace::new();
    for ws in [&first, &second] {
        write_cbz(&ws.folder("comic").join("comic.cbz"), 20);
        ws.previewer(3).process_folder(&ws.folder("comic")).unwrap();
    }

    for n in 1..=4 {
        let name = format!("{n}.jpg");
        let a = image::image_dimensions(first.output("comic").join(&name)).unwrap();
        let b = image::image_dimensions(second.output("comic").join(&name)).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn config_parse_toml() {
    let toml = r#"
[paths]
books_dir = "/srv/books"

[extract]
num_previews = 5
jpeg_quality = 90

[tools]
calibre_convert_path = "/opt/calibre/ebook-convert"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.paths.books_dir, PathBuf::from("/srv/books"));
    assert_eq!(config.paths.book_meta_dir, PathBuf::from("book_metadata"));
    assert_eq!(config.extract.num_previews, 5);
    assert_eq!(config.extract.jpeg_quality, 90);
    assert_eq!(config.extract.render_scale, 2.0);
    assert_eq!(
        config.tools.calibre_convert_path,
        Some(PathBuf::from("/opt/calibre/ebook-convert"))
    );
    assert_eq!(config.tools.pdftoppm_path, PathBuf::from("pdftoppm"));
}

#[test]
fn config_default_file_parses() {
    let config: Config = toml::from_str(&Config::generate_default()).unwrap();
    assert_eq!(config.extract.num_previews, 3);
    assert_eq!(config.paths.books_dir, PathBuf::from("books"));
    assert!(config.tools.calibre_convert_path.is_none());
}

#[test]
fn cli_overrides_config() {
    let mut config = Config::default();
    config.extract.num_previews = 8;
    config.tools.calibre_convert_path = Some(PathBuf::from("/from/config"));

    let cli = Cli {
        num_previews: Some(2),
        book_meta_dir: Some(PathBuf::from("out")),
        seed: Some(1),
        ..Cli::default()
    };
    let settings = Settings::resolve(&cli, config, Platform::Linux).unwrap();

    assert_eq!(settings.num_previews, 2);
    assert_eq!(settings.books_dir, PathBuf::from("books"));
    assert_eq!(settings.book_meta_dir, PathBuf::from("out"));
    assert_eq!(settings.calibre_convert_path, PathBuf::from("/from/config"));
    assert_eq!(settings.seed, Some(1));
}

#[test]
fn settings_default_calibre_by_platform() {
    let settings = Settings::resolve(&Cli::default(), Config::default(), Platform::MacOs).unwrap();
    assert_eq!(
        settings.calibre_convert_path,
        PathBuf::from("/Applications/calibre.app/Contents/MacOS/ebook-convert")
    );
}

#[test]
fn settings_reject_bad_scale_and_clamp_quality() {
    let mut config = Config::default();
    config.extract.render_scale = 0.0;
    assert!(Settings::resolve(&Cli::default(), config, Platform::Linux).is_err());

    let mut config = Config::default();
    config.extract.jpeg_quality = 0;
    let settings = Settings::resolve(&Cli::default(), config, Platform::Linux).unwrap();
    assert_eq!(settings.jpeg_quality, 1);
}

#[test]
fn calibre_path_per_platform() {
    assert_eq!(
        Platform::Linux.default_calibre_path(|_| true),
        PathBuf::from("/usr/bin/ebook-convert")
    );
    assert_eq!(
        Platform::MacOs.default_calibre_path(|_| false),
        PathBuf::from("/Applications/calibre.app/Contents/MacOS/ebook-convert")
    );
}

#[test]
fn calibre_path_windows_candidates() {
    let found = Platform::Windows
        .default_calibre_path(|p| p == Path::new(r"C:\Program Files\Calibre\ebook-convert.exe"));
    assert_eq!(
        found,
        PathBuf::from(r"C:\Program Files\Calibre\ebook-convert.exe")
    );

    let fallback = Platform::Windows.default_calibre_path(|_| false);
    assert_eq!(
        fallback,
        PathBuf::from(r"C:\Program Files\Calibre2\ebook-convert.exe")
    );
}

#[test]
fn book_format_from_extension() {
    assert_eq!(BookFormat::from_extension("pdf"), Some(BookFormat::Pdf));
    assert_eq!(BookFormat::from_extension("EPUB"), Some(BookFormat::Epub));
    assert_eq!(BookFormat::from_extension("Mobi"), Some(BookFormat::Mobi));
    assert_eq!(BookFormat::from_extension("cbz"), Some(BookFormat::Cbz));
    assert_eq!(BookFormat::from_extension("CBR"), Some(BookFormat::Cbr));
    assert_eq!(BookFormat::from_extension("ppt"), Some(BookFormat::Ppt));
    assert_eq!(BookFormat::from_extension("azw3"), None);
    assert!(BookFormat::Epub.needs_conversion());
    assert!(!BookFormat::Cbz.needs_conversion());
}
