//! fbshelf - e-book library metadata tool

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use fbshelf::util::human_readable_size;
use fbshelf::{Book, Library, LibraryConfig};

#[derive(Parser)]
#[command(name = "fbshelf")]
#[command(version, about = "E-book library metadata tool", long_about = None)]
#[command(after_help = "EXAMPLES:
    fbshelf info book.fb2                      Show book metadata
    fbshelf scan /srv/books --json             List every book as JSON lines
    fbshelf resolve 'zip::/srv/a.zip#b.fb2'    Show metadata for a virtual path
    fbshelf extract 'inpx::/srv/lib.inpx#x.inp*1.fb2' -o 1.fb2")]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show metadata for a book file
    Info {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// List all books found in directories, archives and catalogs
    Scan {
        /// Sources to scan, added to those from --config
        #[arg(value_name = "PATHS")]
        paths: Vec<PathBuf>,

        /// Library configuration file (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print one JSON object per book
        #[arg(long)]
        json: bool,
    },
    /// Show metadata for a virtual path
    Resolve {
        #[arg(value_name = "VIRTUAL_PATH")]
        path: String,
    },
    /// Write the raw bytes of a book
    Extract {
        #[arg(value_name = "PATH")]
        path: String,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print the uncompressed size of a book
    Size {
        #[arg(value_name = "PATH")]
        path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let library = Library::default();
    let result = match cli.command {
        Command::Info { path } | Command::Resolve { path } => show_info(&library, &path),
        Command::Scan {
            paths,
            config,
            json,
        } => scan(&library, paths, config, json),
        Command::Extract { path, output } => extract(&library, &path, output),
        Command::Size { path } => show_size(&library, &path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn show_info(library: &Library, path: &str) -> Result<(), String> {
    let book = library
        .obtain_book(path)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unsupported format: {path}"))?;

    println!("Path: {}", book.path);
    println!("Title: {}", book.title);
    if !book.authors.is_empty() {
        println!("Authors: {}", book.author_names().join("; "));
    }
    if !book.genres.is_empty() {
        println!("Genres: {}", book.genres.join(", "));
    }
    if let Some(ref sequence) = book.sequence {
        match book.sequence_number {
            Some(n) => println!("Sequence: {sequence} #{n}"),
            None => println!("Sequence: {sequence}"),
        }
    }
    if let Some(ref annotation) = book.annotation {
        let annotation = annotation.trim();
        match annotation.char_indices().nth(200) {
            Some((end, _)) => println!("Annotation: {}...", &annotation[..end]),
            None => println!("Annotation: {annotation}"),
        }
    }
    if let Some(ref cover) = book.cover {
        println!(
            "Cover: {} ({})",
            cover.content_type,
            human_readable_size(cover.data.len() as u64)
        );
    }

    Ok(())
}

fn scan(
    library: &Library,
    paths: Vec<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), String> {
    let mut config = match config {
        Some(path) => LibraryConfig::load(&path).map_err(|e| e.to_string())?,
        None => LibraryConfig::default(),
    };
    config.sources.extend(paths);
    if config.sources.is_empty() {
        return Err("no sources to scan".to_string());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut count = 0usize;
    for book in library.scan(&config.sources) {
        count += 1;
        let line = if json {
            book_json(&book).to_string()
        } else {
            format!("{}\t{}\t{}", book.path, book.author_names().join("; "), book.title)
        };
        writeln!(out, "{line}").map_err(|e| e.to_string())?;
    }
    tracing::info!(library = %config.title, books = count, "scan complete");

    Ok(())
}

fn book_json(book: &Book) -> serde_json::Value {
    json!({
        "path": book.path,
        "title": book.title,
        "authors": book.author_names(),
        "genres": book.genres,
        "annotation": book.annotation,
        "sequence": book.sequence,
        "sequence_number": book.sequence_number,
        "cover": book.cover.as_ref().map(|c| json!({
            "content_type": c.content_type,
            "size": c.data.len(),
        })),
    })
}

fn extract(library: &Library, path: &str, output: Option<PathBuf>) -> Result<(), String> {
    let mut data = library.book_data(path).map_err(|e| e.to_string())?;
    let written = match output {
        Some(file) => {
            let mut file = File::create(&file).map_err(|e| format!("{}: {e}", file.display()))?;
            io::copy(&mut data, &mut file)
        }
        None => io::copy(&mut data, &mut io::stdout().lock()),
    }
    .map_err(|e| e.to_string())?;
    tracing::info!(bytes = written, "extracted {path}");

    Ok(())
}

fn show_size(library: &Library, path: &str) -> Result<(), String> {
    let size = library.real_size(path).map_err(|e| e.to_string())?;
    println!("{size}\t{}", human_readable_size(size));
    Ok(())
}
