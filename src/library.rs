//! High-level entry point tying the registry to the filesystem.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::book::Book;
use crate::error::{Error, Result};
use crate::handler::{BookIter, ByteStream};
use crate::registry::HandlerRegistry;

/// Resolves plain paths and virtual paths to books, sizes and bytes.
#[derive(Debug)]
pub struct Library {
    registry: HandlerRegistry,
}

impl Default for Library {
    fn default() -> Self {
        Self::new(HandlerRegistry::with_defaults())
    }
}

impl Library {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Metadata for one book, or `None` if no handler claims `path`.
    ///
    /// Virtual paths go to their container handler; anything else is read
    /// as a plain file.
    pub fn obtain_book(&self, path: &str) -> Result<Option<Book>> {
        if let Some(container) = self.registry.container_for_path(path) {
            return container
                .resolve_book(path, self.registry.documents())
                .map(Some);
        }

        let open = || -> std::io::Result<ByteStream> { Ok(Box::new(File::open(path)?)) };
        match self.registry.document_for(path, &open) {
            Some(handler) => handler.book_info(path, &open).map(Some),
            None => Ok(None),
        }
    }

    /// All books in `file`.
    ///
    /// Containers are enumerated lazily. A plain book file yields a single
    /// item sized by its file length. Unsupported files yield nothing.
    pub fn obtain_books<'a>(&'a self, file: &Path) -> Result<BookIter<'a>> {
        if let Some(container) = self.registry.container_for_file(file) {
            return container.enumerate(file, self.registry.documents());
        }

        let name = file.to_string_lossy();
        let open = || -> std::io::Result<ByteStream> { Ok(Box::new(File::open(file)?)) };
        let Some(handler) = self.registry.document_for(&name, &open) else {
            debug!(file = %file.display(), "unsupported file");
            return Ok(Box::new(std::iter::empty()));
        };
        let item = handler
            .book_info(&name, &open)
            .and_then(|book| Ok((book, file.metadata()?.len())));
        Ok(Box::new(std::iter::once(item)))
    }

    /// Uncompressed size of the book at `path`.
    pub fn real_size(&self, path: &str) -> Result<u64> {
        match self.registry.container_for_path(path) {
            Some(container) => container.resolve_size(path),
            None => Ok(std::fs::metadata(path)?.len()),
        }
    }

    /// Raw bytes of the book at `path`.
    pub fn book_data(&self, path: &str) -> Result<ByteStream> {
        if let Some(container) = self.registry.container_for_path(path) {
            return container.resolve_bytes(path, self.registry.documents());
        }

        let open = || -> std::io::Result<ByteStream> { Ok(Box::new(File::open(path)?)) };
        if self.registry.document_for(path, &open).is_none() {
            return Err(Error::UnsupportedFormat(path.to_string()));
        }
        Ok(open()?)
    }

    /// Whether `path` still resolves to readable content.
    pub fn book_exists(&self, path: &str) -> bool {
        match self.book_data(path) {
            Ok(_) => true,
            Err(e) => {
                debug!(path, error = %e, "book does not resolve");
                false
            }
        }
    }

    /// Lazily walk `sources` and yield every book found.
    ///
    /// Directories are walked recursively in file-name order; file sources
    /// are used directly. Unreadable files and broken books are logged and
    /// skipped.
    pub fn scan<I, P>(&self, sources: I) -> Scan<'_>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources: Vec<PathBuf> = sources
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        info!(sources = sources.len(), "scanning library");

        let files = sources.into_iter().flat_map(|source| {
            WalkDir::new(source)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) if entry.file_type().is_file() => Some(entry.into_path()),
                    Ok(_) => None,
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable path");
                        None
                    }
                })
        });

        Scan {
            library: self,
            files: Box::new(files),
            current: None,
            found: 0,
        }
    }
}

/// Iterator returned by [`Library::scan`].
pub struct Scan<'a> {
    library: &'a Library,
    files: Box<dyn Iterator<Item = PathBuf> + 'a>,
    current: Option<(PathBuf, BookIter<'a>)>,
    found: usize,
}

impl Iterator for Scan<'_> {
    type Item = Book;

    fn next(&mut self) -> Option<Book> {
        loop {
            if let Some((file, books)) = self.current.as_mut() {
                match books.next() {
                    Some(Ok((book, _))) => {
                        self.found += 1;
                        return Some(book);
                    }
                    Some(Err(e)) => {
                        warn!(file = %file.display(), error = %e, "skipping unreadable book");
                        continue;
                    }
                    None => self.current = None,
                }
            }

            let file = self.files.next()?;
            match self.library.obtain_books(&file) {
                Ok(books) => self.current = Some((file, books)),
                Err(e) => warn!(file = %file.display(), error = %e, "skipping file"),
            }
        }
    }
}

impl Drop for Scan<'_> {
    fn drop(&mut self) {
        debug!(books = self.found, "scan finished");
    }
}
