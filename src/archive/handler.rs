//! Generic ZIP containers: every entry is dispatched to the document handlers.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::Archive;
use crate::book::Book;
use crate::error::{Error, Result};
use crate::handler::{
    BookIter, ByteStream, ContainerHandler, DocumentHandler, first_document_handler,
    has_extension,
};

const ZIP_PREFIX: &str = "zip::";
const ZIP_DELIMITER: &str = ".zip#";

/// Address of an entry inside a ZIP archive:
/// `zip::<archive path>#<entry name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZipPath {
    /// Archive path including its `.zip` extension.
    pub archive: PathBuf,
    pub entry: String,
}

impl ZipPath {
    pub fn new(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            entry: entry.into(),
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Split at the first `.zip#`; the archive keeps its extension.
    pub fn decode(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(ZIP_PREFIX)?;
        let split = rest.find(ZIP_DELIMITER)?;
        let archive = &rest[..split + ZIP_DELIMITER.len() - 1];
        let entry = &rest[split + ZIP_DELIMITER.len()..];
        if archive.len() <= ".zip".len() || entry.is_empty() {
            return None;
        }
        Some(Self::new(archive, entry))
    }
}

impl fmt::Display for ZipPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ZIP_PREFIX}{}#{}", self.archive.display(), self.entry)
    }
}

/// Container handler for plain `.zip` files holding book documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipHandler;

impl ZipHandler {
    pub fn new() -> Self {
        Self
    }

    fn decode(&self, path: &str) -> Result<ZipPath> {
        ZipPath::decode(path).ok_or_else(|| Error::InvalidPath(path.to_string()))
    }

    fn open(&self, zip_path: &ZipPath) -> Result<Archive> {
        if !zip_path.archive.is_file() {
            return Err(Error::NotFound(zip_path.archive.display().to_string()));
        }
        Archive::open(&zip_path.archive)
    }
}

impl ContainerHandler for ZipHandler {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn supports_container(&self, file: &Path) -> bool {
        file.to_str().is_some_and(|name| has_extension(name, "zip"))
    }

    fn enumerate<'a>(
        &self,
        file: &Path,
        handlers: &'a [Box<dyn DocumentHandler>],
    ) -> Result<BookIter<'a>> {
        let archive_path = std::path::absolute(file)?;
        let archive = Archive::open(&archive_path)?;
        debug!(archive = %archive_path.display(), entries = archive.len(), "enumerating zip");

        let books = archive.entries().filter_map(move |entry| {
            let open = || entry.open();
            let handler = match first_document_handler(handlers, entry.name(), &open) {
                Some(handler) => handler,
                None => {
                    debug!(entry = entry.name(), "no handler for zip entry");
                    return None;
                }
            };
            let virtual_path = ZipPath::new(&archive_path, entry.name()).encode();
            let item = handler
                .book_info(entry.name(), &open)
                .map(|book| (book.with_path(virtual_path), entry.size()));
            if let Err(e) = &item {
                warn!(entry = entry.name(), error = %e, "failed to read zip entry");
            }
            Some(item)
        });

        Ok(Box::new(books))
    }

    fn supports_path(&self, path: &str) -> bool {
        path.starts_with(ZIP_PREFIX) && path.contains(ZIP_DELIMITER)
    }

    fn resolve_book(&self, path: &str, handlers: &[Box<dyn DocumentHandler>]) -> Result<Book> {
        let zip_path = self.decode(path)?;
        let archive = self.open(&zip_path)?;
        let entry = archive
            .entry(&zip_path.entry)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        let open = || entry.open();
        let handler = first_document_handler(handlers, entry.name(), &open)
            .ok_or_else(|| Error::UnsupportedFormat(entry.name().to_string()))?;
        Ok(handler.book_info(entry.name(), &open)?.with_path(path))
    }

    fn resolve_bytes(
        &self,
        path: &str,
        _handlers: &[Box<dyn DocumentHandler>],
    ) -> Result<ByteStream> {
        let zip_path = self.decode(path)?;
        self.open(&zip_path)?.open_entry(&zip_path.entry)
    }

    fn resolve_size(&self, path: &str) -> Result<u64> {
        let zip_path = self.decode(path)?;
        if !zip_path.archive.is_file() {
            return Ok(0);
        }
        let archive = Archive::open(&zip_path.archive)?;
        Ok(archive.entry_size(&zip_path.entry).unwrap_or(0))
    }
}
