//! INPX catalog support.
//!
//! An `.inpx` file is a ZIP holding `.inp` listings. Each listing line
//! describes one book stored in a *sibling* ZIP next to the index, named after
//! the listing (`fb2-000001-010000.inp` → `fb2-000001-010000.zip`).
//!
//! Enumeration only reads the listings and emits stub books with
//! [`InpxPath`] virtual paths; the sibling archives are opened later, when a
//! stub is resolved.
//!
//! Every resolution opens its own handle on the sibling archive and reads
//! with positional I/O, so concurrent resolutions against the same archive
//! need no external locking.

mod path;
mod record;

pub use path::{
    INP_DELIMITER, INPX_DELIMITER, INPX_EXTENSION, INPX_PREFIX, InpxPath, sibling_archive,
    virtual_path_for,
};
pub use record::{CatalogRecord, FIELD_DELIMITER, MIN_FIELDS, parse_authors, parse_genres};

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::{Archive, ArchiveEntry};
use crate::book::Book;
use crate::error::{Error, Result};
use crate::handler::{
    BookIter, ByteStream, ContainerHandler, DocumentHandler, first_document_handler,
    has_extension,
};

/// Container handler for INPX catalogs.
#[derive(Debug, Default, Clone, Copy)]
pub struct InpxHandler;

impl InpxHandler {
    pub fn new() -> Self {
        Self
    }

    /// Lazily stream the stub books of the catalog at `file`.
    pub fn catalog(&self, file: &Path) -> Result<CatalogBooks> {
        let absolute = std::path::absolute(file)?;
        let archive = Archive::open(&absolute)?;
        let members: Vec<ArchiveEntry> = archive
            .entries()
            .filter(|entry| has_extension(entry.name(), "inp"))
            .collect();
        debug!(index = %absolute.display(), listings = members.len(), "opened inpx catalog");

        let index_path = if has_extension(&absolute.to_string_lossy(), INPX_EXTENSION) {
            absolute.with_extension("")
        } else {
            absolute
        };

        Ok(CatalogBooks {
            index_path,
            members: members.into_iter(),
            current: None,
        })
    }

    fn decode(&self, path: &str) -> Result<InpxPath> {
        InpxPath::decode(path).ok_or_else(|| Error::InvalidPath(path.to_string()))
    }

    /// Open the sibling archive for `path`, failing with `NotFound` if it is
    /// not on disk.
    fn open_sibling(&self, path: &InpxPath) -> Result<Archive> {
        let sibling = path.sibling_archive();
        if !sibling.is_file() {
            return Err(Error::NotFound(format!(
                "archive {} for catalog {}.{INPX_EXTENSION}",
                sibling.display(),
                path.index_path
            )));
        }
        Archive::open(&sibling)
    }

    fn locate(&self, path: &str) -> Result<(InpxPath, ArchiveEntry)> {
        let decoded = self.decode(path)?;
        let archive = self.open_sibling(&decoded)?;
        let entry_name = decoded.entry_name();
        let entry = archive.entry(&entry_name).ok_or_else(|| {
            Error::NotFound(format!(
                "{entry_name} in {}",
                decoded.sibling_archive().display()
            ))
        })?;
        Ok((decoded, entry))
    }
}

impl ContainerHandler for InpxHandler {
    fn name(&self) -> &'static str {
        "inpx"
    }

    fn supports_container(&self, file: &Path) -> bool {
        file.to_str()
            .is_some_and(|name| has_extension(name, INPX_EXTENSION))
    }

    fn enumerate<'a>(
        &self,
        file: &Path,
        _handlers: &'a [Box<dyn DocumentHandler>],
    ) -> Result<BookIter<'a>> {
        Ok(Box::new(self.catalog(file)?))
    }

    fn supports_path(&self, path: &str) -> bool {
        path.starts_with(INPX_PREFIX)
            && path
                .split_once(INPX_DELIMITER)
                .is_some_and(|(_, rest)| rest.contains(INP_DELIMITER))
    }

    fn resolve_book(&self, path: &str, handlers: &[Box<dyn DocumentHandler>]) -> Result<Book> {
        let (_, entry) = self.locate(path)?;
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
        let (_, entry) = self.locate(path)?;
        Ok(entry.open()?)
    }

    fn resolve_size(&self, path: &str) -> Result<u64> {
        let decoded = self.decode(path)?;
        let sibling = decoded.sibling_archive();
        if !sibling.is_file() {
            return Ok(0);
        }
        let archive = Archive::open(&sibling)?;
        Ok(archive.entry_size(&decoded.entry_name()).unwrap_or(0))
    }
}

/// Lazy stream of catalog stubs.
///
/// Owns the index archive; dropping the iterator, exhausted or not, releases
/// it. Listings whose sibling archive is missing are skipped without being
/// read.
pub struct CatalogBooks {
    index_path: PathBuf,
    members: std::vec::IntoIter<ArchiveEntry>,
    current: Option<Listing>,
}

struct Listing {
    name: String,
    reader: BufReader<ByteStream>,
    line: Vec<u8>,
}

impl CatalogBooks {
    /// Index path as it appears in emitted virtual paths.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    fn open_next_listing(&mut self) -> Option<Result<()>> {
        loop {
            let member = self.members.next()?;
            let sibling = sibling_archive(&self.index_path, member.name());
            if !sibling.is_file() {
                debug!(
                    listing = member.name(),
                    sibling = %sibling.display(),
                    "sibling archive missing, skipping listing"
                );
                continue;
            }
            return Some(match member.open() {
                Ok(stream) => {
                    self.current = Some(Listing {
                        name: member.name().to_string(),
                        reader: BufReader::new(stream),
                        line: Vec::new(),
                    });
                    Ok(())
                }
                Err(e) => {
                    warn!(listing = member.name(), error = %e, "cannot open listing");
                    Err(e.into())
                }
            });
        }
    }
}

impl Iterator for CatalogBooks {
    type Item = Result<(Book, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none()
                && let Err(e) = self.open_next_listing()?
            {
                return Some(Err(e));
            }
            let Some(listing) = self.current.as_mut() else {
                continue;
            };

            listing.line.clear();
            match listing.reader.read_until(b'\n', &mut listing.line) {
                Ok(0) => {
                    self.current = None;
                }
                Ok(_) => {
                    let text = String::from_utf8_lossy(&listing.line);
                    let text = text.strip_suffix('\n').unwrap_or(&text);
                    let Some(record) = CatalogRecord::parse(text) else {
                        continue;
                    };
                    let index = self.index_path.to_string_lossy();
                    if let Some(book) = record.to_book(&index, &listing.name) {
                        return Some(Ok((book, 0)));
                    }
                }
                Err(e) => {
                    warn!(listing = %listing.name, error = %e, "listing read failed");
                    self.current = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_path() {
        let handler = InpxHandler::new();
        assert!(handler.supports_path("inpx::/path/to/library.inpx#books.inp*book.fb2"));
        assert!(!handler.supports_path("zip::/path/to/library.zip#book.fb2"));
        assert!(!handler.supports_path("/path/to/book.fb2"));
        assert!(!handler.supports_path("inpx::/path/to/library.inpx"));
        assert!(!handler.supports_path("inpx::/path/to/library.inpx#books.inp"));
    }

    #[test]
    fn test_supports_container() {
        let handler = InpxHandler::new();
        assert!(handler.supports_container(Path::new("/lib/flibusta.inpx")));
        assert!(handler.supports_container(Path::new("/lib/FLIBUSTA.INPX")));
        assert!(!handler.supports_container(Path::new("/lib/flibusta.zip")));
        assert!(!handler.supports_container(Path::new("/lib/inpx")));
    }

    #[test]
    fn test_resolve_with_missing_sibling() {
        let handler = InpxHandler::new();
        let path = virtual_path_for("/nonexistent/dir/lib", "books.inp", "1", "fb2");
        assert!(handler.resolve_book(&path, &[]).unwrap_err().is_not_found());
        assert!(handler.resolve_bytes(&path, &[]).err().unwrap().is_not_found());
        assert_eq!(handler.resolve_size(&path).unwrap(), 0);
    }

    #[test]
    fn test_resolve_rejects_foreign_path() {
        let handler = InpxHandler::new();
        assert!(matches!(
            handler.resolve_size("zip::/a.zip#b.fb2"),
            Err(Error::InvalidPath(_))
        ));
    }
}
