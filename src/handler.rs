//! Handler capability interfaces.
//!
//! Two kinds of handlers cooperate through the [`HandlerRegistry`](crate::HandlerRegistry):
//!
//! - **Document handlers** turn the bytes of one book file into a [`Book`].
//! - **Container handlers** own a container format (ZIP, INPX). They enumerate
//!   the books inside a container, hand each one back to the document
//!   handlers, and later resolve the virtual paths they emitted.
//!
//! Dispatch is always first-match-wins in registration order.

use std::io::{self, Read};
use std::path::Path;

use crate::book::Book;
use crate::error::Result;

/// An owned stream of book bytes.
pub type ByteStream = Box<dyn Read + Send>;

/// Opens a fresh stream over the same bytes on every call.
pub type DataSupplier<'a> = &'a dyn Fn() -> io::Result<ByteStream>;

/// Lazy sequence of `(book, size hint)` pairs. Items fail independently.
pub type BookIter<'a> = Box<dyn Iterator<Item = Result<(Book, u64)>> + 'a>;

/// Parser for a single book document format.
pub trait DocumentHandler: Send + Sync {
    /// Short identifier, e.g. `"fb2"`.
    fn name(&self) -> &'static str;

    /// Whether this handler can read the document called `name`.
    fn supports_file(&self, name: &str, data: DataSupplier<'_>) -> bool;

    /// Extract metadata. The returned book's `path` is `name`.
    fn book_info(&self, name: &str, data: DataSupplier<'_>) -> Result<Book>;

    /// File extensions this handler reads, without the dot.
    fn read_formats(&self) -> &'static [&'static str];
}

/// Resolver for a container format and the virtual paths it emits.
pub trait ContainerHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `file` is a container this handler owns.
    fn supports_container(&self, file: &Path) -> bool;

    /// Lazily enumerate the books inside `file`.
    ///
    /// Opening the container is the only eager step. Individual items that
    /// fail are yielded as `Err` and enumeration continues past them.
    fn enumerate<'a>(
        &self,
        file: &Path,
        handlers: &'a [Box<dyn DocumentHandler>],
    ) -> Result<BookIter<'a>>;

    /// Whether `path` is a virtual path emitted by this handler.
    fn supports_path(&self, path: &str) -> bool;

    /// Re-locate a book and extract its metadata. The result reports `path`.
    fn resolve_book(&self, path: &str, handlers: &[Box<dyn DocumentHandler>]) -> Result<Book>;

    /// Raw content of the book at `path`. Dropping the stream releases the
    /// underlying archive handle.
    fn resolve_bytes(&self, path: &str, handlers: &[Box<dyn DocumentHandler>])
    -> Result<ByteStream>;

    /// Uncompressed size of the book at `path`, or zero when it is absent.
    fn resolve_size(&self, path: &str) -> Result<u64>;
}

/// First handler, in order, that supports `name`.
pub fn first_document_handler<'h>(
    handlers: &'h [Box<dyn DocumentHandler>],
    name: &str,
    data: DataSupplier<'_>,
) -> Option<&'h dyn DocumentHandler> {
    handlers
        .iter()
        .find(|h| h.supports_file(name, data))
        .map(|h| h.as_ref())
}

/// Case-insensitive extension check on a bare name or path string.
pub(crate) fn has_extension(name: &str, ext: &str) -> bool {
    name.len() > ext.len()
        && name.is_char_boundary(name.len() - ext.len() - 1)
        && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
        && name[name.len() - ext.len()..].eq_ignore_ascii_case(ext)
}
