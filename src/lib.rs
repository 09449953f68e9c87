//! # fbshelf
//!
//! Book metadata extraction for home and catalog-backed e-book libraries.
//!
//! ## Features
//!
//! - Tolerant FictionBook (FB2) parsing that survives BOMs, junk before the
//!   prolog, bare `&` and unclosed tags
//! - EPUB package metadata
//! - Books inside ZIP archives, addressed as `zip::<archive>#<entry>`
//! - INPX catalogs with sibling archives, addressed as
//!   `inpx::<index>.inpx#<listing>*<book>.<ext>`
//! - Lazy enumeration: nothing past the consumer's position is parsed
//!
//! ## Quick Start
//!
//! ```no_run
//! use fbshelf::Library;
//!
//! let library = Library::default();
//!
//! // A plain book file
//! let book = library.obtain_book("solaris.fb2").unwrap();
//!
//! // Every book in a directory tree, including catalogs and archives
//! for book in library.scan(["/srv/books"]) {
//!     println!("{} ({})", book.title, book.path);
//! }
//! ```
//!
//! ## Virtual paths
//!
//! Books living inside containers get a virtual path from the container
//! handler that found them. Passing that path back to [`Library`] re-locates
//! the book:
//!
//! ```no_run
//! use fbshelf::Library;
//!
//! let library = Library::default();
//! let path = "inpx::/srv/flibusta/flibusta.inpx#fb2-000024-030559.inp*26042.fb2";
//! let size = library.real_size(path).unwrap();
//! let mut bytes = library.book_data(path).unwrap();
//! std::io::copy(&mut bytes, &mut std::io::sink()).unwrap();
//! # let _ = size;
//! ```

pub mod archive;
pub mod book;
pub mod config;
pub mod epub;
pub mod error;
pub mod fb2;
pub mod handler;
pub mod inpx;
pub mod io;
pub mod library;
pub mod registry;
pub mod util;

pub use archive::{Archive, ArchiveEntry, ZipHandler, ZipPath};
pub use book::{Author, Book, Cover};
pub use config::LibraryConfig;
pub use epub::EpubHandler;
pub use error::{Error, Result};
pub use fb2::{Fb2Handler, FictionBook, ParseStage};
pub use handler::{BookIter, ByteStream, ContainerHandler, DataSupplier, DocumentHandler};
pub use inpx::{CatalogRecord, InpxHandler, InpxPath};
pub use library::{Library, Scan};
pub use registry::HandlerRegistry;
