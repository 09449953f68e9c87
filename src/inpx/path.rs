//! Virtual paths for books listed in INPX catalogs.
//!
//! ```text
//! inpx::<index path>.inpx#<listing member>*<book path>.<format>
//! ```
//!
//! The index path is stored without its `.inpx` extension. Decoding splits at
//! the first `.inpx#`, then the first `*`, then the last `.`, so the reserved
//! tokens must not appear inside the component they would terminate.

use std::fmt;
use std::path::{Path, PathBuf};

pub const INPX_PREFIX: &str = "inpx::";
pub const INPX_DELIMITER: &str = ".inpx#";
pub const INP_DELIMITER: char = '*';
pub const INPX_EXTENSION: &str = "inpx";
pub const SIBLING_EXTENSION: &str = "zip";

/// Decoded form of an INPX virtual path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InpxPath {
    /// Catalog index path without the `.inpx` extension.
    pub index_path: String,
    /// Listing member inside the index archive, e.g. `fb2-000001-010000.inp`.
    pub listing: String,
    /// Book file name relative to the sibling archive, without the format.
    pub book_path: String,
    /// Format extension, e.g. `fb2`.
    pub format: String,
}

impl InpxPath {
    pub fn new(
        index_path: impl Into<String>,
        listing: impl Into<String>,
        book_path: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            index_path: index_path.into(),
            listing: listing.into(),
            book_path: book_path.into(),
            format: format.into(),
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Inverse of [`encode`](Self::encode). `None` when `path` lacks the
    /// prefix or either delimiter.
    pub fn decode(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(INPX_PREFIX)?;
        let (index_path, rest) = rest.split_once(INPX_DELIMITER)?;
        let (listing, entry) = rest.split_once(INP_DELIMITER)?;
        let (book_path, format) = entry.rsplit_once('.')?;
        Some(Self::new(index_path, listing, book_path, format))
    }

    /// Name of the book entry inside the sibling archive.
    pub fn entry_name(&self) -> String {
        if self.format.is_empty() {
            self.book_path.clone()
        } else {
            format!("{}.{}", self.book_path, self.format)
        }
    }

    /// Sibling archive holding the book: the listing member's stem with a
    /// `.zip` extension, next to the index file.
    pub fn sibling_archive(&self) -> PathBuf {
        sibling_archive(Path::new(&self.index_path), &self.listing)
    }
}

impl fmt::Display for InpxPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{INPX_PREFIX}{}{INPX_DELIMITER}{}{INP_DELIMITER}{}.{}",
            self.index_path, self.listing, self.book_path, self.format
        )
    }
}

/// Encode the four components of a catalog book address.
pub fn virtual_path_for(index_path: &str, listing: &str, book_path: &str, format: &str) -> String {
    InpxPath::new(index_path, listing, book_path, format).encode()
}

/// `dirname(index)/stem(listing).zip`.
pub fn sibling_archive(index: &Path, listing: &str) -> PathBuf {
    let stem = Path::new(listing)
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    let mut name = stem;
    name.push(".");
    name.push(SIBLING_EXTENSION);
    index.parent().unwrap_or(Path::new("")).join(name)
}
