//! Error types for fbshelf operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting or resolving books.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid virtual path: {0}")]
    InvalidPath(String),

    #[error("Unparseable document: {0}")]
    Parse(String),

    #[error("Invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    /// Resource absence: a missing archive, entry or file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Error::Zip(zip::result::ZipError::FileNotFound) => true,
            _ => false,
        }
    }

    /// No handler claims the format.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
