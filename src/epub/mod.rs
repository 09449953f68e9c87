//! EPUB metadata extraction.
//!
//! Only the package metadata is read: title, creators, description,
//! subjects, calibre series information and the cover image. Content
//! documents are never parsed.

mod opf;

pub use opf::{Creator, OpfPackage, parse_container_xml, parse_opf};

use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::archive::Archive;
use crate::book::{Author, Book, Cover};
use crate::error::{Error, Result};
use crate::handler::{DataSupplier, DocumentHandler, has_extension};
use crate::io::MemorySource;
use crate::util::{decode_text, extract_xml_encoding};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const SERIES_META: &str = "calibre:series";
const SERIES_INDEX_META: &str = "calibre:series_index";

/// Document handler for `.epub` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpubHandler;

impl EpubHandler {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentHandler for EpubHandler {
    fn name(&self) -> &'static str {
        "epub"
    }

    fn supports_file(&self, name: &str, _data: DataSupplier<'_>) -> bool {
        has_extension(name, "epub")
    }

    fn book_info(&self, name: &str, data: DataSupplier<'_>) -> Result<Book> {
        let mut bytes = Vec::new();
        data()?.read_to_end(&mut bytes)?;
        let archive = Archive::from_source(Arc::new(MemorySource::new(bytes)))?;

        let container = archive.read_entry(CONTAINER_PATH).map_err(|e| {
            if e.is_not_found() {
                Error::InvalidEpub(format!("{CONTAINER_PATH} is missing"))
            } else {
                e
            }
        })?;
        let opf_path = parse_container_xml(&container)?;
        let opf_bytes = read_member(&archive, &opf_path)?;
        let opf_text = decode_text(&opf_bytes, extract_xml_encoding(&opf_bytes));
        let package = parse_opf(&opf_text)?;

        let title = package
            .title
            .clone()
            .ok_or_else(|| Error::MissingElement("dc:title".into()))?;

        let mut book = Book::new(title).with_path(name);
        book.authors = package
            .creators
            .iter()
            .filter(|c| c.role.as_deref().is_none_or(|r| r.eq_ignore_ascii_case("aut")))
            .map(creator_to_author)
            .filter(|a| !a.is_empty())
            .collect();
        book.genres = package.subjects.clone();
        book.annotation = package.descriptions.first().cloned();
        book.sequence = package
            .meta
            .get(SERIES_META)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        book.sequence_number = package
            .meta
            .get(SERIES_INDEX_META)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n >= i32::MIN as f64 && *n <= i32::MAX as f64)
            .map(|n| n.trunc() as i32);
        book.cover = package
            .cover
            .as_ref()
            .and_then(|(href, media_type)| load_cover(&archive, &opf_path, href, media_type));

        Ok(book)
    }

    fn read_formats(&self) -> &'static [&'static str] {
        &["epub"]
    }
}

/// Read a member, retrying with a percent-decoded name.
fn read_member(archive: &Archive, path: &str) -> Result<Vec<u8>> {
    match archive.read_entry(path) {
        Err(e) if e.is_not_found() => {
            let decoded = percent_encoding::percent_decode_str(path)
                .decode_utf8()
                .map_err(|_| Error::NotFound(path.to_string()))?;
            if decoded == path {
                return Err(e);
            }
            archive.read_entry(&decoded)
        }
        other => other,
    }
}

fn load_cover(archive: &Archive, opf_path: &str, href: &str, media_type: &str) -> Option<Cover> {
    let path = resolve_href(opf_path, href);
    match read_member(archive, &path) {
        Ok(data) => {
            let content_type = if media_type.is_empty() {
                crate::util::detect_mime_type(&path, &data).unwrap_or("application/octet-stream")
            } else {
                media_type
            };
            Some(Cover {
                content_type: content_type.to_string(),
                data,
            })
        }
        Err(e) => {
            debug!(cover = %path, error = %e, "epub cover not readable");
            None
        }
    }
}

/// Resolve `href` relative to the directory of the OPF document.
fn resolve_href(opf_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut parts: Vec<&str> = match opf_path.rfind('/') {
        Some(i) => opf_path[..i].split('/').collect(),
        None => Vec::new(),
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

fn creator_to_author(creator: &Creator) -> Author {
    if let Some(file_as) = creator.file_as.as_deref()
        && let Some((last, first)) = file_as.split_once(',')
    {
        return Author::new()
            .with_last_name(last.trim())
            .with_first_name(first.trim());
    }
    let name = creator.name.trim();
    match name.rsplit_once(char::is_whitespace) {
        Some((first, last)) => Author::new()
            .with_first_name(first.trim())
            .with_last_name(last.trim()),
        None => Author::new().with_last_name(name),
    }
}
