//! ZIP archive indexing and streaming entry access.
//!
//! [`Archive`] scans the central directory once and remembers where every
//! entry's data starts. Entry content is never read until a caller opens it,
//! and each open creates its own cursor, so entries can be streamed
//! concurrently from one handle.

mod handler;

pub use handler::{ZipHandler, ZipPath};

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::DeflateDecoder;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::handler::ByteStream;
use crate::io::{ByteSource, ByteSourceCursor, FileSource};

/// Where an entry's bytes live inside the archive file.
#[derive(Debug, Clone, Copy)]
struct ZipEntryLoc {
    data_offset: u64,
    compressed_size: u64,
    /// 0 = Stored, 8 = Deflate.
    compression: u16,
}

#[derive(Debug, Clone)]
struct EntryInfo {
    name: String,
    size: u64,
    loc: ZipEntryLoc,
}

struct ArchiveInner {
    path: Option<PathBuf>,
    source: Arc<dyn ByteSource>,
    entries: Vec<EntryInfo>,
    by_name: HashMap<String, usize>,
}

/// An indexed ZIP archive. Cloning shares the same open handle.
#[derive(Clone)]
pub struct Archive {
    inner: Arc<ArchiveInner>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.inner.path)
            .field("entries", &self.inner.entries.len())
            .finish()
    }
}

impl Archive {
    /// Open and index the archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = Arc::new(FileSource::open(path)?);
        Self::index(source, Some(path.to_path_buf()))
    }

    /// Index an archive held by an arbitrary byte source.
    pub fn from_source(source: Arc<dyn ByteSource>) -> Result<Self> {
        Self::index(source, None)
    }

    fn index(source: Arc<dyn ByteSource>, path: Option<PathBuf>) -> Result<Self> {
        let cursor = ByteSourceCursor::new(Arc::clone(&source));
        let mut archive = ZipArchive::new(cursor)?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut by_name = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let info = EntryInfo {
                size: file.size(),
                loc: ZipEntryLoc {
                    data_offset: file.data_start(),
                    compressed_size: file.compressed_size(),
                    compression: compression_to_u16(file.compression()),
                },
                name: name.clone(),
            };
            // First occurrence wins for duplicated names.
            by_name.entry(name).or_insert(entries.len());
            entries.push(info);
        }

        Ok(Self {
            inner: Arc::new(ArchiveInner {
                path,
                source,
                entries,
                by_name,
            }),
        })
    }

    /// Filesystem path, when opened from disk.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Number of file entries (directories excluded).
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Lazy walk over entries in directory order.
    pub fn entries(&self) -> Entries {
        Entries {
            archive: self.clone(),
            next: 0,
        }
    }

    pub fn entry(&self, name: &str) -> Option<ArchiveEntry> {
        self.inner.by_name.get(name).map(|&index| ArchiveEntry {
            archive: self.clone(),
            index,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.by_name.contains_key(name)
    }

    /// Uncompressed size of `name`, if present.
    pub fn entry_size(&self, name: &str) -> Option<u64> {
        self.inner
            .by_name
            .get(name)
            .map(|&i| self.inner.entries[i].size)
    }

    /// Stream the content of `name`.
    pub fn open_entry(&self, name: &str) -> Result<ByteStream> {
        let entry = self
            .entry(name)
            .ok_or_else(|| Error::NotFound(format!("{name} in {}", self.describe())))?;
        Ok(entry.open()?)
    }

    /// Read the content of `name` fully into memory.
    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.open_entry(name)?.read_to_end(&mut out)?;
        Ok(out)
    }

    fn describe(&self) -> String {
        match &self.inner.path {
            Some(path) => path.display().to_string(),
            None => "archive".to_string(),
        }
    }

    fn open_at(&self, index: usize) -> std::io::Result<ByteStream> {
        let info = &self.inner.entries[index];
        let raw = ByteSourceCursor::at(Arc::clone(&self.inner.source), info.loc.data_offset)
            .take(info.loc.compressed_size);

        match info.loc.compression {
            0 => Ok(Box::new(raw)),
            8 => Ok(Box::new(DeflateDecoder::new(raw))),
            method => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("unsupported compression method {method} for {}", info.name),
            )),
        }
    }
}

/// One file inside an [`Archive`]. Keeps the archive alive.
#[derive(Clone)]
pub struct ArchiveEntry {
    archive: Archive,
    index: usize,
}

impl ArchiveEntry {
    pub fn name(&self) -> &str {
        &self.archive.inner.entries[self.index].name
    }

    /// Uncompressed size from the central directory.
    pub fn size(&self) -> u64 {
        self.archive.inner.entries[self.index].size
    }

    /// Fresh decompressing stream over this entry.
    pub fn open(&self) -> std::io::Result<ByteStream> {
        self.archive.open_at(self.index)
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }
}

impl fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("name", &self.name())
            .field("size", &self.size())
            .finish()
    }
}

/// Iterator over the entries of an archive. Holds the archive handle until
/// dropped.
pub struct Entries {
    archive: Archive,
    next: usize,
}

impl Iterator for Entries {
    type Item = ArchiveEntry;

    fn next(&mut self) -> Option<ArchiveEntry> {
        if self.next >= self.archive.len() {
            return None;
        }
        let entry = ArchiveEntry {
            archive: self.archive.clone(),
            index: self.next,
        };
        self.next += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.archive.len() - self.next;
        (rest, Some(rest))
    }
}

/// Open `file` and walk its entries lazily.
pub fn enumerate(file: impl AsRef<Path>) -> Result<Entries> {
    Ok(Archive::open(file)?.entries())
}

fn compression_to_u16(method: zip::CompressionMethod) -> u16 {
    match method {
        zip::CompressionMethod::Stored => 0,
        zip::CompressionMethod::Deflated => 8,
        _ => 255,
    }
}
