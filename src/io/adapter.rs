use super::byte_source::ByteSource;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Stateful `Read + Seek` view over a shared [`ByteSource`].
///
/// Each cursor owns only its position; cloning yields an independent
/// cursor onto the same bytes. Used to hand sources to `zip::ZipArchive`
/// and to stream single archive entries.
#[derive(Clone)]
pub struct ByteSourceCursor {
    inner: Arc<dyn ByteSource>,
    position: u64,
}

impl ByteSourceCursor {
    pub fn new(inner: Arc<dyn ByteSource>) -> Self {
        Self { inner, position: 0 }
    }

    /// A fresh cursor positioned at `offset`.
    pub fn at(inner: Arc<dyn ByteSource>, offset: u64) -> Self {
        Self {
            inner,
            position: offset,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.inner
    }
}

impl Read for ByteSourceCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let total = self.inner.len();
        if self.position >= total || buf.is_empty() {
            return Ok(0);
        }
        let n = (total - self.position).min(buf.len() as u64) as usize;
        let read = self.inner.read_at_into(self.position, &mut buf[..n])?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for ByteSourceCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.inner.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(p) => {
                self.position = p;
                Ok(p)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of source",
            )),
        }
    }
}
