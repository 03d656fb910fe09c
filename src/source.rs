//! Chunk Sources: uniform "read next raw block" over different file access
//! strategies.
//!
//! - [`BufferedSource`] issues sequential `read` calls; the source tracks its
//!   own position.
//! - [`MappedSource`] maps the file and serves positional reads
//!   ([`MappedSource::read_at`]) by copying out of the mapping. Its
//!   [`ChunkSource`] impl keeps a cursor so the splitter can drive both
//!   variants the same way.
//!
//! Both variants fill caller-provided buffers, so buffer lifetime is owned
//! by the pool and not by the source.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use memmap2::Mmap;

use crate::error::CountError;

/// A sequential producer of Raw Blocks.
pub trait ChunkSource {
    /// Reads the next block into `buf`, returning the number of bytes
    /// written. `Ok(0)` signals end of stream; any error is fatal.
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Bytes handed out so far (offset of the next block).
    fn position(&self) -> u64;

    /// Total stream length, when known upfront.
    fn len_hint(&self) -> Option<u64> {
        None
    }
}

/// Sequential reader over any [`Read`] implementation.
pub struct BufferedSource<R> {
    reader: R,
    pos: u64,
    len: Option<u64>,
}

impl BufferedSource<File> {
    /// Opens `path` for sequential block reads.
    pub fn open(path: &Path) -> Result<Self, CountError> {
        let file = File::open(path).map_err(|err| CountError::open(path, err))?;
        let len = file
            .metadata()
            .map_err(|err| CountError::open(path, err))?
            .len();
        Ok(Self {
            reader: file,
            pos: 0,
            len: Some(len),
        })
    }
}

impl<R: Read> BufferedSource<R> {
    /// Wraps an arbitrary reader (length unknown).
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pos: 0,
            len: None,
        }
    }
}

impl<R: Read> ChunkSource for BufferedSource<R> {
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.reader.read(buf) {
                Ok(n) => {
                    self.pos += n as u64;
                    return Ok(n);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    #[inline]
    fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    fn len_hint(&self) -> Option<u64> {
        self.len
    }
}

/// Memory-mapped file served through positional reads.
///
/// Empty files are not mapped (zero-length mappings are rejected on some
/// platforms); they behave as an immediately exhausted source.
pub struct MappedSource {
    map: Option<Mmap>,
    cursor: u64,
}

impl MappedSource {
    /// Opens and maps `path` read-only.
    pub fn open(path: &Path) -> Result<Self, CountError> {
        let file = File::open(path).map_err(|err| CountError::open(path, err))?;
        let len = file
            .metadata()
            .map_err(|err| CountError::open(path, err))?
            .len();
        if len == 0 {
            return Ok(Self {
                map: None,
                cursor: 0,
            });
        }

        // SAFETY: the mapping is read-only and the input is treated as
        // immutable for the duration of the run. If the file is truncated
        // while mapped the OS may signal a fault; that risk is accepted.
        let map = unsafe { Mmap::map(&file) }.map_err(CountError::Map)?;
        #[cfg(unix)]
        {
            // Advisory only; a refusal changes nothing about correctness.
            let _ = map.advise(memmap2::Advice::Sequential);
        }
        Ok(Self {
            map: Some(map),
            cursor: 0,
        })
    }

    /// Mapped length in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    /// True for an empty file.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or_default()
    }

    /// Copies up to `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Returns 0 once `offset` reaches the end of the mapping. Takes `&self`,
    /// so independent readers may share one mapping.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> usize {
        let bytes = self.bytes();
        let start = match usize::try_from(offset) {
            Ok(start) if start < bytes.len() => start,
            _ => return 0,
        };
        let n = buf.len().min(bytes.len() - start);
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        n
    }
}

impl ChunkSource for MappedSource {
    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(buf, self.cursor);
        self.cursor += n as u64;
        Ok(n)
    }

    #[inline]
    fn position(&self) -> u64 {
        self.cursor
    }

    #[inline]
    fn len_hint(&self) -> Option<u64> {
        Some(self.len())
    }
}
