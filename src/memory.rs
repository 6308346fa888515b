//! In-memory streams.

use crate::reader::{seek_target, Reader, Stream, Whence};
use crate::writer::Writer;
use crate::Result;

/// Reads from a borrowed slice of bytes.
///
/// Seeks are clamped to `[0, data.len()]`.
#[derive(Clone, Debug)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    /// Constructor
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The bytes that have not been read yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl Stream for SliceReader<'_> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let len = self.data.len() as u64;
        let target = seek_target(self.pos as u64, len, offset, whence).min(len);
        self.pos = target as usize;
        Ok(target)
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }
}

impl Reader for SliceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let src = self.remaining();
        let n = buf.len().min(src.len());
        buf[..n].copy_from_slice(&src[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// A growable, in-memory stream that can be both read and written.
///
/// Unlike [`SliceReader`], seeking past the end is allowed. Reading there returns no data;
/// writing there first fills the gap with zeros.
#[derive(Clone, Debug, Default)]
pub struct VecStream {
    data: Vec<u8>,
    pos: usize,
}

impl VecStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream over existing contents, positioned at the start.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// The current contents of the stream.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Extracts the contents of the stream.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for VecStream {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl Stream for VecStream {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let target = seek_target(self.pos as u64, self.data.len() as u64, offset, whence);
        self.pos = usize::try_from(target).unwrap_or(usize::MAX);
        Ok(self.pos as u64)
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }
}

impl Reader for VecStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let src = self.data.get(self.pos..).unwrap_or_default();
        let n = buf.len().min(src.len());
        buf[..n].copy_from_slice(&src[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Writer for VecStream {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let end = self
            .pos
            .checked_add(buf.len())
            .ok_or_else(|| std::io::Error::other("write position overflows usize"))?;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn truncate(&mut self) -> Result<()> {
        self.data.truncate(self.pos);
        Ok(())
    }
}
