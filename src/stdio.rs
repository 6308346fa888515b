//! Adapters between this crate's stream traits and `std::io`.
//!
//! [`IoStream`] wraps anything that implements [`Seek`] plus [`Read`] and/or [`Write`], including
//! [`File`]. [`ForwardReader`] wraps sources that cannot seek at all, such as pipes and sockets.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace, warn};

use crate::reader::{seek_target, Reader, Stream, Whence};
use crate::writer::Writer;
use crate::{Error, Result};

/// Sinks that can discard their contents past a given length.
pub trait Truncate {
    /// Sets the length of the sink to `len` bytes, discarding anything after it.
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Truncate for Cursor<Vec<u8>> {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).map_err(io::Error::other)?;
        self.get_mut().truncate(len);
        Ok(())
    }
}

/// Reads until `buf` is full or `r` reports end of stream, retrying interrupted reads.
///
/// Returns the number of bytes placed in `buf` alongside the outcome, so that bytes received
/// before a failure are not lost to the caller.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> (usize, io::Result<()>) {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                trace!("read interrupted after {total} bytes, retrying");
            }
            Err(e) => return (total, Err(e)),
        }
    }
    (total, Ok(()))
}

/// A [`Stream`] over a `std::io` value that implements [`Seek`].
///
/// The position is cached, so [`Stream::tell`] never calls into the inner value. For that reason
/// the inner value is not exposed mutably.
#[derive(Debug)]
pub struct IoStream<T> {
    inner: T,
    pos: u64,
    /// Whether seeks may go past the end of the stream.
    growable: bool,
}

impl<T: Seek> IoStream<T> {
    /// Wraps `inner` for reading. Seeks are clamped to the length of the stream.
    pub fn reader(mut inner: T) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self {
            inner,
            pos,
            growable: false,
        })
    }

    /// Wraps `inner` for writing. Seeks may go past the end of the stream; a subsequent write
    /// extends it.
    pub fn writer(mut inner: T) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self {
            inner,
            pos,
            growable: true,
        })
    }
}

impl<T> IoStream<T> {
    /// Accesses the inner value.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Extracts the inner value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl IoStream<File> {
    /// Opens an existing file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening {} for reading", path.display());
        Self::reader(File::open(path)?)
    }

    /// Creates (or truncates) a file and opens it for reading and writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("creating {}", path.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::writer(file)
    }
}

impl<T: Seek> Stream for IoStream<T> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let len = self.inner.seek(SeekFrom::End(0))?;
        let mut target = seek_target(self.pos, len, offset, whence);
        if !self.growable {
            target = target.min(len);
        }
        match self.inner.seek(SeekFrom::Start(target)) {
            Ok(pos) => {
                self.pos = pos;
                Ok(pos)
            }
            Err(e) => {
                // Put the inner position back where `tell` says it is.
                if let Err(restore) = self.inner.seek(SeekFrom::Start(self.pos)) {
                    warn!("could not restore offset {} after failed seek: {restore}", self.pos);
                    if let Ok(pos) = self.inner.stream_position() {
                        self.pos = pos;
                    }
                }
                Err(e.into())
            }
        }
    }

    fn tell(&self) -> u64 {
        self.pos
    }
}

impl<T: Read + Seek> Reader for IoStream<T> {
    /// A failed read consumes nothing: bytes received before the error are given back by
    /// seeking the inner value to where the read began.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (n, res) = read_full(&mut self.inner, buf);
        if let Err(e) = res {
            if n > 0 {
                if let Err(restore) = self.inner.seek(SeekFrom::Start(self.pos)) {
                    warn!("could not rewind {n} bytes after failed read: {restore}");
                    self.pos += n as u64;
                }
            }
            return Err(e.into());
        }
        self.pos += n as u64;
        Ok(n)
    }
}

impl<T: Write + Seek + Truncate> Writer for IoStream<T> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if let Err(e) = self.inner.write_all(buf) {
            if let Ok(pos) = self.inner.stream_position() {
                self.pos = pos;
            }
            return Err(e.into());
        }
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    fn truncate(&mut self) -> Result<()> {
        Ok(self.inner.truncate_to(self.pos)?)
    }
}

/// A [`Reader`] over a source that can only move forward, such as a pipe or a socket.
///
/// Forward seeks read and discard the skipped bytes. Seeking relative to the end drains the
/// source. Any seek that would move backward fails with [`Error::SeekBackward`]; wrap this in a
/// [`BufferedReader`](crate::BufferedReader) to allow backward seeks within its window.
#[derive(Debug)]
pub struct ForwardReader<R> {
    inner: R,
    pos: u64,
    /// Bytes received by a read that then failed. They come before anything still in `inner`.
    pending: Vec<u8>,
}

impl<R: Read> ForwardReader<R> {
    /// Constructor. The current point of `inner` is treated as offset 0.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pos: 0,
            pending: Vec::new(),
        }
    }

    /// Accesses the inner source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Extracts the inner source. Bytes held back from a failed read are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Skips up to `len` bytes, stopping early at end of stream. Skipped bytes count towards the
    /// position even if a later read fails.
    fn discard(&mut self, len: u64) -> Result<()> {
        let k = len.min(self.pending.len() as u64) as usize;
        self.pending.drain(..k);
        self.pos += k as u64;

        let mut left = len - k as u64;
        let mut scratch = [0u8; 4096];
        while left > 0 {
            let want = left.min(scratch.len() as u64) as usize;
            let (n, res) = read_full(&mut self.inner, &mut scratch[..want]);
            self.pos += n as u64;
            left -= n as u64;
            res?;
            if n < want {
                break;
            }
        }
        Ok(())
    }
}

impl<R: Read> Stream for ForwardReader<R> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        if whence == Whence::End {
            self.discard(u64::MAX)?;
        }
        // Past the end of the source is clamped by `discard` running out of data.
        let target = seek_target(self.pos, self.pos, offset, whence);
        if target < self.pos {
            return Err(Error::SeekBackward {
                from: self.pos,
                to: target,
            });
        }
        self.discard(target - self.pos)?;
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn can_seek_backward(&self) -> bool {
        false
    }
}

impl<R: Read> Reader for ForwardReader<R> {
    /// A failed read consumes nothing. Bytes received before the error are held back and
    /// returned by the next read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let k = self.pending.len().min(buf.len());
        buf[..k].copy_from_slice(&self.pending[..k]);
        let (n, res) = read_full(&mut self.inner, &mut buf[k..]);
        if let Err(e) = res {
            // `n` is nonzero only if all of `pending` was copied out.
            self.pending.extend_from_slice(&buf[k..k + n]);
            return Err(e.into());
        }
        self.pending.drain(..k);
        self.pos += (k + n) as u64;
        Ok(k + n)
    }
}
