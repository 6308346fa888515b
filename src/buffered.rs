//! A window-buffered [`Reader`] adapter.
//!
//! [`BufferedReader`] keeps a window of the underlying stream in memory and services reads,
//! local seeks and delimiter scans from it. The underlying reader is only called when a request
//! leaves the window. The adapter presents exactly the same read/seek/tell contract as the
//! reader it wraps.
//!
//! The adapter owns the underlying reader. While it is in use, the underlying reader's position
//! is the end of the window, not the logical position reported by [`Stream::tell`].

use log::{debug, trace};

use crate::reader::{Reader, Stream, Whence};
use crate::Result;

/// Window capacity used by [`BufferedReader::new`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// Buffers reads from an underlying [`Reader`].
///
/// A logical read costs no underlying call when it is satisfied by the window, and at most two
/// otherwise. Seeks that land inside the window (including backward seeks on streams that cannot
/// seek backward) only move a cursor.
///
/// ```
/// use seekbuf_io::{BufferedReader, Reader, SliceReader, Stream, Whence};
///
/// let data: Vec<u8> = (0..=255).collect();
/// let mut r = BufferedReader::with_capacity(SliceReader::new(&data), 16)?;
///
/// assert_eq!(r.read_be::<u16>()?, 0x0001);
/// r.seek(-1, Whence::Current)?;
/// assert_eq!(r.read_le::<u32>()?, 0x04030201);
/// r.seek(200, Whence::Start)?;
/// assert_eq!(r.read_at_most(100)?.len(), 56);
/// # Ok::<(), seekbuf_io::Error>(())
/// ```
pub struct BufferedReader<R> {
    inner: R,
    /// Offset in `inner` of `window[0]`.
    window_start: u64,
    /// Next unread byte in `window`. Always `<= window.len()`.
    index: usize,
    capacity: usize,
    /// Shorter than `capacity` only when the stream ended inside it (or when stale). May be
    /// longer after a failed `read_until` puts its scanned bytes back.
    window: Vec<u8>,
    /// Refills read into this buffer and are swapped in only on success.
    spare: Vec<u8>,
    /// A reload failed after `inner` had moved. The window is empty but the stream has not
    /// necessarily ended; the next operation retries the reload.
    stale: bool,
}

impl<R: Reader> BufferedReader<R> {
    /// Wraps `inner` with a window of [`DEFAULT_CAPACITY`] bytes.
    pub fn new(inner: R) -> Result<Self> {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// Wraps `inner` with a window of `capacity` bytes (at least 1).
    ///
    /// The window is filled immediately, starting at the current position of `inner`.
    pub fn with_capacity(inner: R, capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut this = Self {
            window_start: inner.tell(),
            inner,
            index: 0,
            capacity,
            window: Vec::with_capacity(capacity),
            spare: vec![0; capacity],
            stale: false,
        };
        this.refill()?;
        Ok(this)
    }

    /// The target size of the window.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The unread part of the window.
    pub fn buffer(&self) -> &[u8] {
        &self.window[self.index..]
    }

    /// Accesses the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Extracts the underlying reader.
    ///
    /// The returned reader is positioned at the end of the window, which is generally past the
    /// logical position of this adapter. Any unread buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Replaces the window with the next `capacity` bytes of `inner`, read from its current
    /// position. On error, no field is modified.
    fn refill(&mut self) -> Result<()> {
        let start = self.inner.tell();
        self.spare.resize(self.capacity, 0);
        let n = self.inner.read(&mut self.spare)?;
        self.spare.truncate(n);
        core::mem::swap(&mut self.window, &mut self.spare);
        self.window_start = start;
        self.index = 0;
        self.stale = false;
        trace!("window reloaded at offset {start}: {n} of {} bytes", self.capacity);
        Ok(())
    }

    /// Like [`Self::refill`], for use after `inner` has been moved independently of the window.
    /// If the refill fails, the window is emptied at the position of `inner` so that `tell` stays
    /// accurate, and marked stale so the refill is retried.
    fn reload(&mut self) -> Result<()> {
        self.refill().inspect_err(|_| {
            self.window.clear();
            self.index = 0;
            self.window_start = self.inner.tell();
            self.stale = true;
        })
    }

    /// Retries a reload that failed earlier.
    fn recover(&mut self) -> Result<()> {
        if self.stale {
            self.refill()?;
        }
        Ok(())
    }

    fn window_end(&self) -> u64 {
        self.window_start + self.window.len() as u64
    }
}

impl<R: Reader> Stream for BufferedReader<R> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let pos = self.tell();
        let target = match whence {
            Whence::Start => Some(offset.max(0) as u64),
            Whence::Current => Some((pos as i128 + offset as i128).max(0) as u64),
            // A short window ends where the stream does.
            Whence::End if self.window.len() < self.capacity && !self.stale => {
                let end = self.window_end() as i128;
                Some((end + offset as i128).clamp(0, end) as u64)
            }
            // Otherwise the length of the stream is only known to `inner`.
            Whence::End => None,
        };

        // A stale window goes through `inner` so that it gets reloaded.
        if let Some(target) = target.filter(|_| !self.stale) {
            if (self.window_start..=self.window_end()).contains(&target) {
                self.index = (target - self.window_start) as usize;
                return Ok(target);
            }
        }

        // `inner` sits at the end of the window, not at the logical position.
        let (inner_offset, inner_whence) = match whence {
            Whence::Current => {
                let skew = (self.window.len() - self.index) as i64;
                (offset.saturating_sub(skew), Whence::Current)
            }
            other => (offset, other),
        };
        trace!("seek outside window: {offset} from {whence:?} at logical offset {pos}");
        self.inner.seek(inner_offset, inner_whence)?;
        self.reload()?;
        Ok(self.tell())
    }

    fn tell(&self) -> u64 {
        self.window_start + self.index as u64
    }

    fn can_seek_backward(&self) -> bool {
        self.inner.can_seek_backward()
    }
}

impl<R: Reader> Reader for BufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.recover()?;
        if self.window.is_empty() {
            return Ok(0);
        }

        let available = self.window.len() - self.index;
        if buf.len() <= available || self.window.len() < self.capacity {
            let n = buf.len().min(available);
            buf[..n].copy_from_slice(&self.window[self.index..self.index + n]);
            self.index += n;
            return Ok(n);
        }

        // The request runs past a full window, so the stream may continue beyond it.
        let (head, rest) = buf.split_at_mut(available);
        head.copy_from_slice(&self.window[self.index..]);

        if rest.len() >= self.capacity {
            trace!("bypassing window for {} byte read", rest.len());
            let n = self.inner.read(rest)?;
            // The bytes are delivered either way; a failed reload is retried by the next call.
            if let Err(e) = self.reload() {
                debug!("window reload after bypass read failed: {e}");
            }
            return Ok(available + n);
        }

        self.refill()?;
        Ok(available + self.read(rest)?)
    }

    /// Scans the window with `memchr`, refilling it as needed.
    ///
    /// If a refill fails, everything scanned so far is put back into the window, so the position
    /// is unchanged and a retry sees the same bytes.
    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>> {
        self.recover()?;
        let unread = &self.window[self.index..];
        if let Some(i) = memchr::memchr(delim, unread) {
            let found = unread[..=i].to_vec();
            self.index += i + 1;
            return Ok(found);
        }
        if self.window.len() < self.capacity {
            let rest = unread.to_vec();
            self.index = self.window.len();
            return Ok(rest);
        }

        // Accumulate whole windows, so that a failed refill can restore a full one.
        let scan_start = self.window_start;
        let head = self.index;
        let mut out = core::mem::take(&mut self.window);
        loop {
            if let Err(e) = self.refill() {
                // `out` holds exactly the bytes from `scan_start` up to the position of `inner`.
                self.window = out;
                self.window_start = scan_start;
                self.index = head;
                return Err(e);
            }
            match memchr::memchr(delim, &self.window) {
                Some(i) => {
                    out.extend_from_slice(&self.window[..=i]);
                    self.index = i + 1;
                    break;
                }
                None => {
                    out.extend_from_slice(&self.window);
                    if self.window.len() < self.capacity {
                        self.index = self.window.len();
                        break;
                    }
                }
            }
        }
        out.drain(..head);
        Ok(out)
    }
}
