use core::mem::size_of;

use zerocopy::{FromZeros, IntoBytes};

use crate::pod::{Endian, FixedEndian, Pod};
use crate::{Error, Result};

/// First chunk size used by [`Reader::read_to_end`] on streams that cannot seek backward.
const READ_TO_END_CHUNK: usize = 4096;

/// Reference point for a seek offset.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Whence {
    /// Offset is relative to the start of the stream.
    Start,
    /// Offset is relative to the current position.
    Current,
    /// Offset is relative to the end of the stream.
    End,
}

/// Resolves `offset`/`whence` into an absolute position. Negative results clamp to 0. Clamping to
/// the end of the stream is left to the caller, since growable sinks may go past it.
pub(crate) fn seek_target(pos: u64, len: u64, offset: i64, whence: Whence) -> u64 {
    let base = match whence {
        Whence::Start => 0,
        Whence::Current => pos as i128,
        Whence::End => len as i128,
    };
    (base + offset as i128).clamp(0, u64::MAX as i128) as u64
}

/// Converts an absolute position into a seek offset.
pub(crate) fn to_offset(pos: u64) -> i64 {
    i64::try_from(pos).unwrap_or(i64::MAX)
}

/// A positioned byte stream: the part of the contract shared by readers and writers.
pub trait Stream {
    /// Moves to `offset` relative to `whence` and returns the resulting absolute position.
    ///
    /// The result is clamped to the valid range of the stream: negative targets become 0 and
    /// targets past the end become the end (growable sinks may allow positions past the end).
    /// A stream that cannot move backward returns [`Error::SeekBackward`] instead of clamping.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64>;

    /// Returns the current position. Never performs I/O.
    fn tell(&self) -> u64;

    /// Indicates whether this stream can seek to a position before its current one.
    fn can_seek_backward(&self) -> bool {
        true
    }
}

/// A source of bytes, with typed reads built on top of [`Reader::read`].
///
/// Typed reads come in two flavors. `read_*` methods require a complete value and report
/// [`Error::EndOfStream`] if the stream ends first. `try_read_*` methods return `Ok(None)` in
/// that case. In both cases the bytes that were available have been consumed.
pub trait Reader: Stream {
    /// Copies up to `buf.len()` bytes into `buf` and advances the position by the number copied.
    ///
    /// A count smaller than `buf.len()` (including zero) means the end of the stream was reached
    /// during this call. Any other failure is returned as an error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reads a value in host byte order, or `None` if the stream ends first.
    fn try_read_raw<T: Pod>(&mut self) -> Result<Option<T>> {
        let mut value = T::new_zeroed();
        let n = self.read(value.as_mut_bytes())?;
        Ok((n == size_of::<T>()).then_some(value))
    }

    /// Reads a value in host byte order.
    fn read_raw<T: Pod>(&mut self) -> Result<T> {
        self.try_read_raw()?.ok_or(Error::EndOfStream)
    }

    /// Reads a value stored in its single fixed byte order, or `None` if the stream ends first.
    fn try_read_fixed<T: FixedEndian>(&mut self) -> Result<Option<T>> {
        Ok(self.try_read_raw::<T>()?.map(T::from_disk))
    }

    /// Reads a value stored in its single fixed byte order.
    fn read_fixed<T: FixedEndian>(&mut self) -> Result<T> {
        self.try_read_fixed()?.ok_or(Error::EndOfStream)
    }

    /// Reads a little-endian value, or `None` if the stream ends first.
    fn try_read_le<T: Endian>(&mut self) -> Result<Option<T>> {
        Ok(self.try_read_raw::<T>()?.map(T::from_le_disk))
    }

    /// Reads a little-endian value.
    fn read_le<T: Endian>(&mut self) -> Result<T> {
        self.try_read_le()?.ok_or(Error::EndOfStream)
    }

    /// Reads a big-endian value, or `None` if the stream ends first.
    fn try_read_be<T: Endian>(&mut self) -> Result<Option<T>> {
        Ok(self.try_read_raw::<T>()?.map(T::from_be_disk))
    }

    /// Reads a big-endian value.
    fn read_be<T: Endian>(&mut self) -> Result<T> {
        self.try_read_be()?.ok_or(Error::EndOfStream)
    }

    /// Reads exactly `len` bytes, or `None` if the stream ends first.
    fn try_read_exact(&mut self, len: usize) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; len];
        let n = self.read(&mut buf)?;
        Ok((n == len).then_some(buf))
    }

    /// Reads exactly `len` bytes.
    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        self.try_read_exact(len)?.ok_or(Error::EndOfStream)
    }

    /// Reads up to `len` bytes. Returns fewer only if the stream ends.
    fn read_at_most(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Reads everything from the current position to the end of the stream.
    ///
    /// If the stream can seek backward, its remaining length is measured first and the data is
    /// read with a single call. Otherwise the data is read in chunks that start at 4 KiB and
    /// double in size until one comes back short.
    fn read_to_end(&mut self) -> Result<Vec<u8>> {
        if self.can_seek_backward() {
            let pos = self.tell();
            let end = self.seek(0, Whence::End)?;
            self.seek(to_offset(pos), Whence::Start)?;
            let len = usize::try_from(end.saturating_sub(pos))
                .map_err(|_| std::io::Error::other("stream is too large to read into memory"))?;
            return self.read_at_most(len);
        }

        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut size = READ_TO_END_CHUNK;
        loop {
            let chunk = self.read_at_most(size)?;
            let short = chunk.len() < size;
            chunks.push(chunk);
            if short {
                break;
            }
            size = size.saturating_mul(2);
        }
        Ok(chunks.concat())
    }

    /// Reads bytes until `delim` is found or the stream ends.
    ///
    /// The returned bytes include `delim` if it was found. If the stream ended first, everything
    /// that was read is returned without a delimiter.
    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while self.read(&mut byte)? == 1 {
            out.push(byte[0]);
            if byte[0] == delim {
                break;
            }
        }
        Ok(out)
    }

    /// Reads bytes until `delim` and decodes them as UTF-8.
    ///
    /// The delimiter is part of the returned string only if `include_delim` is set. Returns
    /// [`Error::InvalidUtf8`] if the bytes are not well-formed UTF-8.
    fn read_str_until(&mut self, delim: u8, include_delim: bool) -> Result<String> {
        let bytes = trim_delim(self.read_until(delim)?, delim, include_delim);
        Ok(String::from_utf8(bytes)?)
    }

    /// Reads bytes until `delim` and decodes them as UTF-8, replacing ill-formed sequences with
    /// the Unicode replacement character.
    fn read_string_lossy_until(&mut self, delim: u8, include_delim: bool) -> Result<String> {
        let bytes = trim_delim(self.read_until(delim)?, delim, include_delim);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads a NUL-terminated UTF-8 string. The terminator is consumed but not returned.
    fn read_null_terminated_str(&mut self) -> Result<String> {
        self.read_str_until(0, false)
    }

    /// Reads bytes until `delim` (inclusive, if found) as a `bstr::BString`, without validating
    /// them as UTF-8.
    #[cfg(feature = "bstr")]
    fn read_bstring_until(&mut self, delim: u8) -> Result<bstr::BString> {
        Ok(bstr::BString::from(self.read_until(delim)?))
    }
}

fn trim_delim(mut bytes: Vec<u8>, delim: u8, include_delim: bool) -> Vec<u8> {
    if !include_delim && bytes.last() == Some(&delim) {
        bytes.pop();
    }
    bytes
}

impl<S: Stream + ?Sized> Stream for &mut S {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        (**self).seek(offset, whence)
    }

    fn tell(&self) -> u64 {
        (**self).tell()
    }

    fn can_seek_backward(&self) -> bool {
        (**self).can_seek_backward()
    }
}

impl<R: Reader + ?Sized> Reader for &mut R {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>> {
        (**self).read_until(delim)
    }
}
