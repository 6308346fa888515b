use zerocopy::IntoBytes;

use crate::pod::{Endian, FixedEndian, Pod};
use crate::reader::Stream;
use crate::Result;

/// A sink for bytes, with typed writes built on top of [`Writer::write`].
pub trait Writer: Stream {
    /// Writes all of `buf` at the current position and advances past it.
    ///
    /// Either every byte is accepted or an error is returned; there are no short writes.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Makes all previously written bytes visible to readers of the same sink.
    fn flush(&mut self) -> Result<()>;

    /// Discards everything from the current position to the end of the sink.
    fn truncate(&mut self) -> Result<()>;

    /// Writes `bytes` to the output.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write(bytes)
    }

    /// Writes a value in host byte order.
    fn write_raw<T: Pod>(&mut self, value: &T) -> Result<()> {
        self.write(value.as_bytes())
    }

    /// Writes a value in its single fixed byte order.
    fn write_fixed<T: FixedEndian>(&mut self, value: T) -> Result<()> {
        self.write_raw(&value.to_disk())
    }

    /// Writes a value in little-endian byte order.
    fn write_le<T: Endian>(&mut self, value: T) -> Result<()> {
        self.write_raw(&value.to_le_disk())
    }

    /// Writes a value in big-endian byte order.
    fn write_be<T: Endian>(&mut self, value: T) -> Result<()> {
        self.write_raw(&value.to_be_disk())
    }

    /// Writes the UTF-8 bytes of `s`, with no length prefix or terminator.
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.write(s.as_bytes())
    }

    /// Writes the UTF-8 bytes of `s` followed by a single zero byte.
    ///
    /// This function does not check whether `s` itself contains a zero byte.
    fn write_null_terminated_str(&mut self, s: &str) -> Result<()> {
        self.write(s.as_bytes())?;
        self.write(&[0])
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn truncate(&mut self) -> Result<()> {
        (**self).truncate()
    }
}
