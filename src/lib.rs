//! Typed, endian-aware reads and writes over seekable byte streams.
//!
//! The crate is built around three traits. [`Stream`] is a positioned byte stream that can
//! [`seek`](Stream::seek) and [`tell`](Stream::tell). [`Reader`] and [`Writer`] add the primitive
//! byte transfer plus typed operations on top of it: `read_le::<u32>()`, `write_be(1.5f64)`,
//! delimiter scans, NUL-terminated strings, and so on.
//!
//! Which types can be read and written is decided by the [`pod`] module: fixed-width integers,
//! floats, byte arrays and the `zerocopy::byteorder` wrappers. Platform-sized integers are not
//! supported.
//!
//! [`BufferedReader`] wraps any [`Reader`] with an in-memory window, so that many small reads and
//! local seeks cost no calls to the underlying stream.
//!
//! ```
//! use seekbuf_io::{Reader, SliceReader, VecStream, Writer};
//!
//! let mut w = VecStream::new();
//! w.write_be(0xcafe_u16)?;
//! w.write_le(-2_i32)?;
//! w.write_null_terminated_str("hi")?;
//!
//! let bytes = w.into_inner();
//! let mut r = SliceReader::new(&bytes);
//! assert_eq!(r.read_be::<u16>()?, 0xcafe);
//! assert_eq!(r.read_le::<i32>()?, -2);
//! assert_eq!(r.read_null_terminated_str()?, "hi");
//! assert_eq!(r.try_read_le::<u32>()?, None);
//! # Ok::<(), seekbuf_io::Error>(())
//! ```

#![forbid(unsafe_code)]
#![forbid(unused_must_use)]
#![warn(missing_docs)]

mod buffered;
mod error;
mod memory;
pub mod pod;
mod reader;
mod stdio;
mod writer;


pub use buffered::{BufferedReader, DEFAULT_CAPACITY};
pub use error::{Error, Result};
pub use memory::{SliceReader, VecStream};
pub use pod::{Endian, FixedEndian, Pod};
pub use reader::{Reader, Stream, Whence};
pub use stdio::{ForwardReader, IoStream, Truncate};
pub use writer::Writer;
