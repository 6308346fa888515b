use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for all stream operations.
///
/// Reaching the end of a stream is not an error for [`Reader::read`](crate::Reader::read); it is
/// reported as a short count. Only the "forced" reads, which must produce a complete value,
/// turn a short count into [`Error::EndOfStream`].
#[derive(Debug, Error)]
pub enum Error {
    /// The stream ended before a complete value or the requested number of bytes could be read.
    #[error("unexpected end of stream")]
    EndOfStream,

    /// The stream cannot move backward, and a seek would have moved it from `from` to `to`.
    #[error("stream cannot seek backward (from offset {from} to {to})")]
    SeekBackward {
        /// Position before the seek.
        from: u64,
        /// Requested position.
        to: u64,
    },

    /// Bytes decoded as a string were not well-formed UTF-8.
    #[error("invalid UTF-8 in string data")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The underlying transport or operating system reported a failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
