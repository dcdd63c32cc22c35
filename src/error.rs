// Error taxonomy for the field iterator.

use std::io;

use thiserror::Error;

/// Everything `FieldIter::next` can fail with.
///
/// `EndOfInput` is the normal terminal signal, not a failure: callers treat
/// it as "end of iteration". `InvalidQuotes` and `FieldTooLong` are fatal
/// for the iterator instance; behaviour of further `next` calls after one
/// of them is unspecified and the iterator should be dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// The source is exhausted and no buffered bytes remain.
    #[error("end of input")]
    EndOfInput,

    /// A single field does not fit in the caller-supplied buffer.
    /// Recovery requires a larger buffer and a fresh iterator.
    #[error("field exceeds buffer capacity")]
    FieldTooLong,

    /// Quoting that deviates from RFC 4180: a bare quote in an unquoted
    /// field, data after a closing quote, or an unterminated quoted field.
    #[error("malformed quoting")]
    InvalidQuotes,

    /// The byte source reported an I/O error. Surfaced verbatim, no retry.
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
}

impl Error {
    /// True for the terminal signal, false for real failures.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Error::EndOfInput)
    }
}
