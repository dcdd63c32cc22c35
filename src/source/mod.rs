// Byte sources feeding the field iterator.
//
// A source is a byte buffer plus two cursors, `seek` and `end`; the live
// window is `buffer[seek..end]`. The iterator owns the source's cursors for
// its lifetime and parses fields directly out of the buffer. The buffer
// itself belongs to the caller (or, for the FFI constructors, to the boxed
// parser) and must outlive the iterator.

use std::io;

pub mod read;
pub mod slice;

pub use read::ReadSource;
pub use slice::SliceSource;

/// Outcome of a `fill_more` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refill {
    /// The underlying stream has more data. The window may have grown by
    /// zero bytes: on a full buffer this is the probe answer "more data
    /// exists", which the iterator turns into `FieldTooLong`.
    Data,
    /// The underlying stream is exhausted.
    Eof,
}

/// A buffered byte source.
///
/// Invariant: `seek <= end <= capacity`.
pub trait ByteSource {
    /// Start of the live window.
    fn seek(&self) -> usize;

    /// End of the live window.
    fn end(&self) -> usize;

    /// The whole buffer.
    fn buffer(&self) -> &[u8];

    /// The whole buffer, writable. In-place unescape goes through here.
    fn buffer_mut(&mut self) -> &mut [u8];

    /// Read more bytes into `buffer[end..]`, advancing `end`.
    ///
    /// Implementations may first slide the live window to the front of the
    /// buffer to regain tail space; `seek` and `end` both drop by the same
    /// amount when that happens. A call may advance zero bytes and still
    /// report `Data`.
    fn fill_more(&mut self) -> io::Result<Refill>;

    /// Advance `seek` by `n`, consuming the front of the live window.
    fn toss(&mut self, n: usize);

    /// Total buffer size.
    fn capacity(&self) -> usize {
        self.buffer().len()
    }

    /// The live window, `buffer[seek..end]`.
    fn buffered(&self) -> &[u8] {
        &self.buffer()[self.seek()..self.end()]
    }
}
