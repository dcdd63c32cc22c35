// In-memory source: the caller's slice *is* the buffer.
//
// Nothing ever moves, so field slices stay index-stable for the life of
// the buffer. The loud caveat: the lazy unescape accessor rewrites bytes
// in place, i.e. parsing with unescaping mutates the caller's data.

use std::io;

use super::{ByteSource, Refill};

/// A `ByteSource` over bytes already in memory.
pub struct SliceSource<B> {
    buf: B,
    seek: usize,
    end: usize,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SliceSource<B> {
    /// Use `buf` as the complete input. The window starts spanning all of
    /// it.
    pub fn new(buf: B) -> Self {
        let end = buf.as_ref().len();
        SliceSource { buf, seek: 0, end }
    }

    /// Hand the buffer back (after in-place unescaping it may contain
    /// shifted field bytes in the already-consumed region).
    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> ByteSource for SliceSource<B> {
    fn seek(&self) -> usize {
        self.seek
    }

    fn end(&self) -> usize {
        self.end
    }

    fn buffer(&self) -> &[u8] {
        self.buf.as_ref()
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    fn fill_more(&mut self) -> io::Result<Refill> {
        Ok(Refill::Eof)
    }

    fn toss(&mut self, n: usize) {
        debug_assert!(self.seek + n <= self.end);
        self.seek += n;
    }
}
