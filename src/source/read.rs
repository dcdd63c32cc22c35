// Source backed by any `io::Read`.
//
// Covers three of the boundary constructors: an owned `File` (from a
// path), a borrowed `&mut File` (caller keeps the handle open), and any
// custom reader (the user-callback shape). The buffer is supplied by the
// caller; `B` is `&mut [u8]` for the borrowed case and `Vec<u8>` for the
// FFI constructors that allocate.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::{debug, trace};

use super::{ByteSource, Refill};

/// A `ByteSource` that refills from an `io::Read`.
pub struct ReadSource<B, R> {
    buf: B,
    seek: usize,
    end: usize,
    reader: R,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, R: Read> ReadSource<B, R> {
    /// Wrap a reader with a caller-supplied buffer. The buffer starts
    /// empty; the first `fill_more` performs the first read.
    pub fn new(reader: R, buf: B) -> Self {
        ReadSource {
            buf,
            seek: 0,
            end: 0,
            reader,
        }
    }

    /// Consume the source, handing the reader back.
    pub fn into_reader(self) -> R {
        self.reader
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> ReadSource<B, File> {
    /// Open `path` for reading and adopt the file; it closes when the
    /// source (or the iterator owning it) is dropped.
    pub fn open(path: impl AsRef<Path>, buf: B) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(
            "opened {} for csv parsing, buffer capacity {}",
            path.display(),
            buf.as_ref().len()
        );
        Ok(Self::new(file, buf))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, R: Read> ByteSource for ReadSource<B, R> {
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
        let cap = self.buf.as_ref().len();

        // Regain tail space by sliding the live window to the front.
        if self.end == cap && self.seek > 0 {
            trace!("compacting window: dropping {} consumed bytes", self.seek);
            self.buf.as_mut().copy_within(self.seek..self.end, 0);
            self.end -= self.seek;
            self.seek = 0;
        }

        if self.end < cap {
            let n = self.reader.read(&mut self.buf.as_mut()[self.end..])?;
            if n == 0 {
                return Ok(Refill::Eof);
            }
            self.end += n;
            return Ok(Refill::Data);
        }

        // Window fills the whole buffer: probe for end-of-stream. A probed
        // byte is only lost on the `Data` answer, which the iterator turns
        // into the fatal FieldTooLong.
        let mut scratch = [0u8; 1];
        let n = self.reader.read(&mut scratch)?;
        if n == 0 {
            Ok(Refill::Eof)
        } else {
            Ok(Refill::Data)
        }
    }

    fn toss(&mut self, n: usize) {
        debug_assert!(self.seek + n <= self.end);
        self.seek += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_advances_end() {
        let mut buf = [0u8; 8];
        let mut src = ReadSource::new(&b"abcdef"[..], &mut buf[..]);
        assert_eq!(src.buffered(), b"");
        assert_eq!(src.fill_more().unwrap(), Refill::Data);
        assert_eq!(src.buffered(), b"abcdef");
        assert_eq!(src.fill_more().unwrap(), Refill::Eof);
    }

    #[test]
    fn test_compaction_preserves_live_window() {
        let mut buf = [0u8; 4];
        let mut src = ReadSource::new(&b"abcdXY"[..], &mut buf[..]);
        src.fill_more().unwrap();
        assert_eq!(src.buffered(), b"abcd");
        src.toss(2);
        // Buffer is full but two bytes are consumed: refill compacts.
        assert_eq!(src.fill_more().unwrap(), Refill::Data);
        assert_eq!(src.seek(), 0);
        assert_eq!(src.buffered(), b"cdXY");
    }

    #[test]
    fn test_full_window_probe() {
        let mut buf = [0u8; 2];
        let mut src = ReadSource::new(&b"abc"[..], &mut buf[..]);
        src.fill_more().unwrap();
        assert_eq!(src.buffered(), b"ab");
        // seek == 0 and the buffer is full: the probe reports more data
        // without growing the window.
        assert_eq!(src.fill_more().unwrap(), Refill::Data);
        assert_eq!(src.buffered(), b"ab");
    }

    #[test]
    fn test_full_window_probe_at_eof() {
        let mut buf = [0u8; 3];
        let mut src = ReadSource::new(&b"abc"[..], &mut buf[..]);
        src.fill_more().unwrap();
        assert_eq!(src.buffered(), b"abc");
        assert_eq!(src.fill_more().unwrap(), Refill::Eof);
    }
}
