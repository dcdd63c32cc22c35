// The field iterator: drives the scanner, owns the quoting context.
//
// The scanner has no notion of quoted/unquoted; it only locates candidate
// bytes. This state machine classifies each reported position, and calls
// `skip_next_special` whenever it consumes a candidate the scanner already
// has cached (the second quote of a doubled escape, the terminator after a
// closing quote). Skipping instead of rescanning keeps every candidate
// reported exactly once.
//
// All offsets below are absolute positions in the source buffer. A refill
// may slide the live window to the front of the buffer; the window start
// drops by `shift` and every local offset drops with it. The scanner cache
// is always empty at that point (refill only happens once it has run dry),
// so cached positions never need adjusting.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::dialect::{Dialect, Rfc4180};
use crate::error::Error;
use crate::source::{ByteSource, ReadSource, Refill, SliceSource};

use super::field::Field;
use super::scanner::Scanner;

/// Streaming CSV field iterator.
///
/// Yields one [`Field`] per [`FieldIter::next`] call, borrowed from the
/// source's buffer: valid until the next call, or indefinitely (by index)
/// for an in-memory source. A single field must fit in the buffer; when it
/// cannot, `next` fails with [`Error::FieldTooLong`].
pub struct FieldIter<S, D: Dialect = Rfc4180> {
    src: S,
    scanner: Scanner<D>,
    /// Accumulates while parsing the current quoted field.
    needs_unescape: bool,
}

/// What a refill attempt produced.
enum Refilled {
    /// New bytes may be available; the live window slid down by `shift`.
    Data { shift: usize },
    /// Source exhausted with buffered bytes remaining.
    EofData,
    /// Source exhausted and the window is empty.
    EofEmpty,
    /// The window fills the whole buffer and the source has more data:
    /// the current field cannot fit.
    TooLong,
}

impl<S: ByteSource, D: Dialect> FieldIter<S, D> {
    /// Wrap an existing byte source.
    pub fn new(src: S) -> Self {
        let () = D::DISTINCT;
        FieldIter {
            src,
            scanner: Scanner::new(),
            needs_unescape: false,
        }
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.src
    }

    /// Consume the iterator, handing the source back.
    pub fn into_source(self) -> S {
        self.src
    }

    /// Yield the next field.
    ///
    /// On entry `seek` points at the first byte of the field; on a
    /// successful return it points past the field's terminator.
    /// `Err(EndOfInput)` is the normal end of iteration. `InvalidQuotes`
    /// and `FieldTooLong` are fatal for this instance.
    pub fn next(&mut self) -> Result<Field<'_>, Error> {
        self.needs_unescape = false;

        let mut search = self.src.seek();
        loop {
            let end = self.src.end();
            match self.scanner.next_special(&self.src.buffer()[..end], search) {
                Some(pos) if self.src.buffer()[pos] == D::QUOTE => {
                    if pos != self.src.seek() {
                        // A quote may only open a field.
                        return Err(Error::InvalidQuotes);
                    }
                    self.src.toss(1);
                    return self.next_quoted();
                }
                Some(pos) => {
                    // Delimiter or newline terminates the unquoted field.
                    let start = self.src.seek();
                    let last = self.src.buffer()[pos] == b'\n';
                    let mut data_end = pos;
                    if last && pos > start && self.src.buffer()[pos - 1] == b'\r' {
                        data_end = pos - 1;
                    }
                    self.src.toss(pos + 1 - start);
                    let buf = self.src.buffer_mut();
                    return Ok(Field::new(&mut buf[start..data_end], last, false, D::QUOTE));
                }
                None => {
                    let boundary = end;
                    match self.refill()? {
                        Refilled::Data { shift } => search = boundary - shift,
                        Refilled::EofData => return self.finish_unquoted_at_eof(),
                        Refilled::EofEmpty => return Err(Error::EndOfInput),
                        Refilled::TooLong => return Err(Error::FieldTooLong),
                    }
                }
            }
        }
    }

    /// Quoted-field sub-machine. `seek` sits just past the opening quote
    /// and stays pinned there (nothing is tossed mid-field), so the
    /// content start survives window compaction by tracking the shift.
    fn next_quoted(&mut self) -> Result<Field<'_>, Error> {
        let mut start = self.src.seek();
        let mut search = start;
        // Pending quote: a closer-or-escape candidate whose follower was
        // not yet buffered, re-examined after the refill.
        let mut pending: Option<usize> = None;

        loop {
            let end = self.src.end();

            let pos = match pending.take() {
                Some(p) => p,
                None => {
                    match self.scanner.next_special(&self.src.buffer()[..end], search) {
                        Some(p) if self.src.buffer()[p] != D::QUOTE => {
                            // Embedded delimiter or newline: legal content.
                            search = p + 1;
                            continue;
                        }
                        Some(p) => p,
                        None => {
                            let boundary = end;
                            match self.refill()? {
                                Refilled::Data { shift } => {
                                    start -= shift;
                                    search = boundary - shift;
                                    continue;
                                }
                                Refilled::EofData => {
                                    return self.finish_quoted_at_eof(start);
                                }
                                Refilled::EofEmpty => return Err(Error::InvalidQuotes),
                                Refilled::TooLong => return Err(Error::FieldTooLong),
                            }
                        }
                    }
                }
            };

            // `pos` is a quote. Classify it by its follower.
            if pos + 1 == end {
                match self.refill()? {
                    Refilled::Data { shift } => {
                        start -= shift;
                        pending = Some(pos - shift);
                    }
                    Refilled::EofData => return self.finish_quoted_at_eof(start),
                    Refilled::EofEmpty => return Err(Error::InvalidQuotes),
                    Refilled::TooLong => return Err(Error::FieldTooLong),
                }
                continue;
            }

            let follower = self.src.buffer()[pos + 1];
            if follower == D::QUOTE {
                // Doubled-quote escape: both bytes are consumed here, so
                // the scanner must forget the second one.
                self.needs_unescape = true;
                self.scanner.skip_next_special();
                search = pos + 2;
            } else if follower == D::DELIM {
                self.scanner.skip_next_special();
                return self.yield_quoted(start, pos, pos + 2, false);
            } else if follower == b'\n' {
                self.scanner.skip_next_special();
                return self.yield_quoted(start, pos, pos + 2, true);
            } else if follower == b'\r' {
                if pos + 2 == end {
                    // The byte after \r is not buffered yet; defer like
                    // the pending-quote case.
                    match self.refill()? {
                        Refilled::Data { shift } => {
                            start -= shift;
                            pending = Some(pos - shift);
                        }
                        Refilled::EofData => return self.finish_quoted_at_eof(start),
                        Refilled::EofEmpty => return Err(Error::InvalidQuotes),
                        Refilled::TooLong => return Err(Error::FieldTooLong),
                    }
                    continue;
                }
                if self.src.buffer()[pos + 2] == b'\n' {
                    // Consume the \n the scanner may have cached.
                    self.scanner.skip_next_special();
                    return self.yield_quoted(start, pos, pos + 3, true);
                }
                return Err(Error::InvalidQuotes);
            } else {
                // Anything else after a closing quote is malformed.
                return Err(Error::InvalidQuotes);
            }
        }
    }

    /// Yield a quoted field: content is `buffer[start..content_end]`, the
    /// terminator runs through `consume_to`.
    fn yield_quoted(
        &mut self,
        start: usize,
        content_end: usize,
        consume_to: usize,
        last: bool,
    ) -> Result<Field<'_>, Error> {
        self.src.toss(consume_to - start);
        let needs = self.needs_unescape;
        let buf = self.src.buffer_mut();
        Ok(Field::new(&mut buf[start..content_end], last, needs, D::QUOTE))
    }

    /// End of stream mid-unquoted-field: the remainder is the final field.
    fn finish_unquoted_at_eof(&mut self) -> Result<Field<'_>, Error> {
        let start = self.src.seek();
        let end = self.src.end();
        self.src.toss(end - start);
        let buf = self.src.buffer_mut();
        Ok(Field::new(&mut buf[start..end], true, false, D::QUOTE))
    }

    /// End of stream mid-quoted-field. The remainder is a valid final
    /// field only if, after stripping an optional trailing `\r\n` or
    /// `\n`, it ends with the closing quote; otherwise the quoted field
    /// is unterminated.
    fn finish_quoted_at_eof(&mut self, start: usize) -> Result<Field<'_>, Error> {
        let end = self.src.end();
        let buf = self.src.buffer();
        let mut content_end = end;
        if content_end > start && buf[content_end - 1] == b'\n' {
            content_end -= 1;
            if content_end > start && buf[content_end - 1] == b'\r' {
                content_end -= 1;
            }
        }
        if content_end > start && buf[content_end - 1] == D::QUOTE {
            let data_end = content_end - 1;
            self.src.toss(end - start);
            let needs = self.needs_unescape;
            let buf = self.src.buffer_mut();
            Ok(Field::new(&mut buf[start..data_end], true, needs, D::QUOTE))
        } else {
            Err(Error::InvalidQuotes)
        }
    }

    /// One refill step. With tail space available this is a plain read
    /// (the source may first slide the window down, reported as `shift`).
    /// With the window filling the whole buffer, one probing read
    /// distinguishes an unterminated final field from a field that cannot
    /// fit.
    fn refill(&mut self) -> Result<Refilled, Error> {
        let free = self.src.capacity() - (self.src.end() - self.src.seek());
        let before = self.src.seek();
        if free > 0 {
            match self.src.fill_more()? {
                Refill::Data => {
                    let shift = before - self.src.seek();
                    self.scanner.reset();
                    Ok(Refilled::Data { shift })
                }
                Refill::Eof => {
                    if self.src.seek() == self.src.end() {
                        Ok(Refilled::EofEmpty)
                    } else {
                        Ok(Refilled::EofData)
                    }
                }
            }
        } else {
            match self.src.fill_more()? {
                Refill::Eof => {
                    // "Full" and "empty" coincide for a zero-capacity
                    // buffer; only a non-empty window is a final field.
                    if self.src.seek() == self.src.end() {
                        Ok(Refilled::EofEmpty)
                    } else {
                        Ok(Refilled::EofData)
                    }
                }
                Refill::Data => Ok(Refilled::TooLong),
            }
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, D: Dialect> FieldIter<SliceSource<B>, D> {
    /// Parse bytes already in memory; the slice is the buffer. Calling
    /// [`Field::unescaped`] rewrites escape pairs inside it.
    pub fn from_slice(buf: B) -> Self {
        Self::new(SliceSource::new(buf))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, R: Read, D: Dialect> FieldIter<ReadSource<B, R>, D> {
    /// Parse from any reader with a caller-supplied buffer. Pass an owned
    /// `File` to adopt it, `&mut File` to borrow an open handle, or any
    /// custom reader.
    pub fn from_reader(reader: R, buf: B) -> Self {
        Self::new(ReadSource::new(reader, buf))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, D: Dialect> FieldIter<ReadSource<B, File>, D> {
    /// Open `path` and parse it; the file closes when the iterator drops.
    pub fn from_path(path: impl AsRef<Path>, buf: B) -> io::Result<Self> {
        Ok(Self::new(ReadSource::open(path, buf)?))
    }
}
