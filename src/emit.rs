// Write-side counterpart: columns in, RFC 4180 bytes out.
//
// Separator discipline: the line ending is written *before* each row's
// first column (except the very first row), never after the last one, so
// emitted output carries no trailing line ending.

use std::io::{self, Write};
use std::marker::PhantomData;

use memchr::memchr;

use crate::core::scanner::contains_special;
use crate::dialect::{Dialect, Rfc4180};

/// Row terminator written between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    fn bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

/// CSV emitter over any byte sink.
pub struct Emitter<W, D: Dialect = Rfc4180> {
    out: W,
    at_row_start: bool,
    first_row: bool,
    line_ending: LineEnding,
    _dialect: PhantomData<D>,
}

impl<W: Write, D: Dialect> Emitter<W, D> {
    pub fn new(out: W) -> Self {
        let () = D::DISTINCT;
        Emitter {
            out,
            at_row_start: true,
            first_row: true,
            line_ending: LineEnding::Lf,
            _dialect: PhantomData,
        }
    }

    /// Select the row terminator. `Lf` is the default.
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Emit one column, quoting it when necessary: the safe default.
    ///
    /// The column is scanned for the dialect's candidate bytes with the
    /// same vector scan the parser uses (short inputs fall through to the
    /// table scan); a hit routes through [`Emitter::emit_quoted`].
    pub fn emit(&mut self, column: &[u8]) -> io::Result<()> {
        if contains_special::<D>(column) {
            self.emit_quoted(column)
        } else {
            self.emit_unquoted(column)
        }
    }

    /// Emit a column wrapped in quotes, doubling every interior quote.
    pub fn emit_quoted(&mut self, column: &[u8]) -> io::Result<()> {
        self.emit_delim()?;
        self.out.write_all(&[D::QUOTE])?;
        let mut from = 0;
        while let Some(off) = memchr(D::QUOTE, &column[from..]) {
            let q = from + off;
            self.out.write_all(&column[from..=q])?;
            self.out.write_all(&[D::QUOTE])?;
            from = q + 1;
        }
        self.out.write_all(&column[from..])?;
        self.out.write_all(&[D::QUOTE])
    }

    /// Emit a column wrapped in quotes, writing the bytes verbatim. The
    /// caller guarantees interior quotes are already doubled.
    pub fn emit_quoted_assume_escaped(&mut self, column: &[u8]) -> io::Result<()> {
        self.emit_delim()?;
        self.out.write_all(&[D::QUOTE])?;
        self.out.write_all(column)?;
        self.out.write_all(&[D::QUOTE])
    }

    /// Emit a column verbatim, unquoted. The caller guarantees it holds
    /// no quote, delimiter or newline bytes.
    pub fn emit_unquoted(&mut self, column: &[u8]) -> io::Result<()> {
        self.emit_delim()?;
        self.out.write_all(column)
    }

    /// End the current row; the next emitted column starts a new one.
    pub fn next_row(&mut self) {
        self.at_row_start = true;
    }

    /// What goes before a column: nothing for the very first column of
    /// the output, the line ending for a row's first column, a delimiter
    /// otherwise.
    fn emit_delim(&mut self) -> io::Result<()> {
        if self.at_row_start {
            self.at_row_start = false;
            if self.first_row {
                self.first_row = false;
                Ok(())
            } else {
                self.out.write_all(self.line_ending.bytes())
            }
        } else {
            self.out.write_all(&[D::DELIM])
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consume the emitter, handing the sink back.
    pub fn into_inner(self) -> W {
        self.out
    }
}
