// The yielded value: one field, borrowed straight out of the source
// buffer.

use std::fmt;
use std::mem;

use super::unescape::unescape_in_place;

/// One CSV field.
///
/// `data()` views the source's buffer; the borrow ends at the next
/// `next()` call on the iterator. For quoted fields the surrounding quotes
/// are already stripped, but doubled-quote escapes are still in the raw
/// form until [`Field::unescaped`] is called.
pub struct Field<'a> {
    data: &'a mut [u8],
    last_column: bool,
    needs_unescape: bool,
    quote: u8,
}

impl<'a> Field<'a> {
    pub(crate) fn new(data: &'a mut [u8], last_column: bool, needs_unescape: bool, quote: u8) -> Self {
        Field {
            data,
            last_column,
            needs_unescape,
            quote,
        }
    }

    /// The field bytes as parsed. Escapes are untouched; check
    /// [`Field::needs_unescape`] or just call [`Field::unescaped`].
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// True iff this field was terminated by a newline, or by end of
    /// stream after at least one byte. Delimits rows unambiguously.
    pub fn is_last_column(&self) -> bool {
        self.last_column
    }

    /// True iff the field was quoted and its interior held at least one
    /// doubled-quote escape.
    pub fn needs_unescape(&self) -> bool {
        self.needs_unescape
    }

    /// The field bytes with escapes collapsed.
    ///
    /// Runs the in-place unescape over the buffer on first call (this
    /// mutates the source buffer - for an in-memory source, the caller's
    /// slice), then remembers the shortened view. Idempotent; free when no
    /// escapes were seen.
    pub fn unescaped(&mut self) -> &[u8] {
        if self.needs_unescape {
            let data = mem::take(&mut self.data);
            let len = unescape_in_place(data, self.quote);
            self.data = &mut data[..len];
            self.needs_unescape = false;
        }
        self.data
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("data", &String::from_utf8_lossy(self.data))
            .field("last_column", &self.last_column)
            .field("needs_unescape", &self.needs_unescape)
            .finish()
    }
}
