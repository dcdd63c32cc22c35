// In-place doubled-quote unescape: "" -> ".
//
// Shared by the Field accessor and the FFI export. Defined on arbitrary
// input: a lone quote (including a trailing one) passes through verbatim,
// so applying the routine twice yields the same bytes as applying it once.

use memchr::memchr;

/// Collapse every pair of consecutive `quote` bytes in `data` to a single
/// one, shifting the remainder left. Returns the new length; the bytes
/// past it are unspecified. Never lengthens.
pub fn unescape_in_place(data: &mut [u8], quote: u8) -> usize {
    let len = data.len();
    let mut write = 0;
    // Start of the run of bytes not yet copied down.
    let mut run = 0;
    let mut i = 0;

    while i < len {
        let Some(off) = memchr(quote, &data[i..len]) else {
            break;
        };
        let q = i + off;
        if q + 1 < len && data[q + 1] == quote {
            // Real escape: keep everything up to and including the first
            // quote of the pair, drop the second.
            data.copy_within(run..q + 1, write);
            write += q + 1 - run;
            run = q + 2;
            i = q + 2;
        } else {
            // Lone quote: plain content here.
            i = q + 1;
        }
    }

    data.copy_within(run..len, write);
    write + (len - run)
}
