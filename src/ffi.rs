// C ABI surface.
//
// A thin shim over the core's well-typed results for callers that can
// only carry one return value: constructors return an opaque parser
// pointer (null on failure), every call records its status in a
// thread-local slot, and `next` fills a flat field struct. The numeric
// status values are part of the ABI and must not be reordered.
//
// Allocation happens only here (the parser box, and the buffer for the
// stream-backed constructors); the core itself never allocates.

use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::io::{self, Read};
use std::ptr;
use std::slice;

use log::debug;

use crate::core::field::Field;
use crate::core::iter::FieldIter;
use crate::core::unescape::unescape_in_place;
use crate::error::Error;
use crate::source::{ReadSource, SliceSource};

/// Buffer size for the stream-backed constructors when the caller passes 0.
pub const DEFAULT_BUFFER_CAP: usize = 64 * 1024;

/// Status codes. The numeric ordering is ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    OutOfMemory = 1,
    FieldTooLong = 2,
    Eof = 3,
    InvalidQuotes = 4,
    ReadFailed = 5,
    OpenError = 6,
}

thread_local! {
    static LAST_ERROR: Cell<Status> = const { Cell::new(Status::Ok) };
}

fn set_last(status: Status) -> Status {
    LAST_ERROR.with(|slot| slot.set(status));
    status
}

/// Field shape exposed to C. `data` points into the parser's buffer and
/// stays valid until the next `zerocsv_parser_next` call on the same
/// parser (or indefinitely for a memory-backed parser).
#[repr(C)]
pub struct RawField {
    pub data: *const u8,
    pub len: usize,
    pub last_column: bool,
    pub needs_unescape: bool,
}

/// Read callback: fill `dst[..dst_len]`, store the count through
/// `bytes_read`, and return 0 (ok, at least one byte), 1 (end of stream,
/// zero bytes) or 2 (error).
pub type ReadFn =
    unsafe extern "C" fn(ctx: *mut c_void, dst: *mut u8, dst_len: usize, bytes_read: *mut usize) -> c_int;

const READ_OK: c_int = 0;
const READ_EOF: c_int = 1;

struct CallbackReader {
    ctx: *mut c_void,
    read_fn: ReadFn,
}

impl Read for CallbackReader {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let mut n = 0usize;
        let status = unsafe { (self.read_fn)(self.ctx, dst.as_mut_ptr(), dst.len(), &mut n) };
        match status {
            READ_OK => Ok(n.min(dst.len())),
            READ_EOF => Ok(0),
            _ => Err(io::Error::other("csv read callback failed")),
        }
    }
}

/// Opaque parser handle. Owns its source and, for the stream-backed
/// constructors, the buffer.
pub enum Parser {
    Stream(FieldIter<ReadSource<Vec<u8>, Box<dyn Read>>>),
    Memory(FieldIter<SliceSource<&'static mut [u8]>>),
}

impl Parser {
    fn next_field(&mut self) -> Result<Field<'_>, Error> {
        match self {
            Parser::Stream(it) => it.next(),
            Parser::Memory(it) => it.next(),
        }
    }
}

/// Allocate the parse buffer without aborting on exhaustion.
fn alloc_buffer(cap: usize) -> Option<Vec<u8>> {
    let cap = if cap == 0 { DEFAULT_BUFFER_CAP } else { cap };
    let mut buf = Vec::new();
    buf.try_reserve_exact(cap).ok()?;
    buf.resize(cap, 0);
    Some(buf)
}

fn boxed_stream(reader: Box<dyn Read>, buf: Vec<u8>) -> *mut Parser {
    set_last(Status::Ok);
    Box::into_raw(Box::new(Parser::Stream(FieldIter::from_reader(reader, buf))))
}

/// Open `path` and parse it with an internal buffer of `buf_cap` bytes
/// (0 = default). Returns null on failure; see `zerocsv_last_error`.
///
/// # Safety
/// `path` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn zerocsv_parser_from_path(path: *const c_char, buf_cap: usize) -> *mut Parser {
    if path.is_null() {
        set_last(Status::OpenError);
        return ptr::null_mut();
    }
    let Ok(path) = CStr::from_ptr(path).to_str() else {
        set_last(Status::OpenError);
        return ptr::null_mut();
    };
    let Some(buf) = alloc_buffer(buf_cap) else {
        set_last(Status::OutOfMemory);
        return ptr::null_mut();
    };
    match std::fs::File::open(path) {
        Ok(file) => boxed_stream(Box::new(file), buf),
        Err(err) => {
            debug!("open {path} failed: {err}");
            set_last(Status::OpenError);
            ptr::null_mut()
        }
    }
}

/// Parse from an already-open file descriptor. The caller keeps ownership
/// and must keep it open for the parser's lifetime.
///
/// # Safety
/// `fd` must be a readable descriptor that outlives the parser.
#[cfg(unix)]
#[no_mangle]
pub unsafe extern "C" fn zerocsv_parser_from_fd(fd: c_int, buf_cap: usize) -> *mut Parser {
    use std::fs::File;
    use std::mem::ManuallyDrop;
    use std::os::fd::FromRawFd;

    struct BorrowedFdReader {
        // ManuallyDrop keeps the descriptor open when the parser drops.
        file: ManuallyDrop<File>,
    }

    impl Read for BorrowedFdReader {
        fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
            (&*self.file).read(dst)
        }
    }

    if fd < 0 {
        set_last(Status::OpenError);
        return ptr::null_mut();
    }
    let Some(buf) = alloc_buffer(buf_cap) else {
        set_last(Status::OutOfMemory);
        return ptr::null_mut();
    };
    let reader = BorrowedFdReader {
        file: ManuallyDrop::new(File::from_raw_fd(fd)),
    };
    boxed_stream(Box::new(reader), buf)
}

/// Parse bytes already in memory: `data[..len]` is the parse buffer.
/// `zerocsv_unescape` (and unescaping via the parser) rewrites escape
/// pairs inside it.
///
/// # Safety
/// `data[..len]` must be valid, writable and unaliased for the parser's
/// lifetime.
#[no_mangle]
pub unsafe extern "C" fn zerocsv_parser_from_memory(data: *mut u8, len: usize) -> *mut Parser {
    if data.is_null() && len > 0 {
        set_last(Status::OpenError);
        return ptr::null_mut();
    }
    let buf: &'static mut [u8] = if len == 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(data, len)
    };
    set_last(Status::Ok);
    Box::into_raw(Box::new(Parser::Memory(FieldIter::from_slice(buf))))
}

/// Parse from a user callback invoked whenever the parser needs bytes.
///
/// # Safety
/// `read_fn` must be callable with `ctx` for the parser's lifetime.
#[no_mangle]
pub unsafe extern "C" fn zerocsv_parser_from_callback(
    ctx: *mut c_void,
    read_fn: Option<ReadFn>,
    buf_cap: usize,
) -> *mut Parser {
    let Some(read_fn) = read_fn else {
        set_last(Status::OpenError);
        return ptr::null_mut();
    };
    let Some(buf) = alloc_buffer(buf_cap) else {
        set_last(Status::OutOfMemory);
        return ptr::null_mut();
    };
    boxed_stream(Box::new(CallbackReader { ctx, read_fn }), buf)
}

/// Yield the next field into `out`. `Eof` is the normal end of iteration;
/// `InvalidQuotes` and `FieldTooLong` are fatal for this parser.
///
/// # Safety
/// `parser` must come from a `zerocsv_parser_from_*` constructor and
/// `out` must point to writable `RawField` storage.
#[no_mangle]
pub unsafe extern "C" fn zerocsv_parser_next(parser: *mut Parser, out: *mut RawField) -> Status {
    if parser.is_null() || out.is_null() {
        return set_last(Status::ReadFailed);
    }
    match (*parser).next_field() {
        Ok(field) => {
            let data = field.data();
            (*out) = RawField {
                data: data.as_ptr(),
                len: data.len(),
                last_column: field.is_last_column(),
                needs_unescape: field.needs_unescape(),
            };
            set_last(Status::Ok)
        }
        Err(Error::EndOfInput) => set_last(Status::Eof),
        Err(Error::FieldTooLong) => set_last(Status::FieldTooLong),
        Err(Error::InvalidQuotes) => set_last(Status::InvalidQuotes),
        Err(Error::Read(err)) => {
            debug!("csv read failed: {err}");
            set_last(Status::ReadFailed)
        }
    }
}

/// Collapse doubled `quote` bytes in `data[..len]` in place; returns the
/// new length. Shared with the parser's lazy unescape.
///
/// # Safety
/// `data[..len]` must be valid and writable.
#[no_mangle]
pub unsafe extern "C" fn zerocsv_unescape(data: *mut u8, len: usize, quote: u8) -> usize {
    if data.is_null() {
        return 0;
    }
    unescape_in_place(slice::from_raw_parts_mut(data, len), quote)
}

/// Status of the most recent call on this thread.
#[no_mangle]
pub extern "C" fn zerocsv_last_error() -> Status {
    LAST_ERROR.with(|slot| slot.get())
}

/// Destroy a parser. Closes the file for the from-path variant; borrowed
/// descriptors and memory stay with the caller.
///
/// # Safety
/// `parser` must come from a constructor and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn zerocsv_parser_free(parser: *mut Parser) {
    if !parser.is_null() {
        drop(Box::from_raw(parser));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_ok(parser: *mut Parser) -> (Vec<u8>, bool, bool) {
        let mut raw = RawField {
            data: ptr::null(),
            len: 0,
            last_column: false,
            needs_unescape: false,
        };
        let status = unsafe { zerocsv_parser_next(parser, &mut raw) };
        assert_eq!(status, Status::Ok);
        let data = unsafe { slice::from_raw_parts(raw.data, raw.len) }.to_vec();
        (data, raw.last_column, raw.needs_unescape)
    }

    #[test]
    fn test_memory_parser_roundtrip() {
        let mut input = b"a,\"b\"\"c\"\nd".to_vec();
        let parser = unsafe { zerocsv_parser_from_memory(input.as_mut_ptr(), input.len()) };
        assert!(!parser.is_null());

        assert_eq!(next_ok(parser), (b"a".to_vec(), false, false));
        let (data, last, needs) = next_ok(parser);
        assert_eq!((data.as_slice(), last, needs), (&b"b\"\"c"[..], true, true));
        assert_eq!(next_ok(parser), (b"d".to_vec(), true, false));

        let mut raw = RawField {
            data: ptr::null(),
            len: 0,
            last_column: false,
            needs_unescape: false,
        };
        assert_eq!(unsafe { zerocsv_parser_next(parser, &mut raw) }, Status::Eof);
        assert_eq!(zerocsv_last_error(), Status::Eof);
        unsafe { zerocsv_parser_free(parser) };
    }

    #[test]
    fn test_zero_length_memory_parser_is_eof() {
        // A zero-length buffer must report end of iteration on the first
        // call, not a phantom empty field.
        let mut backing = [0u8; 1];
        let parser = unsafe { zerocsv_parser_from_memory(backing.as_mut_ptr(), 0) };
        assert!(!parser.is_null());

        let mut raw = RawField {
            data: ptr::null(),
            len: 0,
            last_column: false,
            needs_unescape: false,
        };
        assert_eq!(unsafe { zerocsv_parser_next(parser, &mut raw) }, Status::Eof);
        assert_eq!(zerocsv_last_error(), Status::Eof);
        // And stays that way.
        assert_eq!(unsafe { zerocsv_parser_next(parser, &mut raw) }, Status::Eof);
        unsafe { zerocsv_parser_free(parser) };
    }

    #[test]
    fn test_unescape_export() {
        let mut data = b"b\"\"c".to_vec();
        let n = unsafe { zerocsv_unescape(data.as_mut_ptr(), data.len(), b'"') };
        assert_eq!(&data[..n], b"b\"c");
    }

    #[test]
    fn test_invalid_quotes_status() {
        let mut input = b"ab\"cd\n".to_vec();
        let parser = unsafe { zerocsv_parser_from_memory(input.as_mut_ptr(), input.len()) };
        let mut raw = RawField {
            data: ptr::null(),
            len: 0,
            last_column: false,
            needs_unescape: false,
        };
        assert_eq!(
            unsafe { zerocsv_parser_next(parser, &mut raw) },
            Status::InvalidQuotes
        );
        assert_eq!(zerocsv_last_error(), Status::InvalidQuotes);
        unsafe { zerocsv_parser_free(parser) };
    }

    #[test]
    fn test_callback_parser() {
        struct Feed {
            data: &'static [u8],
            pos: usize,
        }

        unsafe extern "C" fn feed_read(
            ctx: *mut c_void,
            dst: *mut u8,
            dst_len: usize,
            bytes_read: *mut usize,
        ) -> c_int {
            let feed = &mut *(ctx as *mut Feed);
            let remaining = feed.data.len() - feed.pos;
            if remaining == 0 {
                *bytes_read = 0;
                return READ_EOF;
            }
            // Hand out at most three bytes per call to exercise refills.
            let n = remaining.min(dst_len).min(3);
            ptr::copy_nonoverlapping(feed.data.as_ptr().add(feed.pos), dst, n);
            feed.pos += n;
            *bytes_read = n;
            READ_OK
        }

        let mut feed = Feed {
            data: b"x,\"y,z\"\nw",
            pos: 0,
        };
        let parser = unsafe {
            zerocsv_parser_from_callback(&mut feed as *mut Feed as *mut c_void, Some(feed_read), 16)
        };
        assert!(!parser.is_null());

        assert_eq!(next_ok(parser), (b"x".to_vec(), false, false));
        assert_eq!(next_ok(parser), (b"y,z".to_vec(), true, false));
        assert_eq!(next_ok(parser), (b"w".to_vec(), true, false));
        unsafe { zerocsv_parser_free(parser) };
    }

    #[test]
    fn test_null_constructor_arguments() {
        let parser = unsafe { zerocsv_parser_from_path(ptr::null(), 0) };
        assert!(parser.is_null());
        assert_eq!(zerocsv_last_error(), Status::OpenError);

        let parser = unsafe { zerocsv_parser_from_callback(ptr::null_mut(), None, 0) };
        assert!(parser.is_null());
        assert_eq!(zerocsv_last_error(), Status::OpenError);
    }
}
