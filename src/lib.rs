#![cfg_attr(feature = "simd", feature(portable_simd))]
// zerocsv - streaming zero-copy CSV parsing and emitting
//
// The core is a *field* iterator: it pulls bytes from a caller-buffered
// source and yields one `Field` per call as a borrowed view into the
// source's own buffer. No rows, no allocation, strict RFC 4180.
//
// Library safety: no unwrap/expect in production code. Fallible paths use
// match + early return.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//
// Components:
//   core::scanner  - candidate-byte scanner (SIMD bitmask cache or table scan)
//   core::iter     - the `next` state machine (quoting, refill, deferrals)
//   core::field    - yielded Field with lazy in-place unescape
//   source         - ByteSource trait + Read-backed and in-memory sources
//   emit           - write-side: quoting decision, separators, line endings
//   ffi            - C ABI surface with numeric status codes

pub mod core;
pub mod dialect;
pub mod emit;
pub mod error;
mod ffi;
pub mod source;

pub use crate::core::field::Field;
pub use crate::core::iter::FieldIter;
pub use crate::core::unescape::unescape_in_place;
pub use crate::dialect::{Dialect, Rfc4180};
pub use crate::emit::{Emitter, LineEnding};
pub use crate::error::Error;
pub use crate::source::{ByteSource, ReadSource, Refill, SliceSource};
