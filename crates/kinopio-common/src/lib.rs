//! Common utilities for Kinopio.
//!
//! This crate provides foundational types used across all Kinopio crates:
//!
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices in either byte order
//! - [`BinaryWriter`] - Growable binary output with back-patching
//! - [`Endian`] - Runtime byte order selection
//! - [`align_up`] - Offset alignment helper shared by every format

mod endian;
mod error;
mod reader;
mod writer;

pub use endian::Endian;
pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Re-export memchr for SIMD-accelerated byte searching
pub use memchr;

/// Round `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}
