//! NARC archive reader and writer.
//!
//! NARC is a flat container of named blobs. Stage and actor archives are
//! stored on disk as Yaz0-compressed NARCs (`.szs`); [`Narc::read`] accepts
//! either form.
//!
//! The format is three little-endian sections after a 16-byte header:
//!
//! - `BTAF` - file allocation table (start/end offsets per file)
//! - `BTNF` - file name table (directory tree of length-prefixed names)
//! - `GMIF` - file image (the concatenated file data)
//!
//! # Example
//!
//! ```
//! use kinopio_narc::Narc;
//!
//! let mut archive = Narc::new();
//! archive.insert("StageData.byml", vec![0x42; 10])?;
//!
//! let bytes = archive.write_compressed(None)?;
//! let archive = Narc::read(&bytes)?;
//!
//! assert_eq!(archive.get("StageData.byml").map(<[u8]>::len), Some(10));
//! # Ok::<(), kinopio_narc::Error>(())
//! ```

mod archive;
mod cache;
mod entry;
mod error;
mod fnt;
mod header;

pub use archive::Narc;
pub use cache::ActorCache;
pub use entry::NarcEntry;
pub use error::{Error, Result};
pub use header::{FatEntry, NarcHeader, SectionHeader};
