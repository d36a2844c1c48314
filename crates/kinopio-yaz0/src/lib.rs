//! Yaz0 compression codec.
//!
//! Yaz0 is the LZ77 variant that wraps nearly every archive the game ships
//! (`.szs` files are Yaz0-compressed NARCs). The stream is a 16-byte header
//! followed by groups of eight operations, each group introduced by a control
//! byte whose bits (most significant first) select a literal byte (1) or a
//! back-reference (0).
//!
//! - [`decompress`] - Expand a Yaz0 stream
//! - [`compress`] - Greedy longest-match compression with a level-bounded window
//!
//! # Example
//!
//! ```
//! use kinopio_yaz0::{compress, decompress, is_yaz0};
//!
//! let data = b"abcabcabcabc";
//! let packed = compress(data, None);
//!
//! assert!(is_yaz0(&packed));
//! assert_eq!(decompress(&packed)?, data);
//! # Ok::<(), kinopio_yaz0::Error>(())
//! ```

mod compress;
mod decompress;
mod error;
mod header;

pub use compress::{compress, search_window, MAX_DISTANCE, MAX_MATCH, MIN_MATCH};
pub use decompress::{decompress, decompress_into};
pub use error::{Error, Result};
pub use header::Yaz0Header;

/// Check if data starts with the Yaz0 magic.
pub fn is_yaz0(data: &[u8]) -> bool {
    data.len() >= Yaz0Header::MAGIC.len() && &data[..Yaz0Header::MAGIC.len()] == Yaz0Header::MAGIC
}

/// Read the decompressed size declared in a Yaz0 header.
pub fn decompressed_size(data: &[u8]) -> Result<usize> {
    Ok(Yaz0Header::parse(data)?.decompressed_size())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yaz0() {
        assert!(is_yaz0(b"Yaz0\0\0\0\0"));
        assert!(!is_yaz0(b"NARC"));
        assert!(!is_yaz0(b"Ya"));
    }

    #[test]
    fn test_decompressed_size() {
        let packed = compress(&[7u8; 300], Some(9));
        assert_eq!(decompressed_size(&packed).unwrap(), 300);
    }
}
