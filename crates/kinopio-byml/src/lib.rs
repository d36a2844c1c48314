//! BYML binary tree format.
//!
//! BYML stores a tree of dictionaries and arrays with scalar leaves. Keys
//! and strings live in shared, sorted tables and are referenced by index;
//! containers and 64-bit values are referenced by offset.
//!
//! Documents come in both byte orders (`BY` big endian, `YB` little endian)
//! and versions 1 to 7. Version 1 may additionally carry a binary-data table.
//!
//! # Example
//!
//! ```no_run
//! use kinopio_byml::Byml;
//!
//! let data = std::fs::read("StageData.byml")?;
//! let doc = Byml::parse(&data)?;
//! for (key, value) in doc.root_dictionary()? {
//!     println!("{} = {:?}", key, value.node_type());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod document;
mod error;
mod header;
#[cfg(feature = "json-export")]
mod json;
mod node;
mod options;
mod parser;
mod writer;

pub use document::Byml;
pub use error::{Error, Result};
pub use header::{NodeType, HEADER_SIZE, HEADER_SIZE_WITH_BINARY, MAGIC_BIG, MAGIC_LITTLE, SUPPORTED_VERSIONS};
#[cfg(feature = "json-export")]
pub use json::JsonView;
pub use node::{Container, Dictionary, Node, NodeId};
pub use options::{DecodeOptions, EncodeOptions, TextEncoding};

/// Check whether `data` starts with a BYML magic.
pub fn is_byml(data: &[u8]) -> bool {
    data.starts_with(MAGIC_BIG) || data.starts_with(MAGIC_LITTLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_byml() {
        assert!(is_byml(b"BY\x00\x02"));
        assert!(is_byml(b"YB\x02\x00"));
        assert!(!is_byml(b"Yaz0"));
        assert!(!is_byml(b"B"));
    }
}
