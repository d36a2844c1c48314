//! Runtime byte order.

/// Byte order of a binary stream.
///
/// Most formats handled by Kinopio fix their byte order in the header
/// (byml picks it from its magic), so it is carried as a value rather
/// than as a type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    #[default]
    Little,
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endian::Big => f.write_str("big-endian"),
            Endian::Little => f.write_str("little-endian"),
        }
    }
}
