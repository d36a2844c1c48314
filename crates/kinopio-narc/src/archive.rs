//! NARC archive reading and writing.

use kinopio_common::{align_up, BinaryReader, BinaryWriter, Endian};

use crate::fnt;
use crate::{Error, FatEntry, NarcEntry, NarcHeader, Result, SectionHeader};

/// An in-memory NARC archive: an ordered list of uniquely named files.
///
/// All operations work on byte buffers; reading files from disk is the
/// caller's job. Equality compares contents by name and ignores entry order,
/// since writing lays files out directory by directory.
#[derive(Debug, Clone, Default)]
pub struct Narc {
    entries: Vec<NarcEntry>,
}

impl PartialEq for Narc {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|entry| other.get(entry.name()) == Some(entry.data()))
    }
}

impl Eq for Narc {}

impl Narc {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if data is an uncompressed NARC by checking the magic bytes.
    pub fn is_narc(data: &[u8]) -> bool {
        data.len() >= NarcHeader::MAGIC.len() && &data[..NarcHeader::MAGIC.len()] == NarcHeader::MAGIC
    }

    /// Read an archive that may be Yaz0-compressed.
    ///
    /// Fails with [`Error::NotAnArchive`] if the (decompressed) content does
    /// not carry the NARC signature.
    pub fn read(data: &[u8]) -> Result<Self> {
        if kinopio_yaz0::is_yaz0(data) {
            let raw = kinopio_yaz0::decompress(data)?;
            Self::parse(&raw)
        } else {
            Self::parse(data)
        }
    }

    /// Parse an uncompressed NARC.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if !Self::is_narc(data) {
            return Err(Error::NotAnArchive {
                actual: data[..NarcHeader::MAGIC.len().min(data.len())].to_vec(),
            });
        }

        let mut reader = BinaryReader::new(data);
        let header: NarcHeader = reader.read_struct()?;
        if header.bom.get() != NarcHeader::BOM {
            return Err(Error::UnsupportedBom(header.bom.get()));
        }
        reader.seek(header.header_size.get() as usize);

        // BTAF
        let btaf = read_section(&mut reader, SectionHeader::BTAF)?;
        let mut fat_reader = BinaryReader::new(btaf);
        let file_count = fat_reader.read_u16()? as usize;
        fat_reader.advance(2);
        let mut fat = Vec::with_capacity(file_count);
        for _ in 0..file_count {
            fat.push(fat_reader.read_struct::<FatEntry>()?);
        }

        // BTNF
        let btnf = read_section(&mut reader, SectionHeader::BTNF)?;
        let names = fnt::read_names(btnf, file_count)?;

        // GMIF
        let gmif_start = reader.position() + SectionHeader::SIZE;
        let gmif = read_section(&mut reader, SectionHeader::GMIF)?;

        let mut entries: Vec<NarcEntry> = Vec::with_capacity(file_count);
        for (index, (extent, name)) in fat.iter().zip(names).enumerate() {
            let start = extent.start.get() as usize;
            let end = extent.end.get() as usize;
            if start > end || end > gmif.len() {
                return Err(Error::CorruptStream {
                    offset: gmif_start + start,
                    reason: format!("file {} spans {:#x}..{:#x} outside file image", index, start, end),
                });
            }

            let name = name.unwrap_or_else(|| index.to_string());
            if entries.iter().any(|e| e.name() == name) {
                return Err(Error::DuplicateName(name));
            }
            entries.push(NarcEntry::new(name, gmif[start..end].to_vec()));
        }

        tracing::debug!(entries = entries.len(), size = data.len(), "parsed NARC");

        Ok(Self { entries })
    }

    /// Get the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the archive has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in archive order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &NarcEntry> + '_ {
        self.entries.iter()
    }

    /// Iterate over entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(NarcEntry::name)
    }

    /// Find an entry by exact name.
    pub fn find(&self, name: &str) -> Option<&NarcEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Get an entry's contents by exact name.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.find(name).map(NarcEntry::data)
    }

    /// Add a new entry at the end of the archive.
    ///
    /// Fails with [`Error::DuplicateName`] if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) -> Result<()> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(Error::DuplicateName(name));
        }
        self.entries.push(NarcEntry::new(name, data));
        Ok(())
    }

    /// Add or overwrite an entry, returning the previous contents.
    pub fn replace(&mut self, name: impl Into<String>, data: Vec<u8>) -> Option<Vec<u8>> {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name() == name) {
            Some(entry) => Some(entry.set_data(data)),
            None => {
                self.entries.push(NarcEntry::new(name, data));
                None
            }
        }
    }

    /// Remove an entry, returning its contents.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let index = self.entries.iter().position(|e| e.name() == name)?;
        Some(self.entries.remove(index).into_data())
    }

    /// Serialize to an uncompressed NARC.
    ///
    /// Paths containing `/` are stored as subdirectories; files are laid out
    /// directory by directory, so a flat archive keeps its entry order.
    pub fn write(&self) -> Result<Vec<u8>> {
        let names = fnt::build_names(self.names())?;

        let fat_size = SectionHeader::SIZE + 4 + names.file_order.len() * 8;
        let fnt_size = align_up(SectionHeader::SIZE + names.bytes.len(), 4);

        let mut image = BinaryWriter::new(Endian::Little);
        let mut fat = Vec::with_capacity(names.file_order.len());
        for &index in &names.file_order {
            let data = self.entries[index].data();
            let start = image.position();
            image.write_bytes(data);
            fat.push(FatEntry::new(start as u32, image.position() as u32));
            image.align(4, 0xFF);
        }
        let image = image.into_inner();
        let gmif_size = SectionHeader::SIZE + image.len();

        let total = NarcHeader::SIZE + fat_size + fnt_size + gmif_size;
        let total = u32::try_from(total).map_err(|_| Error::TooLarge(format!("{} bytes", total)))?;

        let mut writer = BinaryWriter::with_capacity(Endian::Little, total as usize);
        writer.write_struct(&NarcHeader::new(total));

        writer.write_struct(&SectionHeader::new(SectionHeader::BTAF, fat_size as u32));
        writer.write_u16(fat.len() as u16);
        writer.write_u16(0);
        for extent in &fat {
            writer.write_struct(extent);
        }

        writer.write_struct(&SectionHeader::new(SectionHeader::BTNF, fnt_size as u32));
        writer.write_bytes(&names.bytes);
        writer.align(4, 0xFF);

        writer.write_struct(&SectionHeader::new(SectionHeader::GMIF, gmif_size as u32));
        writer.write_bytes(&image);

        Ok(writer.into_inner())
    }

    /// Serialize and Yaz0-compress, producing an `.szs` image.
    pub fn write_compressed(&self, level: Option<u8>) -> Result<Vec<u8>> {
        Ok(kinopio_yaz0::compress(&self.write()?, level))
    }
}

impl FromIterator<NarcEntry> for Narc {
    /// Collect entries; later duplicates replace earlier ones.
    fn from_iter<I: IntoIterator<Item = NarcEntry>>(iter: I) -> Self {
        let mut archive = Narc::new();
        for entry in iter {
            let name = entry.name().to_string();
            archive.replace(name, entry.into_data());
        }
        archive
    }
}

impl<'a> IntoIterator for &'a Narc {
    type Item = &'a NarcEntry;
    type IntoIter = std::slice::Iter<'a, NarcEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Read one section, checking its signature, and return its payload.
fn read_section<'a>(reader: &mut BinaryReader<'a>, expected: [u8; 4]) -> Result<&'a [u8]> {
    let offset = reader.position();
    let header: SectionHeader = reader.read_struct()?;
    if header.magic != expected {
        return Err(Error::InvalidSection {
            expected,
            actual: header.magic,
        });
    }

    let size = header.size.get() as usize;
    if size < SectionHeader::SIZE {
        return Err(Error::CorruptStream {
            offset,
            reason: format!("section size {} smaller than its header", size),
        });
    }

    let payload_len = size - SectionHeader::SIZE;
    if payload_len > reader.remaining() {
        return Err(Error::CorruptStream {
            offset,
            reason: format!(
                "section {:?} needs {} bytes but only {} remain",
                String::from_utf8_lossy(&expected),
                payload_len,
                reader.remaining()
            ),
        });
    }
    Ok(reader.read_bytes(payload_len)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Narc {
        let mut archive = Narc::new();
        archive.insert("a.bin", (0..10).collect()).unwrap();
        archive.insert("b.bin", Vec::new()).unwrap();
        archive
    }

    #[test]
    fn test_compressed_round_trip_scenario() {
        let bytes = sample().write_compressed(Some(9)).unwrap();
        assert!(kinopio_yaz0::is_yaz0(&bytes));

        let archive = Narc::read(&bytes).unwrap();
        assert_eq!(archive.get("a.bin").map(<[u8]>::len), Some(10));
        assert_eq!(archive.get("b.bin").map(<[u8]>::len), Some(0));
        assert_eq!(archive.get("c.bin"), None);
    }

    #[test]
    fn test_uncompressed_round_trip() {
        let archive = sample();
        let parsed = Narc::parse(&archive.write().unwrap()).unwrap();
        assert_eq!(parsed, archive);
        assert_eq!(parsed.names().collect::<Vec<_>>(), ["a.bin", "b.bin"]);
    }

    #[test]
    fn test_empty_archive() {
        let bytes = Narc::new().write().unwrap();
        let parsed = Narc::read(&bytes).unwrap();
        assert!(parsed.is_empty());

        let parsed = Narc::read(&Narc::new().write_compressed(None).unwrap()).unwrap();
        assert_eq!(parsed.len(), 0);
    }

    #[test]
    fn test_subdirectories() {
        let mut archive = Narc::new();
        archive.insert("root.txt", b"r".to_vec()).unwrap();
        archive.insert("Model/Kuribo.bcmdl", vec![1; 7]).unwrap();
        archive.insert("Model/Tex/Kuribo.bctex", vec![2; 3]).unwrap();
        archive.insert("Anim/Walk.bcskla", vec![3; 5]).unwrap();
        archive.insert("Model/Nokonoko.bcmdl", vec![4; 2]).unwrap();

        let parsed = Narc::parse(&archive.write().unwrap()).unwrap();
        assert_eq!(parsed.len(), 5);
        for entry in &archive {
            assert_eq!(parsed.get(entry.name()), Some(entry.data()), "{}", entry.name());
        }
        assert_eq!(
            parsed.names().collect::<Vec<_>>(),
            [
                "root.txt",
                "Model/Kuribo.bcmdl",
                "Model/Nokonoko.bcmdl",
                "Model/Tex/Kuribo.bctex",
                "Anim/Walk.bcskla",
            ]
        );
    }

    #[test]
    fn test_mixed_paths_round_trip_equal() {
        let mut archive = Narc::new();
        archive.insert("b.bin", vec![1]).unwrap();
        archive.insert("dir/a.bin", vec![2, 2]).unwrap();
        archive.insert("c.bin", vec![3; 3]).unwrap();

        let parsed = Narc::parse(&archive.write().unwrap()).unwrap();
        assert_eq!(parsed.names().collect::<Vec<_>>(), ["b.bin", "c.bin", "dir/a.bin"]);
        assert_eq!(parsed, archive);

        let mut changed = parsed.clone();
        changed.replace("dir/a.bin", vec![9]);
        assert_ne!(changed, archive);
        changed.remove("dir/a.bin");
        assert_ne!(changed, archive);
    }

    #[test]
    fn test_file_data_is_aligned() {
        let mut archive = Narc::new();
        archive.insert("x", vec![1; 3]).unwrap();
        archive.insert("y", vec![2; 3]).unwrap();
        let bytes = archive.write().unwrap();

        let gmif = bytes.windows(4).position(|w| w == b"GMIF").unwrap();
        assert_eq!(&bytes[gmif + 8..gmif + 16], &[1, 1, 1, 0xFF, 2, 2, 2, 0xFF]);
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn test_not_an_archive() {
        assert!(matches!(Narc::read(b"SARC\0\0\0\0"), Err(Error::NotAnArchive { .. })));

        let packed = kinopio_yaz0::compress(b"definitely not a narc", None);
        assert!(matches!(Narc::read(&packed), Err(Error::NotAnArchive { .. })));
    }

    #[test]
    fn test_unnamed_files() {
        // Hand-built archive whose name table only has the root record.
        let mut writer = BinaryWriter::new(Endian::Little);
        writer.write_struct(&NarcHeader::new(0));
        writer.write_struct(&SectionHeader::new(SectionHeader::BTAF, 8 + 4 + 16));
        writer.write_u16(2);
        writer.write_u16(0);
        writer.write_struct(&FatEntry::new(0, 2));
        writer.write_struct(&FatEntry::new(4, 5));
        writer.write_struct(&SectionHeader::new(SectionHeader::BTNF, 8 + 8));
        writer.write_u32(4);
        writer.write_u16(0);
        writer.write_u16(1);
        writer.write_struct(&SectionHeader::new(SectionHeader::GMIF, 8 + 8));
        writer.write_bytes(&[9, 9, 0xFF, 0xFF, 7, 0xFF, 0xFF, 0xFF]);

        let archive = Narc::parse(writer.as_slice()).unwrap();
        assert_eq!(archive.get("0"), Some(&[9u8, 9][..]));
        assert_eq!(archive.get("1"), Some(&[7u8][..]));
    }

    #[test]
    fn test_out_of_range_extent() {
        let mut bytes = sample().write().unwrap();
        // First FAT entry's end offset sits after header (0x10), section header
        // (8) and count (4), plus the start field (4).
        let end_field = NarcHeader::SIZE + SectionHeader::SIZE + 4 + 4;
        bytes[end_field..end_field + 4].copy_from_slice(&0xFFFFu32.to_le_bytes());
        assert!(matches!(Narc::parse(&bytes), Err(Error::CorruptStream { .. })));
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut archive = sample();
        assert!(matches!(archive.insert("a.bin", Vec::new()), Err(Error::DuplicateName(_))));
        assert_eq!(archive.replace("b.bin", vec![5]), Some(Vec::new()));
        assert_eq!(archive.remove("a.bin").map(|d| d.len()), Some(10));
        assert_eq!(archive.remove("a.bin"), None);
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_invalid_names() {
        let mut archive = Narc::new();
        archive.insert("dir//file", Vec::new()).unwrap();
        assert!(matches!(archive.write(), Err(Error::InvalidName { .. })));

        let mut archive = Narc::new();
        archive.insert("x".repeat(200), Vec::new()).unwrap();
        assert!(matches!(archive.write(), Err(Error::InvalidName { .. })));
    }
}
