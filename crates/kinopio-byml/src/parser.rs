//! BYML decoding.

use std::hash::BuildHasherDefault;

use hashbrown::{HashMap, HashSet};
use kinopio_common::{BinaryReader, Endian};
use rustc_hash::FxHasher;

use crate::header::{HEADER_SIZE, MAGIC_BIG, MAGIC_LITTLE, SUPPORTED_VERSIONS};
use crate::node::{Container, Dictionary, Node, NodeId};
use crate::{Byml, DecodeOptions, Error, NodeType, Result};

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
type FxHashSet<T> = HashSet<T, BuildHasherDefault<FxHasher>>;

/// Deepest container nesting accepted before the input is treated as corrupt.
const MAX_DEPTH: usize = 512;

pub(crate) fn parse(data: &[u8], options: &DecodeOptions) -> Result<Byml> {
    let magic = data.get(..2).ok_or_else(|| Error::InvalidMagic { actual: data.to_vec() })?;
    let endian = if magic == MAGIC_BIG {
        Endian::Big
    } else if magic == MAGIC_LITTLE {
        Endian::Little
    } else {
        return Err(Error::InvalidMagic { actual: magic.to_vec() });
    };

    let mut reader = BinaryReader::new_at(data, 2, endian);
    let version = reader.read_u16()?;
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    let key_offset = reader.read_u32()? as usize;
    let string_offset = reader.read_u32()? as usize;
    let binary_offset = if version == 1 && key_offset != 0 && key_offset != HEADER_SIZE {
        reader.read_u32()? as usize
    } else {
        0
    };
    let root_offset = reader.read_u32()? as usize;

    let mut parser = Parser {
        data,
        endian,
        options,
        keys: Vec::new(),
        strings: Vec::new(),
        binaries: Vec::new(),
        containers: Vec::new(),
        seen: FxHashMap::default(),
        in_progress: FxHashSet::default(),
    };

    if key_offset != 0 {
        parser.keys = parser.read_string_table(key_offset)?;
    }
    if string_offset != 0 {
        parser.strings = parser.read_string_table(string_offset)?;
    }
    if binary_offset != 0 {
        parser.binaries = parser.read_binary_table(binary_offset)?;
    }

    let root = if root_offset != 0 {
        let tag = parser.reader(root_offset)?.read_u8()?;
        let kind = NodeType::from_tag(tag, root_offset)?;
        if !kind.is_container() {
            return Err(Error::UnexpectedNode {
                expected: NodeType::Dictionary,
                actual: kind,
                offset: root_offset,
            });
        }
        Some(parser.read_container(kind, root_offset, 0)?)
    } else {
        None
    };

    tracing::debug!(
        ?endian,
        version,
        keys = parser.keys.len(),
        strings = parser.strings.len(),
        binaries = parser.binaries.len(),
        containers = parser.containers.len(),
        "decoded BYML document"
    );

    Ok(Byml::from_parts(endian, version, root, parser.containers))
}

struct Parser<'a> {
    data: &'a [u8],
    endian: Endian,
    options: &'a DecodeOptions,
    keys: Vec<String>,
    strings: Vec<String>,
    binaries: Vec<Vec<u8>>,
    containers: Vec<Container>,
    /// Container offset to arena slot.
    seen: FxHashMap<usize, NodeId>,
    /// Containers whose children are still being decoded.
    in_progress: FxHashSet<usize>,
}

impl<'a> Parser<'a> {
    fn reader(&self, offset: usize) -> Result<BinaryReader<'a>> {
        if offset >= self.data.len() {
            return Err(Error::CorruptStream {
                offset,
                reason: format!("offset past end of {} byte document", self.data.len()),
            });
        }
        Ok(BinaryReader::new_at(self.data, offset, self.endian))
    }

    /// Read a tag and 24-bit count, checking the tag.
    fn read_table_header(&self, offset: usize, expected: NodeType) -> Result<(BinaryReader<'a>, usize)> {
        let mut reader = self.reader(offset)?;
        let tag = reader.read_u8()?;
        let actual = NodeType::from_tag(tag, offset)?;
        if actual != expected {
            return Err(Error::UnexpectedNode {
                expected,
                actual,
                offset,
            });
        }
        let count = reader.read_u24()? as usize;
        Ok((reader, count))
    }

    fn read_string_table(&self, offset: usize) -> Result<Vec<String>> {
        let (mut reader, count) = self.read_table_header(offset, NodeType::StringTable)?;
        let mut strings = Vec::with_capacity(count.min(reader.remaining() / 4));
        for _ in 0..count {
            let start = offset + reader.read_u32()? as usize;
            let mut text = self.reader(start)?;
            let bytes = text.read_cbytes()?;
            let decoded = self.options.encoding.decode(bytes).ok_or(Error::InvalidText {
                offset: start,
                encoding: self.options.encoding.name(),
            })?;
            strings.push(decoded.into_owned());
        }
        Ok(strings)
    }

    fn read_binary_table(&self, offset: usize) -> Result<Vec<Vec<u8>>> {
        let (mut reader, count) = self.read_table_header(offset, NodeType::BinaryTable)?;
        let mut binaries = Vec::with_capacity(count.min(reader.remaining() / 4));
        for _ in 0..count {
            let start = offset + reader.read_u32()? as usize;
            let mut entry = self.reader(start)?;
            let len = entry.read_u32()? as usize;
            binaries.push(entry.read_bytes(len)?.to_vec());
        }
        Ok(binaries)
    }

    fn read_container(&mut self, kind: NodeType, offset: usize, depth: usize) -> Result<Node> {
        if self.in_progress.contains(&offset) {
            return Err(Error::CyclicReference { offset });
        }
        let wrap = |id| match kind {
            NodeType::Array => Node::Array(id),
            _ => Node::Dictionary(id),
        };
        if let Some(&id) = self.seen.get(&offset) {
            let actual = self.containers[id.index()].kind();
            if actual != kind {
                return Err(Error::UnexpectedNode {
                    expected: kind,
                    actual,
                    offset,
                });
            }
            return Ok(wrap(id));
        }
        if depth > MAX_DEPTH {
            return Err(Error::CorruptStream {
                offset,
                reason: "containers nested too deeply".to_string(),
            });
        }

        // Reserve the slot first so ids follow pre-order of first visit.
        let id = NodeId::new(self.containers.len());
        self.containers.push(Container::Array(Vec::new()));
        self.seen.insert(offset, id);
        self.in_progress.insert(offset);

        let container = match kind {
            NodeType::Array => Container::Array(self.read_array(offset, depth)?),
            _ => Container::Dictionary(self.read_dictionary(offset, depth)?),
        };

        self.in_progress.remove(&offset);
        self.containers[id.index()] = container;
        Ok(wrap(id))
    }

    fn read_array(&mut self, offset: usize, depth: usize) -> Result<Vec<Node>> {
        let (reader, count) = self.read_table_header(offset, NodeType::Array)?;
        let types_start = reader.position();
        let types = self.reader(types_start)?.read_bytes(count)?;
        let values_start = kinopio_common::align_up(types_start + count, 4);

        let mut items = Vec::with_capacity(count);
        for (i, &tag) in types.iter().enumerate() {
            let position = values_start + i * 4;
            let kind = NodeType::from_tag(tag, types_start + i)?;
            let value = self.reader(position)?.read_u32()?;
            items.push(self.read_value(kind, value, position, depth)?);
        }
        Ok(items)
    }

    fn read_dictionary(&mut self, offset: usize, depth: usize) -> Result<Dictionary> {
        let (_, count) = self.read_table_header(offset, NodeType::Dictionary)?;
        let mut entries = Dictionary::new();
        for i in 0..count {
            let position = offset + 4 + i * 8;
            let mut reader = self.reader(position)?;
            let key_index = reader.read_u24()? as usize;
            let kind = NodeType::from_tag(reader.read_u8()?, position + 3)?;
            let value = reader.read_u32()?;

            let key = self
                .keys
                .get(key_index)
                .ok_or_else(|| Error::CorruptStream {
                    offset: position,
                    reason: format!("key index {} out of range ({} keys)", key_index, self.keys.len()),
                })?
                .clone();
            let node = self.read_value(kind, value, position + 4, depth)?;
            if entries.insert(key, node).is_some() {
                tracing::warn!(offset = position, key_index, "duplicate dictionary key, keeping the last value");
            }
        }
        Ok(entries)
    }

    fn read_value(&mut self, kind: NodeType, value: u32, position: usize, depth: usize) -> Result<Node> {
        let index = value as usize;
        Ok(match kind {
            NodeType::Null => Node::Null,
            NodeType::Bool => Node::Bool(value != 0),
            NodeType::Int => Node::Int(value as i32),
            NodeType::UInt => Node::UInt(value),
            NodeType::Float => Node::Float(f32::from_bits(value)),
            NodeType::Int64 => Node::Int64(self.reader(index)?.read_i64()?),
            NodeType::UInt64 => Node::UInt64(self.reader(index)?.read_u64()?),
            NodeType::Double => Node::Double(self.reader(index)?.read_f64()?),
            NodeType::String => Node::String(self.lookup(&self.strings, index, position, "string")?.clone()),
            NodeType::Binary => Node::Binary(self.lookup(&self.binaries, index, position, "binary")?.clone()),
            NodeType::BinaryParam => {
                let mut reader = self.reader(index)?;
                let binary = reader.read_u32()? as usize;
                let param = reader.read_u32()?;
                Node::BinaryParam {
                    data: self.lookup(&self.binaries, binary, index, "binary")?.clone(),
                    param,
                }
            }
            NodeType::Array | NodeType::Dictionary => self.read_container(kind, index, depth + 1)?,
            NodeType::StringTable | NodeType::BinaryTable => {
                return Err(Error::UnexpectedNode {
                    expected: NodeType::Null,
                    actual: kind,
                    offset: position,
                })
            }
        })
    }

    fn lookup<'t, T>(&self, table: &'t [T], index: usize, position: usize, what: &str) -> Result<&'t T> {
        table.get(index).ok_or_else(|| Error::CorruptStream {
            offset: position,
            reason: format!("{} index {} out of range ({} entries)", what, index, table.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(root: u32) -> Vec<u8> {
        let mut data = b"YB\x02\x00".to_vec();
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&root.to_le_bytes());
        data
    }

    fn parse(data: &[u8]) -> Result<Byml> {
        Byml::parse(data)
    }

    #[test]
    fn test_invalid_magic_and_version() {
        assert!(matches!(parse(b"XX\x00\x02"), Err(Error::InvalidMagic { .. })));
        assert!(matches!(parse(b"B"), Err(Error::InvalidMagic { .. })));

        let mut data = header(0);
        data[2] = 8;
        assert!(matches!(parse(&data), Err(Error::UnsupportedVersion(8))));
        data[2] = 0;
        assert!(matches!(parse(&data), Err(Error::UnsupportedVersion(0))));
    }

    #[test]
    fn test_big_endian_header() {
        let mut data = b"BY\x00\x07".to_vec();
        data.extend_from_slice(&[0; 12]);
        let doc = parse(&data).unwrap();
        assert_eq!(doc.endian(), Endian::Big);
        assert_eq!(doc.version(), 7);
    }

    #[test]
    fn test_cyclic_reference() {
        let mut data = header(0x10);
        data.extend_from_slice(&[0xC0, 0x01, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00]);
        data.extend_from_slice(&0x10u32.to_le_bytes());
        assert!(matches!(parse(&data), Err(Error::CyclicReference { offset: 0x10 })));
    }

    #[test]
    fn test_shared_reference_same_id() {
        let mut data = header(0x10);
        // array of two references to the empty dictionary at 0x20
        data.extend_from_slice(&[0xC0, 0x02, 0x00, 0x00, 0xC1, 0xC1, 0x00, 0x00]);
        data.extend_from_slice(&0x20u32.to_le_bytes());
        data.extend_from_slice(&0x20u32.to_le_bytes());
        data.extend_from_slice(&[0xC1, 0x00, 0x00, 0x00]);

        let doc = parse(&data).unwrap();
        let items = doc.array(doc.root().unwrap()).unwrap();
        assert_eq!(items[0], items[1]);
        assert_eq!(items[0].container_id().map(NodeId::index), Some(1));
        assert_eq!(doc.container_count(), 2);
    }

    #[test]
    fn test_unsupported_node() {
        let mut data = header(0x10);
        data.extend_from_slice(&[0xC0, 0x01, 0x00, 0x00, 0xB0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(
            parse(&data),
            Err(Error::UnsupportedNode { tag: 0xB0, offset: 0x14 })
        ));
    }

    #[test]
    fn test_string_index_out_of_range() {
        let mut data = header(0x10);
        data.extend_from_slice(&[0xC0, 0x01, 0x00, 0x00, 0xA0, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00]);
        assert!(matches!(parse(&data), Err(Error::CorruptStream { .. })));
    }

    #[test]
    fn test_offset_outside_buffer() {
        assert!(matches!(parse(&header(0x400)), Err(Error::CorruptStream { offset: 0x400, .. })));

        let mut data = header(0x10);
        data.extend_from_slice(&[0xC0, 0x01, 0x00, 0x00, 0xD4, 0x00, 0x00, 0x00, 0xF0, 0x00, 0x00, 0x00]);
        assert!(matches!(parse(&data), Err(Error::CorruptStream { .. })));
    }

    #[test]
    fn test_truncated_container() {
        let mut data = header(0x10);
        data.extend_from_slice(&[0xC1, 0x03, 0x00, 0x00]);
        assert!(matches!(parse(&data), Err(Error::CorruptStream { .. })));
    }

    #[test]
    fn test_scalar_root_rejected() {
        let mut data = header(0x10);
        data.extend_from_slice(&[0xD1, 0x00, 0x00, 0x00]);
        assert!(matches!(parse(&data), Err(Error::UnexpectedNode { .. })));
    }
}
