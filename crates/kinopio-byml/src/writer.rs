//! BYML encoding.
//!
//! Layout: header, key table, string table, binary table (version 1 only),
//! then containers breadth-first from the root. Each container is followed
//! by the out-of-line values it references. Offsets to containers that have
//! not been placed yet are written as zero and patched at the end.

use std::borrow::Cow;
use std::collections::{BTreeSet, VecDeque};
use std::hash::BuildHasherDefault;

use hashbrown::HashMap;
use kinopio_common::{BinaryWriter, Endian};
use rustc_hash::FxHasher;

use crate::header::{MAGIC_BIG, MAGIC_LITTLE, SUPPORTED_VERSIONS};
use crate::node::{Container, Node, NodeId};
use crate::{Byml, EncodeOptions, Error, NodeType, Result, TextEncoding};

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

const MAX_COUNT: usize = 0xFF_FFFF;

pub(crate) fn write(doc: &Byml, options: &EncodeOptions) -> Result<Vec<u8>> {
    let endian = options.endian.unwrap_or(doc.endian());
    let version = options.version.unwrap_or(doc.version());
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    let root = match doc.root() {
        Some(root) if root.node_type().is_container() => Some(root),
        Some(other) => {
            return Err(Error::UnexpectedNode {
                expected: NodeType::Dictionary,
                actual: other.node_type(),
                offset: 0,
            })
        }
        None => None,
    };

    let tables = Tables::collect(doc, root, options.encoding)?;
    let with_binary = !tables.binaries.is_empty();
    if with_binary && version != 1 {
        return Err(Error::BinaryTableUnsupported(version));
    }

    let mut writer = BinaryWriter::new(endian);
    writer.write_bytes(match endian {
        Endian::Big => MAGIC_BIG,
        Endian::Little => MAGIC_LITTLE,
    });
    writer.write_u16(version);
    let key_slot = reserve(&mut writer);
    let string_slot = reserve(&mut writer);
    let binary_slot = with_binary.then(|| reserve(&mut writer));
    let root_slot = reserve(&mut writer);

    // With a binary table the key table offset must differ from 0x10 for
    // readers to find the extra header field, so it is always emitted.
    if !tables.keys.is_empty() || with_binary {
        writer.patch_u32(key_slot, writer.position() as u32);
        write_string_table(&mut writer, &tables.keys, "key table")?;
    }
    if !tables.strings.is_empty() {
        writer.patch_u32(string_slot, writer.position() as u32);
        write_string_table(&mut writer, &tables.strings, "string table")?;
    }
    if let Some(slot) = binary_slot {
        writer.patch_u32(slot, writer.position() as u32);
        write_binary_table(&mut writer, &tables.binaries)?;
    }

    if let Some(root) = root {
        let mut containers = ContainerWriter {
            doc,
            tables: &tables,
            writer,
            offsets: vec![None; doc.container_count()],
            queued: vec![false; doc.container_count()],
            queue: VecDeque::new(),
            fixups: Vec::new(),
        };
        let (root_id, _) = doc.resolve(root)?;
        containers.queued[root_id.index()] = true;
        containers.queue.push_back(root_id);
        containers.fixups.push((root_slot, root_id));
        containers.drain()?;
        writer = containers.finish()?;
    }

    tracing::debug!(
        ?endian,
        version,
        keys = tables.keys.len(),
        strings = tables.strings.len(),
        binaries = tables.binaries.len(),
        size = writer.position(),
        "encoded BYML document"
    );
    Ok(writer.into_inner())
}

fn reserve(writer: &mut BinaryWriter) -> usize {
    let slot = writer.position();
    writer.write_u32(0);
    slot
}

fn write_count(writer: &mut BinaryWriter, kind: NodeType, count: usize, what: &'static str) -> Result<()> {
    if count > MAX_COUNT {
        return Err(Error::TooLarge(what));
    }
    writer.write_u8(kind.tag());
    writer.write_u24(count as u32);
    Ok(())
}

fn write_string_table(writer: &mut BinaryWriter, strings: &[Cow<'_, [u8]>], what: &'static str) -> Result<()> {
    let start = writer.position();
    write_count(writer, NodeType::StringTable, strings.len(), what)?;
    let offsets = writer.position();
    for _ in 0..=strings.len() {
        writer.write_u32(0);
    }
    for (i, text) in strings.iter().enumerate() {
        writer.patch_u32(offsets + i * 4, (writer.position() - start) as u32);
        writer.write_bytes(text);
        writer.write_u8(0);
    }
    writer.patch_u32(offsets + strings.len() * 4, (writer.position() - start) as u32);
    writer.align(4, 0);
    Ok(())
}

fn write_binary_table(writer: &mut BinaryWriter, binaries: &[&[u8]]) -> Result<()> {
    let start = writer.position();
    write_count(writer, NodeType::BinaryTable, binaries.len(), "binary table")?;
    let offsets = writer.position();
    for _ in 0..binaries.len() {
        writer.write_u32(0);
    }
    for (i, data) in binaries.iter().enumerate() {
        writer.patch_u32(offsets + i * 4, (writer.position() - start) as u32);
        writer.write_u32(data.len() as u32);
        writer.write_bytes(data);
        writer.align(4, 0);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Key, string and binary tables for a document, in on-disk order.
struct Tables<'d> {
    keys: Vec<Cow<'d, [u8]>>,
    key_index: FxHashMap<&'d str, u32>,
    strings: Vec<Cow<'d, [u8]>>,
    string_index: FxHashMap<&'d str, u32>,
    binaries: Vec<&'d [u8]>,
    binary_index: FxHashMap<&'d [u8], u32>,
}

impl<'d> Tables<'d> {
    fn collect(doc: &'d Byml, root: Option<&'d Node>, encoding: TextEncoding) -> Result<Self> {
        let mut keys = BTreeSet::new();
        let mut strings = BTreeSet::new();
        let mut binaries = Vec::new();
        let mut binary_index = FxHashMap::default();

        if let Some(root) = root {
            let mut state = vec![Visit::New; doc.container_count()];
            let mut collector = Collector {
                doc,
                keys: &mut keys,
                strings: &mut strings,
                binaries: &mut binaries,
                binary_index: &mut binary_index,
                state: &mut state,
            };
            collector.visit(root)?;
        }

        let (keys, key_index) = sort_encoded(keys, encoding)?;
        let (strings, string_index) = sort_encoded(strings, encoding)?;
        Ok(Self {
            keys,
            key_index,
            strings,
            string_index,
            binaries,
            binary_index,
        })
    }

    fn key(&self, key: &str) -> Result<u32> {
        lookup(&self.key_index, key, "key")
    }

    fn string(&self, text: &str) -> Result<u32> {
        lookup(&self.string_index, text, "string")
    }

    fn binary(&self, data: &[u8]) -> Result<u32> {
        self.binary_index.get(data).copied().ok_or_else(|| Error::CorruptStream {
            offset: 0,
            reason: "binary data missing from table".to_string(),
        })
    }
}

fn lookup(index: &FxHashMap<&str, u32>, text: &str, what: &str) -> Result<u32> {
    index.get(text).copied().ok_or_else(|| Error::CorruptStream {
        offset: 0,
        reason: format!("{} {:?} missing from table", what, text),
    })
}

/// Encode every string and order the table by encoded bytes.
fn sort_encoded<'d>(
    texts: BTreeSet<&'d str>,
    encoding: TextEncoding,
) -> Result<(Vec<Cow<'d, [u8]>>, FxHashMap<&'d str, u32>)> {
    let mut encoded = texts
        .into_iter()
        .map(|text| {
            encoding
                .encode(text)
                .map(|bytes| (bytes, text))
                .ok_or_else(|| Error::UnencodableText {
                    text: text.to_string(),
                    encoding: encoding.name(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    encoded.sort_by(|a, b| a.0.cmp(&b.0));

    let index = encoded
        .iter()
        .enumerate()
        .map(|(i, (_, text))| (*text, i as u32))
        .collect();
    Ok((encoded.into_iter().map(|(bytes, _)| bytes).collect(), index))
}

struct Collector<'d, 'c> {
    doc: &'d Byml,
    keys: &'c mut BTreeSet<&'d str>,
    strings: &'c mut BTreeSet<&'d str>,
    binaries: &'c mut Vec<&'d [u8]>,
    binary_index: &'c mut FxHashMap<&'d [u8], u32>,
    state: &'c mut [Visit],
}

impl<'d> Collector<'d, '_> {
    fn visit(&mut self, node: &'d Node) -> Result<()> {
        match node {
            Node::String(text) => {
                self.strings.insert(text);
            }
            Node::Binary(data) | Node::BinaryParam { data, .. } => {
                if !self.binary_index.contains_key(data.as_slice()) {
                    self.binary_index.insert(data, self.binaries.len() as u32);
                    self.binaries.push(data);
                }
            }
            Node::Array(_) | Node::Dictionary(_) => {
                let (id, container) = self.doc.resolve(node)?;
                match self.state[id.index()] {
                    Visit::Active => return Err(Error::CyclicNode(id)),
                    Visit::Done => return Ok(()),
                    Visit::New => {}
                }
                self.state[id.index()] = Visit::Active;
                if let Container::Dictionary(entries) = container {
                    self.keys.extend(entries.keys().map(String::as_str));
                }
                for child in container.values() {
                    self.visit(child)?;
                }
                self.state[id.index()] = Visit::Done;
            }
            _ => {}
        }
        Ok(())
    }
}

struct ContainerWriter<'d, 't> {
    doc: &'d Byml,
    tables: &'t Tables<'d>,
    writer: BinaryWriter,
    offsets: Vec<Option<u32>>,
    queued: Vec<bool>,
    queue: VecDeque<NodeId>,
    /// Slots holding offsets of containers not yet placed.
    fixups: Vec<(usize, NodeId)>,
}

impl<'d> ContainerWriter<'d, '_> {
    fn drain(&mut self) -> Result<()> {
        while let Some(id) = self.queue.pop_front() {
            let container = self.doc.container(id).ok_or(Error::InvalidNodeId(id))?;
            self.writer.align(4, 0);
            self.offsets[id.index()] = Some(self.writer.position() as u32);

            let mut pending = Vec::new();
            match container {
                Container::Array(items) => {
                    write_count(&mut self.writer, NodeType::Array, items.len(), "array")?;
                    for item in items {
                        self.writer.write_u8(item.node_type().tag());
                    }
                    self.writer.align(4, 0);
                    for item in items {
                        self.write_value(item, &mut pending)?;
                    }
                }
                Container::Dictionary(entries) => {
                    write_count(&mut self.writer, NodeType::Dictionary, entries.len(), "dictionary")?;
                    let mut sorted = entries
                        .iter()
                        .map(|(key, value)| Ok((self.tables.key(key)?, value)))
                        .collect::<Result<Vec<_>>>()?;
                    sorted.sort_by_key(|(index, _)| *index);
                    for (index, value) in sorted {
                        self.writer.write_u24(index);
                        self.writer.write_u8(value.node_type().tag());
                        self.write_value(value, &mut pending)?;
                    }
                }
            }
            self.write_out_of_line(pending)?;
        }
        Ok(())
    }

    /// Write a 4-byte value slot, deferring anything stored out of line.
    fn write_value(&mut self, node: &'d Node, pending: &mut Vec<(usize, &'d Node)>) -> Result<()> {
        let slot = self.writer.position();
        match node {
            Node::Null => self.writer.write_u32(0),
            Node::Bool(value) => self.writer.write_u32(u32::from(*value)),
            Node::Int(value) => self.writer.write_i32(*value),
            Node::UInt(value) => self.writer.write_u32(*value),
            Node::Float(value) => self.writer.write_f32(*value),
            Node::String(text) => {
                let index = self.tables.string(text)?;
                self.writer.write_u32(index);
            }
            Node::Binary(data) => {
                let index = self.tables.binary(data)?;
                self.writer.write_u32(index);
            }
            Node::Int64(_) | Node::UInt64(_) | Node::Double(_) | Node::BinaryParam { .. } => {
                self.writer.write_u32(0);
                pending.push((slot, node));
            }
            Node::Array(_) | Node::Dictionary(_) => {
                let (id, _) = self.doc.resolve(node)?;
                match self.offsets[id.index()] {
                    Some(offset) => self.writer.write_u32(offset),
                    None => {
                        self.writer.write_u32(0);
                        self.fixups.push((slot, id));
                        if !std::mem::replace(&mut self.queued[id.index()], true) {
                            self.queue.push_back(id);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn write_out_of_line(&mut self, pending: Vec<(usize, &'d Node)>) -> Result<()> {
        for (slot, node) in pending {
            self.writer.align(4, 0);
            let offset = self.writer.position() as u32;
            match node {
                Node::Int64(value) => self.writer.write_i64(*value),
                Node::UInt64(value) => self.writer.write_u64(*value),
                Node::Double(value) => self.writer.write_f64(*value),
                Node::BinaryParam { data, param } => {
                    let index = self.tables.binary(data)?;
                    self.writer.write_u32(index);
                    self.writer.write_u32(*param);
                }
                _ => continue,
            }
            self.writer.patch_u32(slot, offset);
        }
        Ok(())
    }

    fn finish(self) -> Result<BinaryWriter> {
        let mut writer = self.writer;
        for (slot, id) in self.fixups {
            let offset = self.offsets[id.index()].ok_or(Error::InvalidNodeId(id))?;
            writer.patch_u32(slot, offset);
        }
        writer.align(4, 0);
        Ok(writer)
    }
}
