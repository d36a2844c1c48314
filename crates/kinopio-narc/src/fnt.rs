//! File name table (`BTNF`) encoding.
//!
//! The table starts with one 8-byte record per directory (`u32` offset of
//! the directory's name list, `u16` id of its first file, `u16` parent
//! directory id, or the directory count for the root). Each name list is a
//! run of length-prefixed names terminated by a zero byte; a length byte
//! with bit 7 set introduces a subdirectory and is followed by its
//! `0xF000 | index` id.

use kinopio_common::{BinaryReader, BinaryWriter, Endian};

use crate::{Error, Result};

const DIR_ID_BASE: u16 = 0xF000;
const MAX_NAME_LEN: usize = 0x7F;

/// Resolve every file id to its full path.
///
/// Files the table does not name are returned as `None`.
pub(crate) fn read_names(fnt: &[u8], file_count: usize) -> Result<Vec<Option<String>>> {
    let mut names = vec![None; file_count];
    if fnt.len() < 8 {
        return Ok(names);
    }

    let mut reader = BinaryReader::new(fnt);
    reader.advance(6);
    let dir_count = reader.read_u16()? as usize;
    let dir_count = dir_count.clamp(1, fnt.len() / 8);

    let mut visited = vec![false; dir_count];
    read_directory(fnt, 0, "", dir_count, &mut visited, &mut names)?;
    Ok(names)
}

fn read_directory(
    fnt: &[u8],
    index: usize,
    prefix: &str,
    dir_count: usize,
    visited: &mut [bool],
    names: &mut [Option<String>],
) -> Result<()> {
    if index >= dir_count {
        return Err(corrupt(index * 8, "directory id out of range"));
    }
    if std::mem::replace(&mut visited[index], true) {
        return Err(corrupt(index * 8, "directory listed twice"));
    }

    let mut reader = BinaryReader::new_at(fnt, index * 8, Endian::Little);
    let list_offset = reader.read_u32()? as usize;
    let mut file_id = reader.read_u16()? as usize;

    let mut reader = BinaryReader::new_at(fnt, list_offset, Endian::Little);
    loop {
        let position = reader.position();
        let tag = reader.read_u8()?;
        if tag == 0 {
            break;
        }

        let len = (tag & 0x7F) as usize;
        let name = String::from_utf8_lossy(reader.read_bytes(len)?);
        let path = format!("{}{}", prefix, name);

        if tag & 0x80 == 0 {
            let slot = names
                .get_mut(file_id)
                .ok_or_else(|| corrupt(position, "file id out of range"))?;
            *slot = Some(path);
            file_id += 1;
        } else {
            let dir_id = reader.read_u16()?;
            let child = dir_id.wrapping_sub(DIR_ID_BASE) as usize;
            read_directory(fnt, child, &format!("{}/", path), dir_count, visited, names)?;
        }
    }

    Ok(())
}

fn corrupt(offset: usize, reason: &str) -> Error {
    Error::CorruptStream {
        offset,
        reason: format!("file name table: {}", reason),
    }
}

/// A directory being laid out for writing.
#[derive(Debug, Default)]
struct Directory {
    name: String,
    parent: usize,
    files: Vec<(usize, String)>,
    subdirs: Vec<usize>,
}

/// Name table layout produced for a set of paths.
#[derive(Debug)]
pub(crate) struct NameTable {
    /// Encoded `BTNF` payload (without section header or padding).
    pub bytes: Vec<u8>,
    /// Entry indices in file-id order.
    pub file_order: Vec<usize>,
}

/// Build the name table for `paths`, assigning file ids directory by directory.
pub(crate) fn build_names<'a>(paths: impl IntoIterator<Item = &'a str>) -> Result<NameTable> {
    let mut dirs = vec![Directory::default()];

    for (entry, path) in paths.into_iter().enumerate() {
        let mut segments: Vec<&str> = path.split('/').collect();
        let file_name = segments.pop().unwrap_or_default();
        validate_segment(path, file_name)?;

        let mut current = 0;
        for segment in segments {
            validate_segment(path, segment)?;
            let existing = dirs[current]
                .subdirs
                .iter()
                .copied()
                .find(|&d| dirs[d].name == segment);
            current = match existing {
                Some(existing) => existing,
                None => {
                    dirs.push(Directory {
                        name: segment.to_string(),
                        parent: current,
                        ..Directory::default()
                    });
                    let created = dirs.len() - 1;
                    dirs[current].subdirs.push(created);
                    created
                }
            };
        }
        dirs[current].files.push((entry, file_name.to_string()));
    }

    if dirs.len() > (u16::MAX - DIR_ID_BASE) as usize {
        return Err(Error::TooLarge(format!("{} directories", dirs.len())));
    }

    // Depth-first order decides both directory ids and file ids.
    let mut order = Vec::with_capacity(dirs.len());
    let mut stack = vec![0usize];
    while let Some(dir) = stack.pop() {
        order.push(dir);
        stack.extend(dirs[dir].subdirs.iter().rev());
    }
    let mut new_id = vec![0usize; dirs.len()];
    for (id, &dir) in order.iter().enumerate() {
        new_id[dir] = id;
    }

    let mut main = BinaryWriter::new(Endian::Little);
    let mut lists = BinaryWriter::new(Endian::Little);
    let main_size = order.len() * 8;
    let mut file_order = Vec::new();

    for &dir in &order {
        let directory = &dirs[dir];
        main.write_u32((main_size + lists.position()) as u32);
        main.write_u16(file_order.len() as u16);
        if dir == 0 {
            main.write_u16(order.len() as u16);
        } else {
            main.write_u16(DIR_ID_BASE | new_id[directory.parent] as u16);
        }

        for (entry, name) in &directory.files {
            lists.write_u8(name.len() as u8);
            lists.write_bytes(name.as_bytes());
            file_order.push(*entry);
        }
        for &sub in &directory.subdirs {
            let name = &dirs[sub].name;
            lists.write_u8(0x80 | name.len() as u8);
            lists.write_bytes(name.as_bytes());
            lists.write_u16(DIR_ID_BASE | new_id[sub] as u16);
        }
        lists.write_u8(0);
    }

    if file_order.len() > u16::MAX as usize {
        return Err(Error::TooLarge(format!("{} files", file_order.len())));
    }

    let mut bytes = main.into_inner();
    bytes.extend_from_slice(lists.as_slice());
    Ok(NameTable { bytes, file_order })
}

fn validate_segment(path: &str, segment: &str) -> Result<()> {
    let reason = if segment.is_empty() {
        "empty path segment"
    } else if segment.len() > MAX_NAME_LEN {
        "path segment longer than 127 bytes"
    } else {
        return Ok(());
    };
    Err(Error::InvalidName {
        name: path.to_string(),
        reason,
    })
}
