//! Object name to creator class lookup.
//!
//! `SystemData/CreatorClassNameTable.szs` holds a single document whose root
//! is an array of `{ClassName, ObjectName}` records.

use std::hash::BuildHasherDefault;

use hashbrown::HashMap;
use kinopio_byml::{Byml, DecodeOptions};
use kinopio_narc::Narc;
use rustc_hash::FxHasher;

use crate::{Error, Result};

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Archive holding the class table, relative to the game's root directory.
pub const CLASS_TABLE_PATH: &str = "SystemData/CreatorClassNameTable.szs";

/// Entry inside [`CLASS_TABLE_PATH`].
pub const CLASS_TABLE_ENTRY: &str = "CreatorClassNameTable.byml";

/// Maps object names to the class that creates them.
#[derive(Debug, Clone, Default)]
pub struct ClassNameTable {
    classes: FxHashMap<String, String>,
}

impl ClassNameTable {
    /// Read the table out of a document. Records missing either name are skipped.
    pub fn from_byml(doc: &Byml) -> Result<Self> {
        let root = doc
            .root()
            .ok_or_else(|| Error::MalformedStage("class table has no root".to_string()))?;
        let records = doc
            .array(root)
            .ok_or_else(|| Error::MalformedStage("class table root is not an array".to_string()))?;

        let mut classes = FxHashMap::default();
        for (i, record) in records.iter().enumerate() {
            let entry = doc.dictionary(record).and_then(|entries| {
                let class = entries.get("ClassName")?.as_str()?;
                let object = entries.get("ObjectName")?.as_str()?;
                Some((object.to_string(), class.to_string()))
            });
            match entry {
                Some((object, class)) => {
                    classes.insert(object, class);
                }
                None => tracing::warn!(index = i, "skipping malformed class table record"),
            }
        }

        tracing::debug!(entries = classes.len(), "loaded class name table");
        Ok(Self { classes })
    }

    /// Read the table from the contents of [`CLASS_TABLE_PATH`].
    pub fn from_archive(data: &[u8], options: &DecodeOptions) -> Result<Self> {
        let narc = Narc::read(data)?;
        let entry = narc
            .get(CLASS_TABLE_ENTRY)
            .ok_or_else(|| Error::MissingEntry(CLASS_TABLE_ENTRY.to_string()))?;
        Self::from_byml(&Byml::parse_with(entry, options)?)
    }

    /// Class of `object_name`.
    pub fn class_of(&self, object_name: &str) -> Option<&str> {
        self.classes.get(object_name).map(String::as_str)
    }

    pub fn insert(&mut self, object_name: impl Into<String>, class_name: impl Into<String>) {
        self.classes.insert(object_name.into(), class_name.into());
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use kinopio_byml::{Dictionary, Node};
    use kinopio_common::Endian;

    use super::*;

    fn record(doc: &mut Byml, class: &str, object: &str) -> Node {
        let mut entries = Dictionary::new();
        entries.insert("ClassName".into(), Node::from(class));
        entries.insert("ObjectName".into(), Node::from(object));
        doc.add_dictionary_with(entries)
    }

    fn table_doc() -> Byml {
        let mut doc = Byml::new(Endian::Little, 1);
        let kuribo = record(&mut doc, "Kuribo", "Kuribo");
        let big = record(&mut doc, "Kuribo", "KuriboBig");
        let root = doc.add_array_with(vec![kuribo, big, Node::Int(3)]);
        doc.set_root(root);
        doc
    }

    #[test]
    fn test_from_byml() {
        let table = ClassNameTable::from_byml(&table_doc()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.class_of("KuriboBig"), Some("Kuribo"));
        assert_eq!(table.class_of("Nokonoko"), None);
    }

    #[test]
    fn test_from_archive() {
        let bytes = table_doc().to_bytes().unwrap();
        let mut narc = Narc::new();
        narc.insert(CLASS_TABLE_ENTRY, bytes).unwrap();
        let archive = narc.write_compressed(Some(9)).unwrap();

        let table = ClassNameTable::from_archive(&archive, &DecodeOptions::default()).unwrap();
        assert_eq!(table.class_of("Kuribo"), Some("Kuribo"));

        let empty = Narc::new().write().unwrap();
        assert!(matches!(
            ClassNameTable::from_archive(&empty, &DecodeOptions::default()),
            Err(Error::MissingEntry(_))
        ));
    }

    #[test]
    fn test_dictionary_root_rejected() {
        let mut doc = Byml::new(Endian::Little, 1);
        let root = doc.add_dictionary();
        doc.set_root(root);
        assert!(matches!(ClassNameTable::from_byml(&doc), Err(Error::MalformedStage(_))));
    }
}
