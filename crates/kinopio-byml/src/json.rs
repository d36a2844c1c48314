//! JSON rendering of documents for inspection.

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::node::Node;
use crate::{Byml, Result};

const MAX_DEPTH: usize = 512;

/// Serializable view of a document, rooted at its root node.
///
/// Binary data is rendered as an array of bytes; parameterized binaries as
/// `{"data": [...], "param": n}`. A document without a root renders as
/// `null`.
#[derive(Debug, Clone, Copy)]
pub struct JsonView<'a> {
    doc: &'a Byml,
    node: Option<&'a Node>,
    depth: usize,
}

impl Byml {
    /// View the whole document as JSON.
    pub fn json_view(&self) -> JsonView<'_> {
        JsonView {
            doc: self,
            node: self.root(),
            depth: 0,
        }
    }

    /// View a single node as JSON.
    pub fn json_view_of<'a>(&'a self, node: &'a Node) -> JsonView<'a> {
        JsonView {
            doc: self,
            node: Some(node),
            depth: 0,
        }
    }

    /// Render the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.json_view())?)
    }
}

impl<'a> JsonView<'a> {
    fn child(&self, node: &'a Node) -> Self {
        Self {
            doc: self.doc,
            node: Some(node),
            depth: self.depth + 1,
        }
    }
}

impl Serialize for JsonView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.depth > MAX_DEPTH {
            return Err(S::Error::custom("containers nested too deeply (cyclic document?)"));
        }
        let Some(node) = self.node else {
            return serializer.serialize_unit();
        };

        match node {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(value) => serializer.serialize_bool(*value),
            Node::Int(value) => serializer.serialize_i32(*value),
            Node::UInt(value) => serializer.serialize_u32(*value),
            Node::Int64(value) => serializer.serialize_i64(*value),
            Node::UInt64(value) => serializer.serialize_u64(*value),
            Node::Float(value) => serializer.serialize_f32(*value),
            Node::Double(value) => serializer.serialize_f64(*value),
            Node::String(value) => serializer.serialize_str(value),
            Node::Binary(data) => data.serialize(serializer),
            Node::BinaryParam { data, param } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("data", data)?;
                map.serialize_entry("param", param)?;
                map.end()
            }
            Node::Array(_) => {
                let items = self
                    .doc
                    .array(node)
                    .ok_or_else(|| S::Error::custom("array refers to a missing container"))?;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            Node::Dictionary(_) => {
                let entries = self
                    .doc
                    .dictionary(node)
                    .ok_or_else(|| S::Error::custom("dictionary refers to a missing container"))?;
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, &self.child(value))?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use kinopio_common::Endian;
    use serde_json::json;

    use super::*;
    use crate::Dictionary;

    #[test]
    fn test_json_view() {
        let mut doc = Byml::new(Endian::Little, 1);
        let points = doc.add_array_with(vec![Node::Float(0.5), Node::Null]);
        let mut entries = Dictionary::new();
        entries.insert("name".into(), Node::from("Kuribo"));
        entries.insert("l_id".into(), Node::Int(3));
        entries.insert("Points".into(), points);
        entries.insert(
            "Blob".into(),
            Node::BinaryParam {
                data: vec![1, 2],
                param: 4,
            },
        );
        let root = doc.add_dictionary_with(entries);
        doc.set_root(root);

        let value = serde_json::to_value(doc.json_view()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Kuribo",
                "l_id": 3,
                "Points": [0.5, null],
                "Blob": {"data": [1, 2], "param": 4},
            })
        );

        let points = &doc.root_dictionary().unwrap()["Points"];
        assert_eq!(serde_json::to_value(doc.json_view_of(points)).unwrap(), json!([0.5, null]));
    }

    #[test]
    fn test_cyclic_document_fails() {
        let mut doc = Byml::new(Endian::Little, 2);
        let root = doc.add_array();
        doc.array_mut(&root).unwrap().push(root.clone());
        doc.set_root(root);
        assert!(serde_json::to_string(&doc.json_view()).is_err());
    }

    #[test]
    fn test_empty_document_is_null() {
        let doc = Byml::new(Endian::Big, 2);
        assert_eq!(serde_json::to_string(&doc.json_view()).unwrap(), "null");
    }
}
