//! The BYML document: an arena of containers plus a root node.

use kinopio_common::Endian;

use crate::node::{Container, Dictionary, Node, NodeId};
use crate::{parser, writer, DecodeOptions, EncodeOptions, Error, NodeType, Result};

/// A decoded or hand-built BYML document.
///
/// Arrays and dictionaries are owned by the document and addressed through
/// [`NodeId`]s. A container may be referenced from several places; the
/// writer emits it once and points every reference at the same offset.
///
/// # Example
///
/// ```
/// use kinopio_byml::{Byml, Node};
/// use kinopio_common::Endian;
///
/// let mut doc = Byml::new(Endian::Little, 2);
/// let root = doc.add_dictionary();
/// doc.dictionary_mut(&root).unwrap().insert("name".into(), Node::from("Kuribo"));
/// doc.set_root(root);
///
/// let bytes = doc.to_bytes().unwrap();
/// let decoded = Byml::parse(&bytes).unwrap();
/// let root = decoded.root_dictionary().unwrap();
/// assert_eq!(root["name"].as_str(), Some("Kuribo"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Byml {
    endian: Endian,
    version: u16,
    root: Option<Node>,
    containers: Vec<Container>,
}

impl Byml {
    /// Create an empty document with no root.
    pub fn new(endian: Endian, version: u16) -> Self {
        Self {
            endian,
            version,
            root: None,
            containers: Vec::new(),
        }
    }

    pub(crate) fn from_parts(endian: Endian, version: u16, root: Option<Node>, containers: Vec<Container>) -> Self {
        Self {
            endian,
            version,
            root,
            containers,
        }
    }

    /// Decode a document using Shift-JIS text.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, &DecodeOptions::default())
    }

    /// Decode a document.
    pub fn parse_with(data: &[u8], options: &DecodeOptions) -> Result<Self> {
        parser::parse(data, options)
    }

    /// Encode with the document's byte order and version, Shift-JIS text.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(&EncodeOptions::default())
    }

    /// Encode the document.
    pub fn to_bytes_with(&self, options: &EncodeOptions) -> Result<Vec<u8>> {
        writer::write(self, options)
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn set_version(&mut self, version: u16) {
        self.version = version;
    }

    /// Root node, if the document has one.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Replace the root. Only arrays and dictionaries are valid roots.
    pub fn set_root(&mut self, root: Node) {
        self.root = Some(root);
    }

    /// The root as a dictionary, as stage files require.
    pub fn root_dictionary(&self) -> Result<&Dictionary> {
        match &self.root {
            Some(node @ Node::Dictionary(_)) => self
                .dictionary(node)
                .ok_or_else(|| Error::MalformedStage("root refers to a missing container".to_string())),
            Some(other) => Err(Error::MalformedStage(format!(
                "root is {:?}, expected a dictionary",
                other.node_type()
            ))),
            None => Err(Error::MalformedStage("document has no root".to_string())),
        }
    }

    /// Append an empty array to the arena.
    pub fn add_array(&mut self) -> Node {
        Node::Array(self.push(Container::Array(Vec::new())))
    }

    /// Append an array holding `items`.
    pub fn add_array_with(&mut self, items: Vec<Node>) -> Node {
        Node::Array(self.push(Container::Array(items)))
    }

    /// Append an empty dictionary to the arena.
    pub fn add_dictionary(&mut self) -> Node {
        Node::Dictionary(self.push(Container::Dictionary(Dictionary::new())))
    }

    /// Append a dictionary holding `entries`.
    pub fn add_dictionary_with(&mut self, entries: Dictionary) -> Node {
        Node::Dictionary(self.push(Container::Dictionary(entries)))
    }

    fn push(&mut self, container: Container) -> NodeId {
        self.containers.push(container);
        NodeId::new(self.containers.len() - 1)
    }

    /// Items of an array node.
    pub fn array(&self, node: &Node) -> Option<&[Node]> {
        match (node, node.container_id().and_then(|id| self.containers.get(id.index()))) {
            (Node::Array(_), Some(Container::Array(items))) => Some(items),
            _ => None,
        }
    }

    pub fn array_mut(&mut self, node: &Node) -> Option<&mut Vec<Node>> {
        match (node, node.container_id().and_then(|id| self.containers.get_mut(id.index()))) {
            (Node::Array(_), Some(Container::Array(items))) => Some(items),
            _ => None,
        }
    }

    /// Entries of a dictionary node.
    pub fn dictionary(&self, node: &Node) -> Option<&Dictionary> {
        match (node, node.container_id().and_then(|id| self.containers.get(id.index()))) {
            (Node::Dictionary(_), Some(Container::Dictionary(entries))) => Some(entries),
            _ => None,
        }
    }

    pub fn dictionary_mut(&mut self, node: &Node) -> Option<&mut Dictionary> {
        match (node, node.container_id().and_then(|id| self.containers.get_mut(id.index()))) {
            (Node::Dictionary(_), Some(Container::Dictionary(entries))) => Some(entries),
            _ => None,
        }
    }

    /// Container stored at `id`.
    pub fn container(&self, id: NodeId) -> Option<&Container> {
        self.containers.get(id.index())
    }

    /// Number of containers in the arena, reachable or not.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Containers plus every value they hold, counting shared containers once.
    pub fn node_count(&self) -> usize {
        self.containers.iter().map(|container| container.values().count() + 1).sum()
    }

    /// Resolve a container node, checking that the slot has the node's kind.
    pub(crate) fn resolve(&self, node: &Node) -> Result<(NodeId, &Container)> {
        let Some(id) = node.container_id() else {
            return Err(Error::UnexpectedNode {
                expected: NodeType::Dictionary,
                actual: node.node_type(),
                offset: 0,
            });
        };
        match self.containers.get(id.index()) {
            Some(container) if container.kind() == node.node_type() => Ok((id, container)),
            _ => Err(Error::InvalidNodeId(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_access() {
        let mut doc = Byml::new(Endian::Big, 2);
        let points = doc.add_array_with(vec![Node::Int(1), Node::Int(2)]);
        let root = doc.add_dictionary();
        doc.dictionary_mut(&root).unwrap().insert("Points".into(), points.clone());
        doc.set_root(root.clone());

        assert_eq!(doc.container_count(), 2);
        assert_eq!(doc.array(&points).unwrap(), &[Node::Int(1), Node::Int(2)]);
        assert!(doc.dictionary(&points).is_none());
        assert!(doc.array(&root).is_none());
        assert_eq!(doc.root_dictionary().unwrap().len(), 1);

        assert_eq!(doc.node_count(), 5);

        doc.array_mut(&points).unwrap().push(Node::Null);
        assert_eq!(doc.array(&points).unwrap().len(), 3);
        assert_eq!(doc.node_count(), 6);
    }

    #[test]
    fn test_root_dictionary_errors() {
        let mut doc = Byml::new(Endian::Little, 2);
        assert!(matches!(doc.root_dictionary(), Err(Error::MalformedStage(_))));

        let array = doc.add_array();
        doc.set_root(array);
        assert!(matches!(doc.root_dictionary(), Err(Error::MalformedStage(_))));
    }
}
