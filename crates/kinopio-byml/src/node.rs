//! Node values and container storage.

use std::collections::BTreeMap;

use crate::NodeType;

/// Handle of a container in a document's arena.
///
/// Two nodes that decode from the same on-disk container share a `NodeId`,
/// which makes it usable as an identity for cross references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the container in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dictionary contents. Keys are unique and iteration is sorted.
pub type Dictionary = BTreeMap<String, Node>;

/// A single BYML value.
///
/// Scalars are stored inline; arrays and dictionaries refer to a slot of
/// the owning [`Byml`](crate::Byml) document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    BinaryParam { data: Vec<u8>, param: u32 },
    Array(NodeId),
    Dictionary(NodeId),
}

impl Node {
    /// On-disk tag this node is written with.
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Null => NodeType::Null,
            Node::Bool(_) => NodeType::Bool,
            Node::Int(_) => NodeType::Int,
            Node::UInt(_) => NodeType::UInt,
            Node::Int64(_) => NodeType::Int64,
            Node::UInt64(_) => NodeType::UInt64,
            Node::Float(_) => NodeType::Float,
            Node::Double(_) => NodeType::Double,
            Node::String(_) => NodeType::String,
            Node::Binary(_) => NodeType::Binary,
            Node::BinaryParam { .. } => NodeType::BinaryParam,
            Node::Array(_) => NodeType::Array,
            Node::Dictionary(_) => NodeType::Dictionary,
        }
    }

    /// Arena slot of an array or dictionary.
    pub fn container_id(&self) -> Option<NodeId> {
        match self {
            Node::Array(id) | Node::Dictionary(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer value of any integer node that fits in an `i32`.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Node::Int(value) => Some(value),
            Node::UInt(value) => i32::try_from(value).ok(),
            Node::Int64(value) => i32::try_from(value).ok(),
            Node::UInt64(value) => i32::try_from(value).ok(),
            _ => None,
        }
    }

    /// Integer value of any integer node that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Node::Int(value) => Some(value.into()),
            Node::UInt(value) => Some(value.into()),
            Node::Int64(value) => Some(value),
            Node::UInt64(value) => i64::try_from(value).ok(),
            _ => None,
        }
    }

    /// Floating point value; integer nodes are widened.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Node::Float(value) => Some(value),
            Node::Double(value) => Some(value as f32),
            Node::Int(value) => Some(value as f32),
            Node::UInt(value) => Some(value as f32),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Node::Double(value) => Some(value),
            Node::Float(value) => Some(value.into()),
            Node::Int(value) => Some(value.into()),
            Node::UInt(value) => Some(value.into()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Node::Binary(data) | Node::BinaryParam { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Int(value)
    }
}

impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Node::UInt(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int64(value)
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Node::UInt64(value)
    }
}

impl From<f32> for Node {
    fn from(value: f32) -> Self {
        Node::Float(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Double(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

/// Arena slot contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    Array(Vec<Node>),
    Dictionary(Dictionary),
}

impl Container {
    pub(crate) fn kind(&self) -> NodeType {
        match self {
            Container::Array(_) => NodeType::Array,
            Container::Dictionary(_) => NodeType::Dictionary,
        }
    }

    /// Child nodes in on-disk order.
    pub fn values(&self) -> Box<dyn Iterator<Item = &Node> + '_> {
        match self {
            Container::Array(items) => Box::new(items.iter()),
            Container::Dictionary(entries) => Box::new(entries.values()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Node::UInt(7).as_i32(), Some(7));
        assert_eq!(Node::UInt(u32::MAX).as_i32(), None);
        assert_eq!(Node::Int(-3).as_f32(), Some(-3.0));
        assert_eq!(Node::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Node::String("x".into()).as_i32(), None);
        assert_eq!(Node::from("Kuribo").as_str(), Some("Kuribo"));
    }

    #[test]
    fn test_node_type() {
        assert_eq!(Node::Null.node_type(), NodeType::Null);
        assert_eq!(Node::Array(NodeId::new(0)).node_type(), NodeType::Array);
        assert_eq!(
            Node::BinaryParam { data: vec![], param: 1 }.node_type(),
            NodeType::BinaryParam
        );
        assert_eq!(Node::Dictionary(NodeId::new(3)).container_id(), Some(NodeId::new(3)));
        assert_eq!(Node::Int(1).container_id(), None);
    }
}
