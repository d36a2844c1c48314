//! Free-form values for fields the object model does not claim.

use std::collections::BTreeMap;

use kinopio_byml::{Byml, Dictionary, Node};

use crate::{Error, Result};

const MAX_DEPTH: usize = 512;

/// Copies one document may make of each node it holds, on average.
const EXPANSION_FACTOR: usize = 16;
const MIN_EXPANSION: usize = 1 << 16;

/// Number of values that may be copied out of `doc` in total.
///
/// Containers can be shared, so a small document can describe an
/// exponentially large tree. Copying stops once this runs out.
pub(crate) fn expansion_budget(doc: &Byml) -> usize {
    doc.node_count().saturating_mul(EXPANSION_FACTOR).max(MIN_EXPANSION)
}

/// Unclaimed record fields, sorted by key.
pub type Properties = BTreeMap<String, Property>;

/// A detached copy of a BYML value.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
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
    Array(Vec<Property>),
    Map(Properties),
}

impl Property {
    /// Copy `node` and everything below it out of `doc`.
    ///
    /// Fails with [`Error::MalformedStage`] if shared containers expand to
    /// far more values than the document holds.
    pub fn from_node(doc: &Byml, node: &Node) -> Result<Self> {
        let mut budget = expansion_budget(doc);
        Self::from_node_within(doc, node, &mut budget)
    }

    /// Like [`from_node`](Self::from_node), drawing on a budget shared with other copies.
    pub(crate) fn from_node_within(doc: &Byml, node: &Node, budget: &mut usize) -> Result<Self> {
        Self::from_node_at(doc, node, 0, budget)
    }

    fn from_node_at(doc: &Byml, node: &Node, depth: usize, budget: &mut usize) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(Error::MalformedStage("properties nested too deeply".to_string()));
        }
        *budget = budget
            .checked_sub(1)
            .ok_or_else(|| Error::MalformedStage("shared containers expand past the document size".to_string()))?;
        Ok(match node {
            Node::Null => Property::Null,
            Node::Bool(value) => Property::Bool(*value),
            Node::Int(value) => Property::Int(*value),
            Node::UInt(value) => Property::UInt(*value),
            Node::Int64(value) => Property::Int64(*value),
            Node::UInt64(value) => Property::UInt64(*value),
            Node::Float(value) => Property::Float(*value),
            Node::Double(value) => Property::Double(*value),
            Node::String(value) => Property::String(value.clone()),
            Node::Binary(data) => Property::Binary(data.clone()),
            Node::BinaryParam { data, param } => Property::BinaryParam {
                data: data.clone(),
                param: *param,
            },
            Node::Array(_) => {
                let items = doc.array(node).ok_or_else(|| missing_container(node))?;
                Property::Array(
                    items
                        .iter()
                        .map(|item| Self::from_node_at(doc, item, depth + 1, budget))
                        .collect::<Result<_>>()?,
                )
            }
            Node::Dictionary(_) => {
                let entries = doc.dictionary(node).ok_or_else(|| missing_container(node))?;
                Property::Map(
                    entries
                        .iter()
                        .map(|(key, value)| Ok((key.clone(), Self::from_node_at(doc, value, depth + 1, budget)?)))
                        .collect::<Result<_>>()?,
                )
            }
        })
    }

    /// Write the value into `doc`, allocating containers as needed.
    pub fn to_node(&self, doc: &mut Byml) -> Node {
        match self {
            Property::Null => Node::Null,
            Property::Bool(value) => Node::Bool(*value),
            Property::Int(value) => Node::Int(*value),
            Property::UInt(value) => Node::UInt(*value),
            Property::Int64(value) => Node::Int64(*value),
            Property::UInt64(value) => Node::UInt64(*value),
            Property::Float(value) => Node::Float(*value),
            Property::Double(value) => Node::Double(*value),
            Property::String(value) => Node::String(value.clone()),
            Property::Binary(data) => Node::Binary(data.clone()),
            Property::BinaryParam { data, param } => Node::BinaryParam {
                data: data.clone(),
                param: *param,
            },
            Property::Array(items) => {
                let items = items.iter().map(|item| item.to_node(doc)).collect();
                doc.add_array_with(items)
            }
            Property::Map(entries) => {
                let entries: Dictionary = entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_node(doc)))
                    .collect();
                doc.add_dictionary_with(entries)
            }
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Property::Int(value) => Some(value),
            Property::UInt(value) => i32::try_from(value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Properties> {
        match self {
            Property::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

fn missing_container(node: &Node) -> Error {
    Error::MalformedStage(format!("{:?} refers to a missing container", node))
}

impl From<i32> for Property {
    fn from(value: i32) -> Self {
        Property::Int(value)
    }
}

impl From<f32> for Property {
    fn from(value: f32) -> Self {
        Property::Float(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::String(value.to_string())
    }
}
