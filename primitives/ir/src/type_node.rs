//! Resolved type trees.
//!
//! A [`TypeNode`] is the backend-neutral answer to "what travels over the
//! wire here". Named records and enums are referenced by name and defined
//! once in the IR's type registry, which keeps recursive records finite.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// Signed or unsigned integers of any width
    Integer,
    /// Floating point numbers
    Float,
    /// Booleans
    Boolean,
    /// UTF-8 text
    Text,
    /// Raw bytes
    Binary,
    /// A point in time (UTC)
    DateTime,
    /// The empty value
    Unit,
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order.
    pub const ALL: [PrimitiveKind; 7] = [
        PrimitiveKind::Integer,
        PrimitiveKind::Float,
        PrimitiveKind::Boolean,
        PrimitiveKind::Text,
        PrimitiveKind::Binary,
        PrimitiveKind::DateTime,
        PrimitiveKind::Unit,
    ];

    /// The IR spelling of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Text => "text",
            PrimitiveKind::Binary => "binary",
            PrimitiveKind::DateTime => "datetime",
            PrimitiveKind::Unit => "unit",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNode {
    /// A primitive value
    Primitive(PrimitiveKind),
    /// A value that may be absent
    Optional(Box<TypeNode>),
    /// An ordered collection
    Sequence(Box<TypeNode>),
    /// A key/value collection
    Mapping(Box<TypeNode>, Box<TypeNode>),
    /// A reference to a record in the type registry
    Record(String),
    /// A reference to an enum in the type registry
    Enum(String),
    /// An ordered, possibly unbounded sequence delivered over time
    Stream(Box<TypeNode>),
}

impl TypeNode {
    /// Shorthand for a primitive node.
    pub fn primitive(kind: PrimitiveKind) -> Self { TypeNode::Primitive(kind) }

    /// Shorthand for a text node.
    pub fn text() -> Self { TypeNode::Primitive(PrimitiveKind::Text) }

    /// Wraps `inner` in an optional node.
    pub fn optional(inner: TypeNode) -> Self { TypeNode::Optional(Box::new(inner)) }

    /// Wraps `inner` in a sequence node.
    pub fn sequence(inner: TypeNode) -> Self { TypeNode::Sequence(Box::new(inner)) }

    /// Builds a mapping node.
    pub fn mapping(key: TypeNode, value: TypeNode) -> Self {
        TypeNode::Mapping(Box::new(key), Box::new(value))
    }

    /// Wraps `inner` in a stream node.
    pub fn stream(inner: TypeNode) -> Self { TypeNode::Stream(Box::new(inner)) }

    /// Returns the item type when this node is a stream.
    pub fn stream_item(&self) -> Option<&TypeNode> {
        match self {
            TypeNode::Stream(inner) => Some(inner),
            _ => None,
        }
    }

    /// Whether this node is a stream at the top level.
    pub fn is_stream(&self) -> bool { matches!(self, TypeNode::Stream(_)) }

    /// Whether this node is optional at the top level.
    pub fn is_optional(&self) -> bool { matches!(self, TypeNode::Optional(_)) }

    /// Whether this node is the unit primitive.
    pub fn is_unit(&self) -> bool { matches!(self, TypeNode::Primitive(PrimitiveKind::Unit)) }

    /// Whether a stream occurs anywhere in this tree, including the top level.
    pub fn contains_stream(&self) -> bool {
        match self {
            TypeNode::Stream(_) => true,
            TypeNode::Optional(inner) | TypeNode::Sequence(inner) => inner.contains_stream(),
            TypeNode::Mapping(key, value) => key.contains_stream() || value.contains_stream(),
            TypeNode::Primitive(_) | TypeNode::Record(_) | TypeNode::Enum(_) => false,
        }
    }

    /// Names of every record and enum referenced by this tree, in visiting order.
    pub fn named_references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            TypeNode::Record(name) | TypeNode::Enum(name) => names.push(name),
            TypeNode::Optional(inner) | TypeNode::Sequence(inner) | TypeNode::Stream(inner) =>
                inner.collect_names(names),
            TypeNode::Mapping(key, value) => {
                key.collect_names(names);
                value.collect_names(names);
            }
            TypeNode::Primitive(_) => {}
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Primitive(kind) => write!(f, "{}", kind),
            TypeNode::Optional(inner) => write!(f, "optional<{}>", inner),
            TypeNode::Sequence(inner) => write!(f, "sequence<{}>", inner),
            TypeNode::Mapping(key, value) => write!(f, "mapping<{}, {}>", key, value),
            TypeNode::Record(name) | TypeNode::Enum(name) => f.write_str(name),
            TypeNode::Stream(inner) => write!(f, "stream<{}>", inner),
        }
    }
}
