use serde::{Deserialize, Serialize};

use crate::{SourceIdentity, TypeExpr};

/// What the entrypoint marker was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntrypointKind {
    /// A struct or an inherent `impl` block
    #[default]
    Type,
    /// A trait definition
    Trait,
}

/// How a method takes `self`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    /// `&self`
    #[default]
    Ref,
    /// `&mut self`
    Mut,
    /// `self`
    Owned,
}

impl Receiver {
    /// Rust spelling of the receiver.
    pub fn as_str(&self) -> &'static str {
        match self {
            Receiver::Ref => "&self",
            Receiver::Mut => "&mut self",
            Receiver::Owned => "self",
        }
    }
}

/// A method parameter as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParam {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: TypeExpr,
}

/// A public method of an entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMethod {
    /// Method name
    pub name: String,
    /// Receiver form
    #[serde(default)]
    pub receiver: Receiver,
    /// Declared with `async fn` or returning `impl Future`
    #[serde(default)]
    pub is_async: bool,
    /// The returned future is bounded by `Send`; never true for `async fn`
    #[serde(default)]
    pub send_future: bool,
    /// Parameters in declaration order, receiver excluded
    pub params: Vec<RawParam>,
    /// Declared return type; `None` for `-> ()` written implicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeExpr>,
    /// Doc comment text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A type or trait explicitly marked as a service entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntrypoint {
    /// Service name; the type name unless overridden by the marker
    pub name: String,
    /// Type or trait
    #[serde(default)]
    pub kind: EntrypointKind,
    /// Where the marked item is defined
    pub source: SourceIdentity,
    /// Doc comment text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Public methods in declaration order
    pub methods: Vec<RawMethod>,
}

impl RawEntrypoint {
    /// Module in which the entrypoint's types are written.
    pub fn scope(&self) -> &[String] { &self.source.module }
}
