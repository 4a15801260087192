use std::fmt;

use serde::{Deserialize, Serialize};

/// A Rust type as written in the domain source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    /// `a::b::Name<Args, Item = T>`; generic arguments belong to the last segment
    Path {
        /// Path segments, e.g. `["std", "vec", "Vec"]`
        segments: Vec<String>,
        /// Generic type arguments of the last segment
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeExpr>,
        /// Associated type bindings such as `Item = T`
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bindings: Vec<(String, TypeExpr)>,
    },
    /// `&T` or `&mut T`
    Reference {
        /// `&mut`
        mutable: bool,
        /// Borrowed type
        inner: Box<TypeExpr>,
    },
    /// `[T]`
    Slice(Box<TypeExpr>),
    /// `[T; N]`
    Array(Box<TypeExpr>),
    /// `(A, B)`; the empty tuple is the unit type
    Tuple(Vec<TypeExpr>),
    /// `impl Bound + Bound`
    ImplTrait(Vec<TypeExpr>),
    /// `dyn Bound + Bound`
    TraitObject(Vec<TypeExpr>),
    /// Anything else, kept as source text for diagnostics
    Opaque(String),
}

impl TypeExpr {
    /// A path without generic arguments.
    pub fn named(path: &str) -> Self {
        TypeExpr::Path {
            segments: path.split("::").map(str::to_string).collect(),
            args: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// A path with generic arguments on its last segment.
    pub fn generic(path: &str, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Path {
            segments: path.split("::").map(str::to_string).collect(),
            args,
            bindings: Vec::new(),
        }
    }

    /// A shared reference to `inner`.
    pub fn reference(inner: TypeExpr) -> Self {
        TypeExpr::Reference { mutable: false, inner: Box::new(inner) }
    }

    /// The unit type `()`.
    pub fn unit() -> Self { TypeExpr::Tuple(Vec::new()) }

    /// Whether this is `()`.
    pub fn is_unit(&self) -> bool { matches!(self, TypeExpr::Tuple(items) if items.is_empty()) }

    /// Last path segment, if this is a path.
    pub fn last_segment(&self) -> Option<&str> {
        match self {
            TypeExpr::Path { segments, .. } => segments.last().map(String::as_str),
            _ => None,
        }
    }

    /// Generic arguments, if this is a path.
    pub fn args(&self) -> &[TypeExpr] {
        match self {
            TypeExpr::Path { args, .. } => args,
            _ => &[],
        }
    }

    /// Associated type binding `name = T`, if this is a path carrying one.
    pub fn binding(&self, name: &str) -> Option<&TypeExpr> {
        match self {
            TypeExpr::Path { bindings, .. } => {
                bindings.iter().find(|(binding, _)| binding == name).map(|(_, ty)| ty)
            }
            _ => None,
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeExpr], separator: &str) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Path { segments, args, bindings } => {
                f.write_str(&segments.join("::"))?;
                if !args.is_empty() || !bindings.is_empty() {
                    f.write_str("<")?;
                    write_joined(f, args, ", ")?;
                    for (index, (name, ty)) in bindings.iter().enumerate() {
                        if index > 0 || !args.is_empty() {
                            f.write_str(", ")?;
                        }
                        write!(f, "{} = {}", name, ty)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeExpr::Reference { mutable, inner } =>
                write!(f, "&{}{}", if *mutable { "mut " } else { "" }, inner),
            TypeExpr::Slice(inner) => write!(f, "[{}]", inner),
            TypeExpr::Array(inner) => write!(f, "[{}; _]", inner),
            TypeExpr::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items, ", ")?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            TypeExpr::ImplTrait(bounds) => {
                f.write_str("impl ")?;
                write_joined(f, bounds, " + ")
            }
            TypeExpr::TraitObject(bounds) => {
                f.write_str("dyn ")?;
                write_joined(f, bounds, " + ")
            }
            TypeExpr::Opaque(text) => f.write_str(text),
        }
    }
}
