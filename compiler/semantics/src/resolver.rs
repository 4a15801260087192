//! Resolution of written Rust types into [`TypeNode`]s.
//!
//! The resolver walks a [`TypeExpr`] top-down. Well-known standard library
//! and `chrono` types map onto primitives and structural modifiers; every
//! other path is looked up in the [`DomainCatalog`] from the scope it was
//! written in. Completed records and enums are registered in the shared
//! [`TypeRegistry`] so that duplicates collapse and conflicts surface.

use std::collections::HashMap;

use ir::{EnumDef, EnumValue, FieldDef, PrimitiveKind, RecordDef, TypeDef, TypeNode};
use registry::TypeRegistry;
use types::{DomainCatalog, Lookup, RawEnum, RawRecord, RawTypeDef, SourceIdentity, TypeExpr};

use crate::{ResolveError, Result, TypeMappingError, TypePath};

/// Where a written type appears in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The whole type of a method parameter; may be borrowed or a stream
    Parameter,
    /// The whole return type of a method; may be a stream
    Return,
    /// The type of a record field
    Field,
}

/// The outcome of resolving a method's return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReturn {
    /// `None` when the method returns nothing
    pub returns: Option<TypeNode>,
    /// The method returned `Result<_, E>`
    pub fallible: bool,
}

/// Where the type currently being resolved sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Param,
    Return,
    /// Inside another construct, named for diagnostics
    Nested(&'static str),
}

struct Ctx<'p> {
    scope: &'p [String],
    path: &'p TypePath,
    site: Site,
}

impl<'p> Ctx<'p> {
    fn nested(&self, within: &'static str) -> Ctx<'p> {
        Ctx { scope: self.scope, path: self.path, site: Site::Nested(within) }
    }
}

#[derive(Debug)]
struct InProgress {
    source: SourceIdentity,
    indirection: usize,
}

/// Maps written types onto IR type nodes.
pub struct TypeResolver<'a> {
    catalog: &'a DomainCatalog,
    registry: &'a mut TypeRegistry,
    resolved: HashMap<SourceIdentity, TypeNode>,
    records: Vec<InProgress>,
    aliases: Vec<SourceIdentity>,
    indirection: usize,
}

impl<'a> TypeResolver<'a> {
    /// Create a resolver over `catalog` that registers into `registry`.
    pub fn new(catalog: &'a DomainCatalog, registry: &'a mut TypeRegistry) -> Self {
        Self {
            catalog,
            registry,
            resolved: HashMap::new(),
            records: Vec::new(),
            aliases: Vec::new(),
            indirection: 0,
        }
    }

    /// Resolve `ty`, written inside module `scope`, at `position`.
    pub fn resolve(
        &mut self,
        ty: &TypeExpr,
        scope: &[String],
        position: Position,
        path: &TypePath,
    ) -> Result<TypeNode> {
        let site = match position {
            Position::Parameter => Site::Param,
            Position::Return => Site::Return,
            Position::Field => Site::Nested("a record field"),
        };
        self.node(ty, &Ctx { scope, path, site })
    }

    /// Resolve a method's return type, unwrapping an outermost `Result`.
    ///
    /// `()` and a missing return type both mean "returns nothing", while
    /// `Result<(), E>` still returns a (unit) value.
    pub fn resolve_return(
        &mut self,
        ty: Option<&TypeExpr>,
        scope: &[String],
        path: &TypePath,
    ) -> Result<ResolvedReturn> {
        let Some(ty) = ty else {
            return Ok(ResolvedReturn { returns: None, fallible: false });
        };
        let (inner, fallible) = match (ty.last_segment(), ty.args().first()) {
            (Some("Result"), Some(ok)) => (ok, true),
            _ => (ty, false),
        };
        if inner.is_unit() {
            let returns = fallible.then(|| TypeNode::primitive(PrimitiveKind::Unit));
            return Ok(ResolvedReturn { returns, fallible });
        }
        let returns = self.resolve(inner, scope, Position::Return, path)?;
        Ok(ResolvedReturn { returns: Some(returns), fallible })
    }

    fn node(&mut self, ty: &TypeExpr, ctx: &Ctx<'_>) -> Result<TypeNode> {
        match ty {
            TypeExpr::Reference { mutable, inner } => {
                if ctx.site != Site::Param {
                    return Err(unsupported(
                        ty,
                        ctx,
                        "borrowed types are only supported as the whole type of a parameter",
                    ));
                }
                if *mutable {
                    return Err(unsupported(ty, ctx, "mutable borrows cannot be filled from a request"));
                }
                match inner.as_ref() {
                    TypeExpr::Slice(item) => self.slice(item, ctx),
                    other => self.node(other, &ctx.nested("a borrow")),
                }
            }
            TypeExpr::Slice(item) => self.slice(item, ctx),
            TypeExpr::Array(_) =>
                Err(unsupported(ty, ctx, "fixed-size arrays are not supported, use `Vec`")),
            TypeExpr::Tuple(items) if items.is_empty() =>
                Ok(TypeNode::primitive(PrimitiveKind::Unit)),
            TypeExpr::Tuple(_) =>
                Err(unsupported(ty, ctx, "tuples have no field names, use a struct")),
            TypeExpr::ImplTrait(bounds) | TypeExpr::TraitObject(bounds) => {
                let Some(stream) = bounds.iter().find(|bound| bound.last_segment() == Some("Stream"))
                else {
                    return Err(unsupported(
                        ty,
                        ctx,
                        "trait bounds other than `Stream<Item = T>` cannot cross the wire",
                    ));
                };
                match stream.binding("Item") {
                    Some(item) => self.stream(item, ctx),
                    None => Err(unsupported(ty, ctx, "stream bound has no `Item = T` binding")),
                }
            }
            TypeExpr::Opaque(_) => Err(unsupported(ty, ctx, "this kind of type cannot cross the wire")),
            TypeExpr::Path { segments, args, .. } => self.path(ty, segments, args, ctx),
        }
    }

    fn path(
        &mut self,
        ty: &TypeExpr,
        segments: &[String],
        args: &[TypeExpr],
        ctx: &Ctx<'_>,
    ) -> Result<TypeNode> {
        let name = segments.last().map(String::as_str).unwrap_or_default();
        match (name, args) {
            ("String" | "str", []) => Ok(TypeNode::text()),
            ("bool", []) => Ok(TypeNode::primitive(PrimitiveKind::Boolean)),
            (
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "u128" | "usize",
                [],
            ) => Ok(TypeNode::primitive(PrimitiveKind::Integer)),
            ("f32" | "f64", []) => Ok(TypeNode::primitive(PrimitiveKind::Float)),
            ("SystemTime", []) => Ok(TypeNode::primitive(PrimitiveKind::DateTime)),
            ("DateTime", [zone]) if zone.last_segment() == Some("Utc") =>
                Ok(TypeNode::primitive(PrimitiveKind::DateTime)),
            ("DateTime", _) => Err(unsupported(ty, ctx, "only `DateTime<Utc>` is supported")),
            ("Option", [inner]) => Ok(TypeNode::optional(self.node(inner, &ctx.nested("an optional"))?)),
            ("Vec", [item]) if is_byte(item) => Ok(TypeNode::primitive(PrimitiveKind::Binary)),
            ("Vec" | "VecDeque" | "HashSet" | "BTreeSet", [item]) => {
                let item = self.indirect(|resolver| resolver.node(item, &ctx.nested("a sequence")))?;
                Ok(TypeNode::sequence(item))
            }
            ("HashMap" | "BTreeMap", [key, value]) => self.mapping(key, value, ctx),
            ("Box" | "Arc", [inner]) => self.indirect(|resolver| resolver.node(inner, ctx)),
            ("Pin", [inner]) => self.node(inner, ctx),
            ("BoxStream" | "LocalBoxStream", [item]) => self.stream(item, ctx),
            ("Result", _) => Err(unsupported(
                ty,
                ctx,
                "`Result` is only supported as the whole return type of a method",
            )),
            (_, [_, ..]) => Err(unsupported(ty, ctx, "generic types cannot cross the wire")),
            _ => self.named(ty, segments, ctx),
        }
    }

    fn named(&mut self, ty: &TypeExpr, segments: &[String], ctx: &Ctx<'_>) -> Result<TypeNode> {
        let catalog = self.catalog;
        match catalog.lookup(segments, ctx.scope) {
            Lookup::Found(RawTypeDef::Record(record)) => self.record(record, ctx),
            Lookup::Found(RawTypeDef::Enum(def)) => self.enumeration(def),
            Lookup::Found(RawTypeDef::Alias { source, target }) => {
                if self.aliases.contains(source) {
                    return Err(TypeMappingError::RecursiveType {
                        path: ctx.path.clone(),
                        record: source.name.clone(),
                    }
                    .into());
                }
                self.aliases.push(source.clone());
                let resolved =
                    self.node(target, &Ctx { scope: &source.module, path: ctx.path, site: ctx.site });
                self.aliases.pop();
                resolved
            }
            Lookup::Found(RawTypeDef::Opaque { reason, .. }) => Err(unsupported(ty, ctx, reason.as_str())),
            Lookup::NotFound =>
                Err(unsupported(ty, ctx, "no definition was found in the scanned sources")),
            Lookup::Ambiguous(candidates) => {
                let candidates: Vec<String> =
                    candidates.iter().map(|source| source.to_string()).collect();
                Err(unsupported(
                    ty,
                    ctx,
                    format!("ambiguous name, candidates are {}", candidates.join(", ")),
                ))
            }
        }
    }

    fn record(&mut self, record: &RawRecord, ctx: &Ctx<'_>) -> Result<TypeNode> {
        let name = record.source.name.clone();
        if let Some(node) = self.resolved.get(&record.source) {
            return Ok(node.clone());
        }
        if let Some(open) = self.records.iter().find(|open| open.source == record.source) {
            if self.indirection > open.indirection {
                return Ok(TypeNode::Record(name));
            }
            return Err(TypeMappingError::RecursiveType { path: ctx.path.clone(), record: name }.into());
        }
        if let Some(field) = record.fields.iter().find(|field| !field.public) {
            return Err(TypeMappingError::UnsupportedType {
                path: ctx.path.clone(),
                ty: record.source.to_string(),
                reason: format!("field `{}` is private", field.name),
            }
            .into());
        }

        self.records.push(InProgress { source: record.source.clone(), indirection: self.indirection });
        let fields = self.record_fields(record, ctx.path);
        self.records.pop();

        let def = RecordDef {
            name: name.clone(),
            source: record.source.to_string(),
            merged_sources: Vec::new(),
            description: record.description.clone(),
            fields: fields?,
        };
        tracing::trace!(record = %name, source = %record.source, "resolved record");
        self.registry.register(TypeDef::Record(def))?;
        let node = TypeNode::Record(name);
        self.resolved.insert(record.source.clone(), node.clone());
        Ok(node)
    }

    fn record_fields(&mut self, record: &RawRecord, path: &TypePath) -> Result<Vec<FieldDef>> {
        record
            .fields
            .iter()
            .map(|field| {
                let path = path.field(&field.name);
                let ctx = Ctx {
                    scope: &record.source.module,
                    path: &path,
                    site: Site::Nested("a record field"),
                };
                Ok(FieldDef {
                    name: field.name.clone(),
                    ty: self.node(&field.ty, &ctx)?,
                    description: field.description.clone(),
                })
            })
            .collect()
    }

    fn enumeration(&mut self, def: &RawEnum) -> Result<TypeNode> {
        let node = TypeNode::Enum(def.source.name.clone());
        if !self.resolved.contains_key(&def.source) {
            self.registry.register(TypeDef::Enum(EnumDef {
                name: def.source.name.clone(),
                source: def.source.to_string(),
                merged_sources: Vec::new(),
                description: def.description.clone(),
                values: def
                    .variants
                    .iter()
                    .map(|variant| EnumValue {
                        name: variant.name.clone(),
                        description: variant.description.clone(),
                    })
                    .collect(),
            }))?;
            self.resolved.insert(def.source.clone(), node.clone());
        }
        Ok(node)
    }

    fn slice(&mut self, item: &TypeExpr, ctx: &Ctx<'_>) -> Result<TypeNode> {
        if is_byte(item) {
            return Ok(TypeNode::primitive(PrimitiveKind::Binary));
        }
        let item = self.indirect(|resolver| resolver.node(item, &ctx.nested("a sequence")))?;
        Ok(TypeNode::sequence(item))
    }

    fn mapping(&mut self, key: &TypeExpr, value: &TypeExpr, ctx: &Ctx<'_>) -> Result<TypeNode> {
        let key_node = self.node(key, &ctx.nested("a map key"))?;
        match key_node {
            TypeNode::Primitive(PrimitiveKind::Text | PrimitiveKind::Integer) | TypeNode::Enum(_) => {}
            _ => return Err(unsupported(key, ctx, "map keys must be strings, integers or enums")),
        }
        let value = self.indirect(|resolver| resolver.node(value, &ctx.nested("a map")))?;
        Ok(TypeNode::mapping(key_node, value))
    }

    fn stream(&mut self, item: &TypeExpr, ctx: &Ctx<'_>) -> Result<TypeNode> {
        if let Site::Nested(within) = ctx.site {
            return Err(TypeMappingError::AmbiguousShape {
                path: ctx.path.clone(),
                reason: format!(
                    "a stream inside {} has no interaction shape; a stream must be the whole type of a parameter or return",
                    within
                ),
            }
            .into());
        }
        Ok(TypeNode::stream(self.node(item, &ctx.nested("a stream"))?))
    }

    fn indirect<T>(&mut self, resolve: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.indirection += 1;
        let resolved = resolve(self);
        self.indirection -= 1;
        resolved
    }
}

fn is_byte(ty: &TypeExpr) -> bool { ty.last_segment() == Some("u8") && ty.args().is_empty() }

fn unsupported(ty: &TypeExpr, ctx: &Ctx<'_>, reason: impl Into<String>) -> ResolveError {
    TypeMappingError::UnsupportedType {
        path: ctx.path.clone(),
        ty: ty.to_string(),
        reason: reason.into(),
    }
    .into()
}
