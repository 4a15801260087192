use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::source::CRATE_ROOT;
use crate::{SourceIdentity, TypeExpr};

/// A named field of a struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeExpr,
    /// Declared with some `pub` visibility
    #[serde(default = "default_true")]
    pub public: bool,
    /// Doc comment text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool { true }

/// A struct with named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Where the struct is defined
    pub source: SourceIdentity,
    /// Doc comment text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields in declaration order
    pub fields: Vec<RawField>,
}

/// One unit variant of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVariant {
    /// Variant name
    pub name: String,
    /// Doc comment text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An enum whose variants carry no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnum {
    /// Where the enum is defined
    pub source: SourceIdentity,
    /// Doc comment text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Variants in declaration order
    pub variants: Vec<RawVariant>,
}

/// A named type definition found in the domain sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawTypeDef {
    /// Struct with named fields
    Record(RawRecord),
    /// Enum with unit variants only
    Enum(RawEnum),
    /// `type Name = Target;`
    Alias {
        /// Where the alias is defined
        source: SourceIdentity,
        /// Aliased type
        target: TypeExpr,
    },
    /// A definition that cannot cross the wire, with the reason why
    Opaque {
        /// Where the item is defined
        source: SourceIdentity,
        /// Human readable reason
        reason: String,
    },
}

impl RawTypeDef {
    /// Where the definition lives.
    pub fn source(&self) -> &SourceIdentity {
        match self {
            RawTypeDef::Record(record) => &record.source,
            RawTypeDef::Enum(def) => &def.source,
            RawTypeDef::Alias { source, .. } | RawTypeDef::Opaque { source, .. } => source,
        }
    }
}

/// A `use` declaration, flattened to one imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Name the import is visible under (`*` for globs)
    pub alias: String,
    /// Imported path as written (module path for globs)
    pub path: Vec<String>,
    /// `use path::*;`
    #[serde(default)]
    pub glob: bool,
}

/// Result of resolving a written path against the catalog.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Exactly one definition
    Found(&'a RawTypeDef),
    /// No definition with that name was scanned
    NotFound,
    /// Several definitions share the name and nothing disambiguates them
    Ambiguous(Vec<&'a SourceIdentity>),
}

/// Every named definition and import seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DomainCatalog {
    /// Definitions in discovery order
    #[serde(default)]
    definitions: Vec<RawTypeDef>,
    /// Imports keyed by module path (`crate::a::b`)
    #[serde(default)]
    imports: BTreeMap<String, Vec<Import>>,
}

fn module_key(module: &[String]) -> String { module.join("::") }

impl DomainCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self { Self::default() }

    /// Record a definition.
    pub fn insert(&mut self, def: RawTypeDef) { self.definitions.push(def); }

    /// Record an import visible in `module`.
    pub fn add_import(&mut self, module: &[String], import: Import) {
        self.imports.entry(module_key(module)).or_default().push(import);
    }

    /// Merge another catalog into this one.
    pub fn extend(&mut self, other: DomainCatalog) {
        self.definitions.extend(other.definitions);
        for (module, imports) in other.imports {
            self.imports.entry(module).or_default().extend(imports);
        }
    }

    /// All definitions in discovery order.
    pub fn definitions(&self) -> &[RawTypeDef] { &self.definitions }

    /// Number of definitions.
    pub fn len(&self) -> usize { self.definitions.len() }

    /// Whether no definition was recorded.
    pub fn is_empty(&self) -> bool { self.definitions.is_empty() }

    /// Imports visible in `module`.
    pub fn imports_of(&self, module: &[String]) -> &[Import] {
        self.imports.get(&module_key(module)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Definition with exactly this module and name.
    pub fn find_exact(&self, module: &[String], name: &str) -> Option<&RawTypeDef> {
        self.definitions.iter().find(|def| {
            let source = def.source();
            source.name == name && source.module == module
        })
    }

    /// Resolve a path written inside `scope` to a definition.
    ///
    /// Single names are looked up in the scope itself, then through named
    /// imports, then through glob imports, and finally by a unique name match
    /// across the whole catalog. Qualified paths are resolved relative to the
    /// scope and the crate root before falling back to suffix matching.
    pub fn lookup(&self, written: &[String], scope: &[String]) -> Lookup<'_> {
        let Some(name) = written.last() else {
            return Lookup::NotFound;
        };
        if written.len() > 1 {
            return self.lookup_path(written, scope);
        }
        if let Some(def) = self.find_exact(scope, name) {
            return Lookup::Found(def);
        }
        let imports = self.imports_of(scope);
        if let Some(import) = imports.iter().find(|import| !import.glob && import.alias == *name) {
            return self.lookup_path(&import.path, scope);
        }
        for import in imports.iter().filter(|import| import.glob) {
            for module in candidate_modules(&import.path, scope) {
                if let Some(def) = self.find_exact(&module, name) {
                    return Lookup::Found(def);
                }
            }
        }
        self.match_by_suffix(written)
    }

    fn lookup_path(&self, path: &[String], scope: &[String]) -> Lookup<'_> {
        let Some((name, module)) = path.split_last() else {
            return Lookup::NotFound;
        };
        if let Some(first) = module.first() {
            let aliased = self
                .imports_of(scope)
                .iter()
                .find(|import| !import.glob && import.alias == *first && import.path != path);
            if let Some(import) = aliased {
                let mut expanded = import.path.clone();
                expanded.extend(path[1..].iter().cloned());
                return self.lookup_path(&expanded, scope);
            }
        }
        for candidate in candidate_modules(module, scope) {
            if let Some(def) = self.find_exact(&candidate, name) {
                return Lookup::Found(def);
            }
        }
        self.match_by_suffix(path)
    }

    fn match_by_suffix(&self, path: &[String]) -> Lookup<'_> {
        for start in 0..path.len() {
            let suffix = &path[start..];
            let matches: Vec<&RawTypeDef> =
                self.definitions.iter().filter(|def| def.source().ends_with(suffix)).collect();
            match matches.len() {
                0 => continue,
                1 => return Lookup::Found(matches[0]),
                _ => return Lookup::Ambiguous(matches.into_iter().map(RawTypeDef::source).collect()),
            }
        }
        Lookup::NotFound
    }
}

/// Absolute module paths a written module path may denote from `scope`.
fn candidate_modules(module: &[String], scope: &[String]) -> Vec<Vec<String>> {
    match module.first().map(String::as_str) {
        None => vec![scope.to_vec()],
        Some(CRATE_ROOT) => vec![module.to_vec()],
        Some("self") => vec![scope.iter().chain(&module[1..]).cloned().collect()],
        Some("super") => {
            let mut base = scope.to_vec();
            let mut rest = module;
            while rest.first().map(String::as_str) == Some("super") {
                if base.len() > 1 {
                    base.pop();
                }
                rest = &rest[1..];
            }
            base.extend(rest.iter().cloned());
            vec![base]
        }
        Some(_) => {
            let relative = scope.iter().chain(module).cloned().collect();
            let rooted = std::iter::once(CRATE_ROOT.to_string()).chain(module.iter().cloned()).collect();
            vec![relative, rooted]
        }
    }
}
