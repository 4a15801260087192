//! Item collection over parsed files.
//!
//! Files are visited one at a time; marked traits become entrypoints right
//! away, while struct and impl markers are only paired up in [`Collector::finish`]
//! because a type's methods can be spread over several `impl` blocks.

use std::path::Path;

use syn::ext::IdentExt;
use syn::{
    Fields, FnArg, ImplItem, Item, Pat, ReturnType, Signature, TraitItem, Type, UseTree,
    Visibility,
};
use types::{
    DomainCatalog, EntrypointKind, Import, RawEntrypoint, RawEnum, RawField, RawMethod, RawParam,
    RawRecord, RawTypeDef, RawVariant, Receiver, SourceIdentity,
};

use super::syntax::{
    doc_text, entrypoint_marker, future_is_send, future_output, is_cfg_test, type_expr, EntrypointMarker,
};
use crate::{AdapterError, AdapterResult};

/// A marked struct or enum waiting for its impl blocks.
struct MarkedType {
    source: SourceIdentity,
    marker: EntrypointMarker,
    description: Option<String>,
}

/// An inherent impl block.
struct ImplBlock {
    module: Vec<String>,
    self_path: Vec<String>,
    marker: Option<EntrypointMarker>,
    description: Option<String>,
    methods: Vec<RawMethod>,
}

impl ImplBlock {
    fn identity(&self) -> SourceIdentity {
        let name = self.self_path.last().cloned().unwrap_or_default();
        SourceIdentity::new(self.module.clone(), name)
    }

    /// Whether this block implements methods for `source`.
    fn targets(&self, source: &SourceIdentity) -> bool {
        if self.self_path.len() == 1 {
            self.module == source.module && self.self_path[0] == source.name
        } else {
            source.ends_with(&self.self_path)
        }
    }
}

/// Accumulates entrypoints and catalog entries across files.
#[derive(Default)]
pub(crate) struct Collector {
    catalog: DomainCatalog,
    traits: Vec<RawEntrypoint>,
    marked_types: Vec<MarkedType>,
    impls: Vec<ImplBlock>,
}

impl Collector {
    /// Visit the items of one module.
    pub(crate) fn visit_items(
        &mut self,
        file: &Path,
        module: &[String],
        items: &[Item],
    ) -> AdapterResult<()> {
        for item in items {
            self.visit_item(file, module, item)?;
        }
        Ok(())
    }

    fn visit_item(&mut self, file: &Path, module: &[String], item: &Item) -> AdapterResult<()> {
        let invalid_marker = |err: syn::Error| AdapterError::InvalidMarker {
            path: file.to_path_buf(),
            message: err.to_string(),
        };
        match item {
            Item::Struct(item) => {
                let source = SourceIdentity::new(module.to_vec(), item.ident.unraw().to_string());
                let description = doc_text(&item.attrs);
                if let Some(marker) = entrypoint_marker(&item.attrs).map_err(invalid_marker)? {
                    self.marked_types.push(MarkedType {
                        source: source.clone(),
                        marker,
                        description: description.clone(),
                    });
                }
                self.catalog.insert(struct_def(item, source, description));
            }
            Item::Enum(item) => {
                let source = SourceIdentity::new(module.to_vec(), item.ident.unraw().to_string());
                let description = doc_text(&item.attrs);
                if let Some(marker) = entrypoint_marker(&item.attrs).map_err(invalid_marker)? {
                    self.marked_types.push(MarkedType {
                        source: source.clone(),
                        marker,
                        description: description.clone(),
                    });
                }
                self.catalog.insert(enum_def(item, source, description));
            }
            Item::Type(item) => {
                let source = SourceIdentity::new(module.to_vec(), item.ident.unraw().to_string());
                let def = if item.generics.params.is_empty() {
                    RawTypeDef::Alias { source, target: type_expr(&item.ty) }
                } else {
                    RawTypeDef::Opaque { source, reason: "generic type aliases are not supported".into() }
                };
                self.catalog.insert(def);
            }
            Item::Impl(item) if item.trait_.is_none() => {
                let Type::Path(self_ty) = item.self_ty.as_ref() else {
                    return Ok(());
                };
                let marker = entrypoint_marker(&item.attrs).map_err(invalid_marker)?;
                let methods = item
                    .items
                    .iter()
                    .filter_map(|impl_item| match impl_item {
                        ImplItem::Fn(method)
                            if is_public(&method.vis) && !is_cfg_test(&method.attrs) =>
                        {
                            raw_method(&method.sig, doc_text(&method.attrs))
                        }
                        _ => None,
                    })
                    .collect();
                self.impls.push(ImplBlock {
                    module: module.to_vec(),
                    self_path: self_ty.path.segments.iter().map(|s| s.ident.to_string()).collect(),
                    marker,
                    description: doc_text(&item.attrs),
                    methods,
                });
            }
            Item::Trait(item) => {
                let Some(marker) = entrypoint_marker(&item.attrs).map_err(invalid_marker)? else {
                    return Ok(());
                };
                let source = SourceIdentity::new(module.to_vec(), item.ident.unraw().to_string());
                if !marker.enabled {
                    tracing::debug!(entrypoint = %source, "entrypoint disabled by its marker");
                    return Ok(());
                }
                let methods = item
                    .items
                    .iter()
                    .filter_map(|trait_item| match trait_item {
                        TraitItem::Fn(method) if !is_cfg_test(&method.attrs) => {
                            raw_method(&method.sig, doc_text(&method.attrs))
                        }
                        _ => None,
                    })
                    .collect();
                self.traits.push(RawEntrypoint {
                    name: marker.name.unwrap_or_else(|| source.name.clone()),
                    kind: EntrypointKind::Trait,
                    source,
                    description: doc_text(&item.attrs),
                    methods,
                });
            }
            Item::Mod(item) if !is_cfg_test(&item.attrs) => {
                if let Some((_, items)) = &item.content {
                    let mut child = module.to_vec();
                    child.push(item.ident.unraw().to_string());
                    self.visit_items(file, &child, items)?;
                }
            }
            Item::Use(item) => {
                let mut prefix = Vec::new();
                collect_imports(&item.tree, &mut prefix, &mut |import| {
                    self.catalog.add_import(module, import)
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Pair markers with impl blocks and hand back the report contents.
    pub(crate) fn finish(self) -> (Vec<RawEntrypoint>, DomainCatalog) {
        let Collector { catalog, traits, marked_types, impls } = self;
        let mut entrypoints = traits;

        for marked in &marked_types {
            if !marked.marker.enabled {
                tracing::debug!(entrypoint = %marked.source, "entrypoint disabled by its marker");
                continue;
            }
            let methods = impls
                .iter()
                .filter(|block| block.targets(&marked.source))
                .flat_map(|block| block.methods.iter().cloned())
                .collect();
            entrypoints.push(RawEntrypoint {
                name: marked.marker.name.clone().unwrap_or_else(|| marked.source.name.clone()),
                kind: EntrypointKind::Type,
                source: marked.source.clone(),
                description: marked.description.clone(),
                methods,
            });
        }

        // Marked impl blocks whose type carries no marker of its own; several
        // blocks for one type form a single entrypoint.
        let mut by_type: Vec<(RawEntrypoint, bool)> = Vec::new();
        for block in &impls {
            let Some(marker) = &block.marker else { continue };
            if marked_types.iter().any(|marked| block.targets(&marked.source)) {
                continue;
            }
            let identity = block.identity();
            match by_type.iter_mut().find(|(entrypoint, _)| entrypoint.source == identity) {
                Some((existing, enabled)) => {
                    existing.methods.extend(block.methods.iter().cloned());
                    if let Some(name) = &marker.name {
                        existing.name = name.clone();
                    }
                    if existing.description.is_none() {
                        existing.description = block.description.clone();
                    }
                    *enabled &= marker.enabled;
                }
                None => by_type.push((
                    RawEntrypoint {
                        name: marker.name.clone().unwrap_or_else(|| identity.name.clone()),
                        kind: EntrypointKind::Type,
                        source: identity,
                        description: block.description.clone(),
                        methods: block.methods.clone(),
                    },
                    marker.enabled,
                )),
            }
        }
        for (entrypoint, enabled) in by_type {
            if enabled {
                entrypoints.push(entrypoint);
            } else {
                tracing::debug!(entrypoint = %entrypoint.source, "entrypoint disabled by its marker");
            }
        }
        (entrypoints, catalog)
    }
}

fn struct_def(item: &syn::ItemStruct, source: SourceIdentity, description: Option<String>) -> RawTypeDef {
    if !item.generics.params.is_empty() {
        return RawTypeDef::Opaque { source, reason: "generic types are not supported".into() };
    }
    match &item.fields {
        Fields::Named(named) => RawTypeDef::Record(RawRecord {
            source,
            description,
            fields: named
                .named
                .iter()
                .filter_map(|field| {
                    Some(RawField {
                        name: field.ident.as_ref()?.unraw().to_string(),
                        ty: type_expr(&field.ty),
                        public: is_public(&field.vis),
                        description: doc_text(&field.attrs),
                    })
                })
                .collect(),
        }),
        Fields::Unnamed(_) => {
            RawTypeDef::Opaque { source, reason: "tuple structs have no field names".into() }
        }
        Fields::Unit => RawTypeDef::Opaque { source, reason: "unit structs carry no data".into() },
    }
}

fn enum_def(item: &syn::ItemEnum, source: SourceIdentity, description: Option<String>) -> RawTypeDef {
    if !item.generics.params.is_empty() {
        return RawTypeDef::Opaque { source, reason: "generic types are not supported".into() };
    }
    if item.variants.iter().any(|variant| !matches!(variant.fields, Fields::Unit)) {
        return RawTypeDef::Opaque { source, reason: "enum variants carry data".into() };
    }
    RawTypeDef::Enum(RawEnum {
        source,
        description,
        variants: item
            .variants
            .iter()
            .map(|variant| RawVariant {
                name: variant.ident.unraw().to_string(),
                description: doc_text(&variant.attrs),
            })
            .collect(),
    })
}

/// A callable member, or `None` for associated functions and `_`-prefixed names.
/// Only plain `pub` counts; `pub(crate)` and friends are internal.
fn is_public(vis: &Visibility) -> bool { matches!(vis, Visibility::Public(_)) }

fn raw_method(sig: &Signature, description: Option<String>) -> Option<RawMethod> {
    let name = sig.ident.unraw().to_string();
    if name.starts_with('_') {
        return None;
    }
    let receiver = sig.receiver().map(|receiver| {
        let reference = match receiver.ty.as_ref() {
            Type::Reference(reference) => Some(reference.mutability.is_some()),
            _ => None,
        };
        match reference {
            Some(false) => Receiver::Ref,
            Some(true) => Receiver::Mut,
            None => Receiver::Owned,
        }
    })?;

    let params = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(typed) => Some(typed),
            FnArg::Receiver(_) => None,
        })
        .enumerate()
        .map(|(index, typed)| RawParam {
            name: match typed.pat.as_ref() {
                Pat::Ident(ident) => ident.ident.unraw().to_string(),
                _ => format!("arg{}", index),
            },
            ty: type_expr(&typed.ty),
        })
        .collect();

    let mut is_async = sig.asyncness.is_some();
    let mut send_future = false;
    let mut returns = match &sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(type_expr(ty)),
    };
    if let Some(written) = returns.clone() {
        if let Some(output) = future_output(&written) {
            is_async = true;
            send_future = future_is_send(&written);
            returns = if output.is_unit() { None } else { Some(output.clone()) };
        }
    }

    Some(RawMethod { name, receiver, is_async, send_future, params, returns, description })
}

/// Flatten a `use` tree into one [`Import`] per visible name.
fn collect_imports(tree: &UseTree, prefix: &mut Vec<String>, sink: &mut dyn FnMut(Import)) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            collect_imports(&path.tree, prefix, sink);
            prefix.pop();
        }
        UseTree::Name(name) => {
            let ident = name.ident.to_string();
            if ident == "self" {
                if let Some(last) = prefix.last() {
                    sink(Import { alias: last.clone(), path: prefix.clone(), glob: false });
                }
            } else {
                let mut path = prefix.clone();
                path.push(ident.clone());
                sink(Import { alias: ident, path, glob: false });
            }
        }
        UseTree::Rename(rename) => {
            let mut path = prefix.clone();
            path.push(rename.ident.to_string());
            sink(Import { alias: rename.rename.to_string(), path, glob: false });
        }
        UseTree::Glob(_) => sink(Import { alias: "*".into(), path: prefix.clone(), glob: true }),
        UseTree::Group(group) => {
            for item in &group.items {
                collect_imports(item, prefix, sink);
            }
        }
    }
}
