//! Helpers over `syn` syntax trees: type expressions, doc comments and
//! entrypoint markers.

use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Expr, GenericArgument, Lit, LitBool, LitStr, Meta, PathArguments, Token, Type,
    TypeParamBound,
};
use types::TypeExpr;

/// Convert a written type into a [`TypeExpr`]. Lifetimes are dropped.
pub(crate) fn type_expr(ty: &Type) -> TypeExpr {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => path_expr(&type_path.path),
        Type::Reference(reference) => TypeExpr::Reference {
            mutable: reference.mutability.is_some(),
            inner: Box::new(type_expr(&reference.elem)),
        },
        Type::Slice(slice) => TypeExpr::Slice(Box::new(type_expr(&slice.elem))),
        Type::Array(array) => TypeExpr::Array(Box::new(type_expr(&array.elem))),
        Type::Tuple(tuple) => TypeExpr::Tuple(tuple.elems.iter().map(type_expr).collect()),
        Type::Paren(paren) => type_expr(&paren.elem),
        Type::Group(group) => type_expr(&group.elem),
        Type::ImplTrait(bounds) => TypeExpr::ImplTrait(trait_bounds(&bounds.bounds)),
        Type::TraitObject(bounds) => TypeExpr::TraitObject(trait_bounds(&bounds.bounds)),
        other => TypeExpr::Opaque(other.to_token_stream().to_string()),
    }
}

fn path_expr(path: &syn::Path) -> TypeExpr {
    let segments = path.segments.iter().map(|segment| segment.ident.to_string()).collect();
    let mut args = Vec::new();
    let mut bindings = Vec::new();
    if let Some(last) = path.segments.last() {
        match &last.arguments {
            PathArguments::None => {}
            PathArguments::AngleBracketed(generics) => {
                for arg in &generics.args {
                    match arg {
                        GenericArgument::Type(ty) => args.push(type_expr(ty)),
                        GenericArgument::AssocType(assoc) => {
                            bindings.push((assoc.ident.to_string(), type_expr(&assoc.ty)))
                        }
                        _ => {}
                    }
                }
            }
            PathArguments::Parenthesized(_) => {
                return TypeExpr::Opaque(path.to_token_stream().to_string());
            }
        }
    }
    TypeExpr::Path { segments, args, bindings }
}

fn trait_bounds(bounds: &Punctuated<TypeParamBound, Token![+]>) -> Vec<TypeExpr> {
    bounds
        .iter()
        .filter_map(|bound| match bound {
            TypeParamBound::Trait(trait_bound) => Some(path_expr(&trait_bound.path)),
            _ => None,
        })
        .collect()
}

/// `impl Future<Output = T>` as written in a return position yields `T`.
pub(crate) fn future_output(ty: &TypeExpr) -> Option<&TypeExpr> {
    match ty {
        TypeExpr::ImplTrait(bounds) => bounds
            .iter()
            .find(|bound| bound.last_segment() == Some("Future"))
            .and_then(|bound| bound.binding("Output")),
        _ => None,
    }
}

/// Whether an `impl Future` return also carries a `Send` bound.
pub(crate) fn future_is_send(ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::ImplTrait(bounds) => bounds.iter().any(|bound| bound.last_segment() == Some("Send")),
        _ => false,
    }
}

/// Joined `///` text, with the conventional leading space removed.
pub(crate) fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(name_value) => match &name_value.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(text) => Some(text.value()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').unwrap_or(&line).trim_end().to_string())
        .collect();
    let text = lines.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Whether the item is compiled only for tests.
pub(crate) fn is_cfg_test(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && match &attr.meta {
                Meta::List(list) => list
                    .tokens
                    .to_string()
                    .split(|c: char| !c.is_alphanumeric() && c != '_')
                    .any(|word| word == "test"),
                _ => false,
            }
    })
}

/// Options carried by an entrypoint marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntrypointMarker {
    pub name: Option<String>,
    pub enabled: bool,
}

impl Default for EntrypointMarker {
    fn default() -> Self { Self { name: None, enabled: true } }
}

fn is_marker_path(path: &syn::Path) -> bool {
    path.segments.last().map(|segment| segment.ident == "entrypoint").unwrap_or(false)
}

/// Find an entrypoint marker among `attrs`.
///
/// Accepts `#[entrypoint]`, `#[some::path::entrypoint(..)]` and
/// `#[cfg_attr(<predicate>, entrypoint(..))]`.
pub(crate) fn entrypoint_marker(attrs: &[Attribute]) -> syn::Result<Option<EntrypointMarker>> {
    for attr in attrs {
        if is_marker_path(attr.path()) {
            return marker_options(&attr.meta).map(Some);
        }
        if attr.path().is_ident("cfg_attr") {
            let nested =
                attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            if let Some(meta) = nested.iter().skip(1).find(|meta| is_marker_path(meta.path())) {
                return marker_options(meta).map(Some);
            }
        }
    }
    Ok(None)
}

fn marker_options(meta: &Meta) -> syn::Result<EntrypointMarker> {
    let mut marker = EntrypointMarker::default();
    match meta {
        Meta::Path(_) => {}
        Meta::List(list) => list.parse_nested_meta(|option| {
            if option.path.is_ident("name") {
                let name: LitStr = option.value()?.parse()?;
                let name = name.value();
                if !is_identifier(&name) {
                    return Err(option.error(format!("`{}` is not a valid service name", name)));
                }
                marker.name = Some(name);
                Ok(())
            } else if option.path.is_ident("enabled") {
                let enabled: LitBool = option.value()?.parse()?;
                marker.enabled = enabled.value;
                Ok(())
            } else {
                Err(option.error("unsupported entrypoint option, expected `name` or `enabled`"))
            }
        })?,
        Meta::NameValue(_) => {
            return Err(syn::Error::new_spanned(meta, "expected `entrypoint` or `entrypoint(..)`"));
        }
    }
    Ok(marker)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn attrs(item: syn::ItemStruct) -> Vec<Attribute> { item.attrs }

    #[test]
    fn converts_containers_streams_and_references() {
        let ty: Type = parse_quote!(Option<Vec<&'a str>>);
        assert_eq!(type_expr(&ty).to_string(), "Option<Vec<&str>>");

        let ty: Type = parse_quote!(Pin<Box<dyn Stream<Item = Result<u32, Error>> + Send + 'static>>);
        assert_eq!(
            type_expr(&ty).to_string(),
            "Pin<Box<dyn Stream<Item = Result<u32, Error>> + Send>>"
        );

        let ty: Type = parse_quote!(::std::collections::HashMap<String, [u8; 4]>);
        assert_eq!(type_expr(&ty).to_string(), "std::collections::HashMap<String, [u8; _]>");

        let ty: Type = parse_quote!(fn(u32) -> u32);
        assert!(matches!(type_expr(&ty), TypeExpr::Opaque(_)));
    }

    #[test]
    fn future_output_is_unwrapped() {
        let ty: Type = parse_quote!(impl Future<Output = String> + Send);
        assert_eq!(future_output(&type_expr(&ty)), Some(&TypeExpr::named("String")));
        assert!(future_is_send(&type_expr(&ty)));
        let ty: Type = parse_quote!(impl Future<Output = String>);
        assert!(!future_is_send(&type_expr(&ty)));
        let ty: Type = parse_quote!(impl Iterator<Item = String>);
        assert_eq!(future_output(&type_expr(&ty)), None);
    }

    #[test]
    fn doc_text_joins_lines() {
        let item = attrs(parse_quote! {
            /// Greeting service.
            ///
            /// Says hello.
            #[derive(Debug)]
            struct Greeter;
        });
        assert_eq!(doc_text(&item).as_deref(), Some("Greeting service.\n\nSays hello."));
        assert_eq!(doc_text(&attrs(parse_quote!(struct Bare;))), None);
    }

    #[test]
    fn recognises_marker_forms() {
        let plain = attrs(parse_quote!(#[entrypoint] struct A;));
        assert_eq!(entrypoint_marker(&plain).expect("parse"), Some(EntrypointMarker::default()));

        let named = attrs(parse_quote!(#[portico::entrypoint(name = "Users")] struct A;));
        assert_eq!(
            entrypoint_marker(&named).expect("parse").and_then(|m| m.name).as_deref(),
            Some("Users")
        );

        let gated = attrs(parse_quote!(#[cfg_attr(portico, entrypoint(enabled = false))] struct A;));
        let marker = entrypoint_marker(&gated).expect("parse").expect("marker");
        assert!(!marker.enabled);

        let unmarked = attrs(parse_quote!(#[derive(Debug)] #[cfg_attr(test, derive(Clone))] struct A;));
        assert_eq!(entrypoint_marker(&unmarked).expect("parse"), None);
    }

    #[test]
    fn rejects_unknown_marker_options() {
        let bad = attrs(parse_quote!(#[entrypoint(version = "1")] struct A;));
        assert!(entrypoint_marker(&bad).is_err());
        let bad_name = attrs(parse_quote!(#[entrypoint(name = "not valid")] struct A;));
        assert!(entrypoint_marker(&bad_name).is_err());
    }

    #[test]
    fn detects_test_only_items() {
        assert!(is_cfg_test(&attrs(parse_quote!(#[cfg(test)] struct A;))));
        assert!(is_cfg_test(&attrs(parse_quote!(#[cfg(all(test, feature = "x"))] struct A;))));
        assert!(!is_cfg_test(&attrs(parse_quote!(#[cfg(feature = "testing")] struct A;))));
    }
}
