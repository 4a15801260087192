//! Service IR builder
//!
//! Resolves every scanned entrypoint into a [`Service`]. All services share
//! one [`TypeRegistry`], so record identity is global across the IR.

use ir::{MethodSignature, ParamDef, Service, ServiceIR, ServiceKind};
use registry::TypeRegistry;
use semantics::{classify_shape, Position, ResolvedReturn, TypePath, TypeResolver};
use types::{DomainCatalog, EntrypointKind, RawEntrypoint, RawMethod, Receiver, TypeExpr};

use crate::{IrError, IrValidator, Result};

/// Builds a [`ServiceIR`] from scanned entrypoints.
pub struct ServiceIrBuilder<'a> {
    catalog: &'a DomainCatalog,
}

impl<'a> ServiceIrBuilder<'a> {
    /// Create a builder that resolves types against `catalog`.
    pub fn new(catalog: &'a DomainCatalog) -> Self { Self { catalog } }

    /// Build and validate the IR. Fails on the first problem found.
    pub fn build(&self, entrypoints: &[RawEntrypoint]) -> Result<ServiceIR> {
        let mut registry = TypeRegistry::new();
        let mut services = Vec::with_capacity(entrypoints.len());
        {
            let mut resolver = TypeResolver::new(self.catalog, &mut registry);
            for entrypoint in entrypoints {
                let service = build_service(&mut resolver, entrypoint)?;
                tracing::debug!(
                    service = %service.name,
                    source = %service.source,
                    methods = service.methods.len(),
                    "resolved service"
                );
                services.push(service);
            }
        }

        let ir = ServiceIR::new(services, registry.into_types());
        IrValidator::new().validate(&ir)?;
        tracing::info!(
            services = ir.services().len(),
            methods = ir.method_count(),
            types = ir.types().len(),
            "built service IR"
        );
        Ok(ir)
    }
}

fn build_service(resolver: &mut TypeResolver<'_>, entrypoint: &RawEntrypoint) -> Result<Service> {
    let methods = entrypoint
        .methods
        .iter()
        .map(|method| build_method(resolver, entrypoint, method))
        .collect::<Result<Vec<_>>>()?;
    Ok(Service {
        name: entrypoint.name.clone(),
        kind: match entrypoint.kind {
            EntrypointKind::Type => ServiceKind::Type,
            EntrypointKind::Trait => ServiceKind::Trait,
        },
        source: entrypoint.source.to_string(),
        description: entrypoint.description.clone(),
        methods,
    })
}

fn build_method(
    resolver: &mut TypeResolver<'_>,
    entrypoint: &RawEntrypoint,
    method: &RawMethod,
) -> Result<MethodSignature> {
    if method.receiver != Receiver::Ref {
        return Err(IrError::UnsupportedReceiver {
            service: entrypoint.name.clone(),
            method: method.name.clone(),
            receiver: method.receiver.as_str(),
        });
    }
    check_send_return(entrypoint, method)?;
    let scope = entrypoint.scope();

    let mut params = Vec::with_capacity(method.params.len());
    for param in &method.params {
        let path = TypePath::param(&entrypoint.name, &method.name, &param.name);
        let ty = resolver.resolve(&param.ty, scope, Position::Parameter, &path)?;
        params.push(ParamDef {
            name: param.name.clone(),
            required: !ty.is_optional(),
            by_ref: matches!(param.ty, TypeExpr::Reference { .. }),
            ty,
        });
    }
    if let Some(stream) = params.iter().find(|param| param.ty.is_stream()) {
        if params.len() > 1 {
            return Err(IrError::InvalidStreamSignature {
                service: entrypoint.name.clone(),
                method: method.name.clone(),
                param: stream.name.clone(),
            });
        }
    }

    let path = TypePath::returns(&entrypoint.name, &method.name);
    let ResolvedReturn { returns, fallible } =
        resolver.resolve_return(method.returns.as_ref(), scope, &path)?;
    let shape = classify_shape(&params, returns.as_ref());

    Ok(MethodSignature {
        name: method.name.clone(),
        params,
        returns,
        shape,
        fallible,
        is_async: method.is_async,
        description: method.description.clone(),
    })
}

/// Generated handlers hold the returned future and stream across `.await` in
/// `Send` tasks. Handlers of trait services are generic over the
/// implementor, so there only a written `Send` bound proves it.
fn check_send_return(entrypoint: &RawEntrypoint, method: &RawMethod) -> Result<()> {
    let is_trait = entrypoint.kind == EntrypointKind::Trait;
    let unsendable = |what: &'static str, hint: &'static str| IrError::UnsendableReturn {
        service: entrypoint.name.clone(),
        method: method.name.clone(),
        what,
        hint,
    };
    if is_trait && method.is_async && !method.send_future {
        return Err(unsendable(
            "future",
            "declare it as `fn name(&self, ..) -> impl Future<Output = T> + Send`",
        ));
    }
    let Some(returns) = method.returns.as_ref() else {
        return Ok(());
    };
    match unwrap_return(returns) {
        TypeExpr::TraitObject(bounds) if !has_send(bounds) =>
            Err(unsendable("stream", "add `+ Send` to the trait object, or return `BoxStream`")),
        TypeExpr::ImplTrait(bounds) if is_trait && !has_send(bounds) =>
            Err(unsendable("stream", "add `+ Send` to the returned `impl Stream`")),
        _ => Ok(()),
    }
}

/// The type under an outer `Result`, `Pin` and `Box`.
fn unwrap_return(ty: &TypeExpr) -> &TypeExpr {
    match ty {
        TypeExpr::Path { args, .. }
            if matches!(ty.last_segment(), Some("Result" | "Pin" | "Box")) && !args.is_empty() =>
            unwrap_return(&args[0]),
        _ => ty,
    }
}

fn has_send(bounds: &[TypeExpr]) -> bool {
    bounds.iter().any(|bound| bound.last_segment() == Some("Send"))
}
