use ir::{InteractionShape, ParamDef, TypeNode};

/// Derive the interaction shape of a method from its resolved signature.
///
/// A streamed parameter makes the method request-streaming, a streamed return
/// makes it response-streaming, and both together make it duplex. Without
/// streams, a method that returns nothing is fire-and-forget and every other
/// method is unary.
pub fn classify_shape(params: &[ParamDef], returns: Option<&TypeNode>) -> InteractionShape {
    let streams_requests = params.iter().any(|param| param.ty.is_stream());
    let streams_responses = returns.map(TypeNode::is_stream).unwrap_or(false);
    match (streams_requests, streams_responses) {
        (true, true) => InteractionShape::Duplex,
        (true, false) => InteractionShape::RequestStream,
        (false, true) => InteractionShape::ResponseStream,
        (false, false) if returns.is_none() => InteractionShape::FireAndForget,
        (false, false) => InteractionShape::Unary,
    }
}

#[cfg(test)]
mod tests {
    use ir::PrimitiveKind;

    use super::*;

    fn param(ty: TypeNode) -> ParamDef {
        ParamDef { name: "input".into(), required: !ty.is_optional(), ty, by_ref: false }
    }

    #[test]
    fn classifies_every_shape() {
        let text = TypeNode::text();
        let unit = TypeNode::primitive(PrimitiveKind::Unit);
        let stream = TypeNode::stream(TypeNode::text());

        assert_eq!(classify_shape(&[param(text.clone())], Some(&text)), InteractionShape::Unary);
        assert_eq!(classify_shape(&[param(text.clone())], None), InteractionShape::FireAndForget);
        assert_eq!(classify_shape(&[], Some(&unit)), InteractionShape::Unary);
        assert_eq!(classify_shape(&[param(stream.clone())], Some(&text)), InteractionShape::RequestStream);
        assert_eq!(classify_shape(&[param(stream.clone())], None), InteractionShape::RequestStream);
        assert_eq!(classify_shape(&[], Some(&stream)), InteractionShape::ResponseStream);
        assert_eq!(classify_shape(&[param(stream.clone())], Some(&stream)), InteractionShape::Duplex);
    }
}
