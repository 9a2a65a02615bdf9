//! Signature help for the step enclosing the cursor

use tracing::debug;

use super::{
    open_path, step_documentation, with_cursor, CursorQuery, SignatureHelpItem,
    SignatureHelpResponse, SignatureParameter,
};
use crate::ir::ParameterRef;
use crate::parser::cst::{FunctionCall, NodeKind};
use crate::position::LinePosition;
use crate::steps::{ParameterDescriptor, StepFactory, StepFactoryStore};

pub fn get_signature_help(
    text: &str,
    position: LinePosition,
    store: &StepFactoryStore,
) -> SignatureHelpResponse {
    debug!(line = position.line, character = position.character, "signature help requested");
    with_cursor(text, position, store, signature)
}

fn signature(cursor: &CursorQuery<'_>) -> SignatureHelpResponse {
    let path = cursor.path();
    let open = open_path(&path, cursor.position);

    // Innermost known step, skipping one whose name is still being typed
    let calls: Vec<&FunctionCall> = open
        .iter()
        .rev()
        .filter_map(|node| match &node.kind {
            NodeKind::Function(call) => Some(call),
            _ => None,
        })
        .filter(|call| cursor.store.get(&call.name.text).is_some())
        .collect();
    let Some(call) = calls
        .iter()
        .copied()
        .find(|call| !call.name.location().contains(cursor.position))
        .or_else(|| calls.first().copied())
    else {
        return SignatureHelpResponse::default();
    };
    let Some(factory) = cursor.store.get(&call.name.text) else {
        return SignatureHelpResponse::default();
    };

    let parameters = factory.parameters();
    SignatureHelpResponse {
        active_signature: 0,
        active_parameter: active_parameter(factory.as_ref(), call, cursor.position),
        signatures: vec![SignatureHelpItem {
            label: signature_label(factory.as_ref()),
            documentation: step_documentation(factory.as_ref()),
            parameters: parameters
                .iter()
                .map(|p| SignatureParameter {
                    label: parameter_label(p),
                    documentation: p.summary.clone(),
                })
                .collect(),
        }],
    }
}

fn parameter_label(parameter: &ParameterDescriptor) -> String {
    format!("{}: {}", parameter.name, parameter.display_type())
}

/// `Name Param: Type Param: Type`
pub fn signature_label(factory: &dyn StepFactory) -> String {
    std::iter::once(factory.type_name().to_string())
        .chain(factory.parameters().iter().map(parameter_label))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Index into the factory's parameters of the argument the cursor is on
fn active_parameter(factory: &dyn StepFactory, call: &FunctionCall, position: LinePosition) -> usize {
    let parameters = factory.parameters();
    let index_of = |parameter: &ParameterDescriptor| {
        parameters.iter().position(|p| p.name == parameter.name)
    };

    for argument in &call.named {
        let end = argument
            .value
            .as_ref()
            .map_or(argument.name.stop, |v| v.location.stop);
        let on_argument =
            argument.name.start.to_line_position() <= position && position <= end.to_line_position();
        if on_argument {
            let reference = ParameterRef::Named(argument.name.text.clone());
            return factory
                .find_parameter(&reference)
                .and_then(index_of)
                .unwrap_or(0);
        }
    }

    for (i, argument) in call.ordered.iter().enumerate() {
        if argument.location.contains(position) {
            return factory
                .find_parameter(&ParameterRef::Index(i + 1))
                .and_then(index_of)
                .unwrap_or(0);
        }
    }

    // The next positional parameter nobody has supplied yet
    let mut positional: Vec<&ParameterDescriptor> =
        parameters.iter().filter(|p| p.order.is_some()).collect();
    positional.sort_by_key(|p| p.order);
    positional
        .into_iter()
        .filter(|p| p.order.is_some_and(|order| order > call.ordered.len()))
        .find(|p| !call.named.iter().any(|n| p.matches_name(&n.name.text)))
        .and_then(index_of)
        .unwrap_or(0)
}
