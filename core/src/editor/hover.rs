//! Hover text for the token under the cursor

use tracing::debug;

use super::{call_named, call_with_argument, with_cursor, CursorQuery, QuickInfoResponse};
use crate::errors::ErrorKind;
use crate::ir::literals::decode_constant;
use crate::ir::visitor::operator_step_name;
use crate::ir::{ParameterRef, VariableName};
use crate::parser::{Token, TokenKind};
use crate::position::LinePosition;
use crate::steps::{StepFactory, StepFactoryStore};
use crate::types::TypeReference;

pub fn get_hover(text: &str, position: LinePosition, store: &StepFactoryStore) -> QuickInfoResponse {
    debug!(line = position.line, character = position.character, "hover requested");
    with_cursor(text, position, store, |cursor| QuickInfoResponse {
        markdown_lines: hover(cursor),
    })
}

fn hover(cursor: &CursorQuery<'_>) -> Vec<String> {
    let Some(token) = cursor.token() else {
        return Vec::new();
    };
    match token.kind {
        TokenKind::Name => name(cursor, token),
        TokenKind::Variable => variable(cursor, token),
        TokenKind::Operator => operator(cursor, token),
        TokenKind::InterpolatedString => literal(token, TypeReference::STRING),
        kind if kind.is_literal() => match decode_constant(token) {
            Ok(value) => literal(token, value.type_reference()),
            Err(errors) => errors.iter().map(|e| e.message()).collect(),
        },
        _ => Vec::new(),
    }
}

fn literal(token: &Token, type_reference: TypeReference) -> Vec<String> {
    vec![format!("`{}`", token.text), format!("`{}`", type_reference)]
}

fn step_lines(factory: &dyn StepFactory, output: TypeReference) -> Vec<String> {
    vec![
        format!("**{}**", factory.type_name()),
        format!("`{}`", output),
        factory.summary().to_string(),
    ]
}

fn name(cursor: &CursorQuery<'_>, token: &Token) -> Vec<String> {
    let path = cursor.path();

    if let Some(call) = call_with_argument(&path, token) {
        let Some(factory) = cursor.store.get(&call.name.text) else {
            return vec![ErrorKind::UnknownStep(call.name.text.clone()).to_string()];
        };
        return match factory.find_parameter(&ParameterRef::Named(token.text.clone())) {
            Some(parameter) => vec![
                format!("**{}**", parameter.name),
                format!("`{}`", parameter.display_type()),
                parameter.summary.clone(),
            ],
            None if factory.accepts_extra_named_arguments() => {
                vec![format!("**{}**", token.text), format!("`{}`", TypeReference::Any)]
            }
            None => vec![ErrorKind::UnknownParameter {
                step: factory.type_name().to_string(),
                parameter: token.text.clone(),
            }
            .to_string()],
        };
    }

    let Some((_, node, _)) = call_named(&path, token) else {
        return Vec::new();
    };
    match cursor.store.get(&token.text) {
        Some(factory) => {
            let output = cursor
                .type_of(node)
                .unwrap_or_else(|| factory.declared_output_type());
            step_lines(factory.as_ref(), output)
        }
        None => vec![
            format!("**{}**", token.text),
            ErrorKind::UnknownStep(token.text.clone()).to_string(),
        ],
    }
}

fn variable(cursor: &CursorQuery<'_>, token: &Token) -> Vec<String> {
    let name = VariableName::from_token_text(&token.text);
    let resolved = cursor
        .resolver
        .get()
        .type_at(&name, token.start.to_line_position())
        .map(|t| format!("`{}`", t));
    vec![
        format!("`{}`", name),
        resolved.unwrap_or_else(|| "Untyped VariableName".to_string()),
    ]
}

fn operator(cursor: &CursorQuery<'_>, token: &Token) -> Vec<String> {
    let Some(factory) = operator_step_name(&token.text).and_then(|name| cursor.store.get(name)) else {
        return Vec::new();
    };
    step_lines(factory.as_ref(), factory.declared_output_type())
}
