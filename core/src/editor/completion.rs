//! Completion
//!
//! What is offered depends on the token under the cursor:
//!
//! - a half-typed variable (`<na`): the variables known at this command
//! - the index of an accessor on an entity with a schema: its property names
//! - a step name: every step with a name containing the typed text, plus the
//!   unused parameters of the enclosing step when the name sits in an
//!   argument slot
//! - whitespace inside a step: that step's unused parameters as `Name: `
//! - whitespace after `Name:`: every step

use std::sync::Arc;

use tracing::debug;

use super::{
    call_named, call_with_argument, innermost_call, open_path, previous_token, step_documentation,
    unused_parameters, with_cursor, CompletionItem, CompletionResponse, CursorQuery, TextEdit,
};
use crate::ir::literals::quote;
use crate::parser::cst::{FunctionCall, Node, NodeKind};
use crate::parser::{partial_variable, Token, TokenKind};
use crate::position::{LinePosition, TextRange};
use crate::steps::{ParameterDescriptor, StepFactoryStore};

pub fn get_completions(
    text: &str,
    position: LinePosition,
    store: &StepFactoryStore,
) -> CompletionResponse {
    debug!(line = position.line, character = position.character, "completion requested");
    with_cursor(text, position, store, |cursor| CompletionResponse {
        is_incomplete: false,
        items: complete(cursor),
    })
}

fn complete(cursor: &CursorQuery<'_>) -> Vec<CompletionItem> {
    let path = cursor.path();
    let open = open_path(&path, cursor.position);
    let token = cursor.token();

    if let Some(token) = token {
        if let Some(prefix) = variable_prefix(token) {
            return variable_items(cursor, token, prefix);
        }
    }
    if let Some(items) = property_items(cursor, &open, token) {
        return items;
    }

    match token {
        Some(token) if token.kind == TokenKind::Name => name_items(cursor, &open, token),
        _ => slot_items(cursor, &open),
    }
}

/// Text typed after `<` when the cursor is on a half-typed variable
fn variable_prefix(token: &Token) -> Option<&str> {
    match token.kind {
        TokenKind::UnclosedVariable => partial_variable(&token.text),
        TokenKind::Operator if token.text == "<" => Some(""),
        _ => None,
    }
}

fn contains_ignore_case(name: &str, typed: &str) -> bool {
    name.to_lowercase().contains(&typed.to_lowercase())
}

// ============================================================================
// Variables
// ============================================================================

fn variable_items(cursor: &CursorQuery<'_>, token: &Token, prefix: &str) -> Vec<CompletionItem> {
    let resolver = cursor.resolver.get();
    let range = token.location().range();
    resolver
        .names()
        .filter(|name| {
            name.name()
                .to_lowercase()
                .starts_with(&prefix.to_lowercase())
        })
        .map(|name| {
            let detail = resolver
                .type_at(name, cursor.position)
                .map(|t| t.to_string())
                .unwrap_or_default();
            CompletionItem {
                label: name.to_string(),
                detail,
                documentation: String::new(),
                preselect: false,
                edit: TextEdit {
                    new_text: name.to_string(),
                    range,
                },
            }
        })
        .collect()
}

// ============================================================================
// Entity properties
// ============================================================================

/// Property names when the cursor is in the index of an accessor whose
/// target has an entity schema
fn property_items(
    cursor: &CursorQuery<'_>,
    open: &[&Node],
    token: Option<&Token>,
) -> Option<Vec<CompletionItem>> {
    let (target, index) = open.iter().rev().find_map(|n| match &n.kind {
        NodeKind::Accessor { target, index } => Some((target, index)),
        _ => None,
    })?;
    if !target.location.ends_before(cursor.position) {
        return None;
    }
    // Only a literal or a bare name being typed between the brackets
    if let Some(index) = index {
        let simple = match &index.kind {
            NodeKind::Literal(_) => true,
            NodeKind::Function(call) => call.ordered.is_empty() && call.named.is_empty(),
            _ => false,
        };
        if !simple || !index.location.contains(cursor.position) {
            return None;
        }
    }

    let schema_type = cursor.type_of(target)?;
    let schema = schema_type.entity_schema()?;

    let typed = token.filter(|t| {
        t.kind.is_string() || t.kind == TokenKind::Name || t.kind == TokenKind::UnterminatedString
    });
    let (prefix, range) = match typed {
        Some(t) => (
            t.text.trim_start_matches('$').trim_matches(|c| c == '"' || c == '\''),
            t.location().range(),
        ),
        None => ("", TextRange::at(cursor.position)),
    };

    Some(
        schema
            .properties
            .iter()
            .filter(|(name, _)| contains_ignore_case(name, prefix))
            .map(|(name, type_reference)| CompletionItem {
                label: name.clone(),
                detail: type_reference.to_string(),
                documentation: String::new(),
                preselect: false,
                edit: TextEdit {
                    new_text: quote(name),
                    range,
                },
            })
            .collect(),
    )
}

// ============================================================================
// Names
// ============================================================================

fn name_items(cursor: &CursorQuery<'_>, open: &[&Node], token: &Token) -> Vec<CompletionItem> {
    let range = token.location().range();

    // The name of an argument already followed by ':'
    if let Some(call) = call_with_argument(open, token) {
        let Some(factory) = cursor.store.get(&call.name.text) else {
            return Vec::new();
        };
        return unused_parameters(factory.as_ref(), call, call.ordered.len(), Some(token))
            .into_iter()
            .filter(|p| contains_ignore_case(&p.name, &token.text))
            .map(|p| parameter_item(p, p.name.clone(), range))
            .collect();
    }

    let mut items = Vec::new();
    if let Some((i, node, _)) = call_named(open, token) {
        // A bare name in an argument slot may be the start of `Param: value`
        if let Some(parent) = i.checked_sub(1).map(|p| open[p]) {
            if let NodeKind::Function(call) = &parent.kind {
                if let Some(position) = call.ordered.iter().position(|o| std::ptr::eq(o, node)) {
                    items.extend(argument_items(cursor.store, call, position, &token.text, range));
                }
            }
        }
    }
    items.extend(step_items(cursor.store, &token.text, range));
    items
}

/// Every step with a name containing `typed`, one item per name
pub(crate) fn step_items(
    store: &StepFactoryStore,
    typed: &str,
    range: TextRange,
) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    for factory in store.factories() {
        // Shadowed by a later registration under the same name
        let current = store
            .get(factory.type_name())
            .is_some_and(|f| Arc::ptr_eq(f, factory));
        if !current {
            continue;
        }
        let names = factory.names();
        if !names.iter().any(|n| contains_ignore_case(n, typed)) {
            continue;
        }
        let documentation = step_documentation(factory.as_ref());
        for (i, name) in names.iter().enumerate() {
            items.push(CompletionItem {
                label: name.to_string(),
                detail: factory.summary().to_string(),
                documentation: documentation.clone(),
                preselect: i == 0,
                edit: TextEdit {
                    new_text: name.to_string(),
                    range,
                },
            });
        }
    }
    items
}

// ============================================================================
// Argument slots
// ============================================================================

fn slot_items(cursor: &CursorQuery<'_>, open: &[&Node]) -> Vec<CompletionItem> {
    let range = TextRange::at(cursor.position);

    let after_colon = previous_token(&cursor.output.tokens, cursor.position)
        .is_some_and(|t| t.kind == TokenKind::Colon);
    if after_colon {
        return step_items(cursor.store, "", range);
    }

    let Some((_, call)) = innermost_call(open) else {
        return Vec::new();
    };
    argument_items(cursor.store, call, call.ordered.len(), "", range)
}

/// Unused parameters of `call` as `Name: ` items
fn argument_items(
    store: &StepFactoryStore,
    call: &FunctionCall,
    positional: usize,
    typed: &str,
    range: TextRange,
) -> Vec<CompletionItem> {
    let Some(factory) = store.get(&call.name.text) else {
        return Vec::new();
    };
    unused_parameters(factory.as_ref(), call, positional, None)
        .into_iter()
        .filter(|p| contains_ignore_case(&p.name, typed))
        .map(|p| parameter_item(p, format!("{}: ", p.name), range))
        .collect()
}

fn parameter_item(parameter: &ParameterDescriptor, new_text: String, range: TextRange) -> CompletionItem {
    CompletionItem {
        label: parameter.name.clone(),
        detail: parameter.display_type(),
        documentation: parameter.summary.clone(),
        preselect: false,
        edit: TextEdit { new_text, range },
    }
}
